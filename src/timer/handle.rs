//! TimerHandle owns one kernel interval timer and exposes its descriptor
//! for readiness polling.
//!
//! # TimerHandle
//!
//! 1. Creation and arming happen in one call; the caller either gets an
//!    armed handle or an error, never a half-built timer.
//! 2. The descriptor is closed exactly once, when the handle is dropped or
//!    explicitly closed.
//! 3. Waiting for expirations is left to whatever poller the descriptor is
//!    registered with.
use crate::prelude::*;

use std::fmt;
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, IntoRawFd};

/// How the interval was requested, converted when the timer is built.
#[derive(Debug, Clone, Copy, PartialEq)]
enum IntervalRequest {
    Millis(u64),
    FractionalMillis(f64),
    Exact(Interval),
}

impl IntervalRequest {
    fn resolve(self) -> Result<Interval, TimerError> {
        match self {
            IntervalRequest::Millis(ms) => Interval::from_millis(ms),
            IntervalRequest::FractionalMillis(ms) => Interval::from_millis_f64(ms),
            IntervalRequest::Exact(interval) => Ok(interval),
        }
    }
}

/// Builds a `TimerHandle` with custom configuration values.
///
/// Methods can be chained in order to set the configuration values. The
/// timer is created and armed by calling `build`.
///
/// # Examples
///
/// ```
/// use pollable_timer::prelude::*;
///
/// let timer = TimerBuilder::new()
///     .interval_ms(250)
///     .clock_source(ClockSource::Realtime)
///     .flags(TimerFlags::CLOSE_ON_EXEC)
///     .build()?;
///
/// assert!(timer.descriptor() >= 0);
/// # Ok::<(), TimerError>(())
/// ```
#[derive(Clone, Debug)]
pub struct TimerBuilder<P: Platform = SysPlatform> {
    interval: Option<IntervalRequest>,
    clock_source: ClockSource,
    flags: TimerFlags,
    platform: P,
}

impl TimerBuilder<SysPlatform> {
    /// Builder for a monotonic, close-on-exec, non-blocking timer on the host kernel.
    pub fn new() -> Self {
        TimerBuilder {
            interval: None,
            clock_source: ClockSource::default(),
            flags: TimerFlags::default(),
            platform: SysPlatform,
        }
    }
}

impl Default for TimerBuilder<SysPlatform> {
    fn default() -> Self {
        TimerBuilder::new()
    }
}

impl<P: Platform> TimerBuilder<P> {
    /// Period in whole milliseconds.
    pub fn interval_ms(mut self, ms: u64) -> Self {
        self.interval = Some(IntervalRequest::Millis(ms));
        self
    }

    /// Period in fractional milliseconds.
    pub fn interval_ms_f64(mut self, ms: f64) -> Self {
        self.interval = Some(IntervalRequest::FractionalMillis(ms));
        self
    }

    /// An already validated period.
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(IntervalRequest::Exact(interval));
        self
    }

    /// Clock driving the timer, `Monotonic` by default.
    pub fn clock_source(mut self, clock_source: ClockSource) -> Self {
        self.clock_source = clock_source;
        self
    }

    /// Creation flags, `CLOSE_ON_EXEC | NON_BLOCKING` by default.
    pub fn flags(mut self, flags: TimerFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Native surface the timer is created through.
    pub fn platform<Q: Platform>(self, platform: Q) -> TimerBuilder<Q> {
        TimerBuilder {
            interval: self.interval,
            clock_source: self.clock_source,
            flags: self.flags,
            platform,
        }
    }

    /// Create and arm the timer.
    pub fn build(self) -> Result<TimerHandle<P>, TimerError> {
        let interval = self
            .interval
            .ok_or_else(|| TimerError::invalid_interval("no interval was set"))?
            .resolve()?;

        TimerHandle::create_with(self.platform, interval, self.clock_source, self.flags)
    }
}

/// A periodic kernel timer whose descriptor becomes readable on every expiration.
///
/// Dropping the handle closes the descriptor.
pub struct TimerHandle<P: Platform = SysPlatform> {
    fd: RawFd,
    released: bool,
    clock_source: ClockSource,
    flags: TimerFlags,
    interval: Interval,
    platform: P,
}

impl TimerHandle<SysPlatform> {
    /// Periodic timer firing every `interval_ms` on the monotonic clock,
    /// close-on-exec and non-blocking.
    ///
    /// ```
    /// use pollable_timer::prelude::*;
    ///
    /// let timer = TimerHandle::new(100)?;
    /// let fd = timer.descriptor();
    /// assert_eq!(fd, timer.descriptor());
    /// # Ok::<(), TimerError>(())
    /// ```
    pub fn new(interval_ms: u64) -> Result<Self, TimerError> {
        TimerHandle::with_options(interval_ms, ClockSource::default(), TimerFlags::default())
    }

    /// Periodic timer with an explicit clock and creation flags.
    pub fn with_options(
        interval_ms: u64,
        clock_source: ClockSource,
        flags: TimerFlags,
    ) -> Result<Self, TimerError> {
        let interval = Interval::from_millis(interval_ms)?;
        TimerHandle::create_with(SysPlatform, interval, clock_source, flags)
    }

    /// Builder with default configuration.
    pub fn builder() -> TimerBuilder {
        TimerBuilder::new()
    }
}

impl<P: Platform> TimerHandle<P> {
    /// Create a timer through `platform` and arm it to fire every `interval`,
    /// first after one full `interval`.
    ///
    /// If arming fails the freshly created descriptor is closed before
    /// `TimerArmFailed` is returned.
    #[instrument(level = "debug", skip(platform))]
    pub fn create_with(
        platform: P,
        interval: Interval,
        clock_source: ClockSource,
        flags: TimerFlags,
    ) -> Result<Self, TimerError> {
        let fd = platform
            .create_timer(clock_source, flags)
            .map_err(TimerError::TimerCreateFailed)?;
        trace!("timer fd {} created on {:?}.", fd, clock_source);

        // From here on the handle's drop closes `fd` on every early return.
        let mut handle = TimerHandle {
            fd,
            released: false,
            clock_source,
            flags,
            interval,
            platform,
        };

        let spec = NativeTimerSpec::periodic(interval);
        if let Err(e) = handle.platform.arm_timer(fd, ArmFlags::empty(), spec) {
            if let Err(release_error) = handle.release() {
                error!(
                    "timer fd {} could not be released after a failed arm: {}",
                    fd, release_error
                );
            }
            return Err(TimerError::TimerArmFailed(e));
        }

        debug!("timer fd {} armed every {:?}.", fd, interval.as_duration());
        Ok(handle)
    }

    /// Descriptor to register with epoll/poll/select.
    /// Stable for the handle's lifetime, invalid after it.
    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    /// Clock the timer was created on.
    pub fn clock_source(&self) -> ClockSource {
        self.clock_source
    }

    /// Flags the descriptor currently carries: the creation flags, plus
    /// `NON_BLOCKING` once the handle has been registered with an async reactor.
    pub fn flags(&self) -> TimerFlags {
        self.flags
    }

    /// The reactor switched the descriptor to `O_NONBLOCK`.
    #[cfg(feature = "async")]
    pub(crate) fn mark_non_blocking(&mut self) {
        self.flags |= TimerFlags::NON_BLOCKING;
    }

    /// Period the timer was armed with.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Native surface the timer was created through.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Time left until the next expiration, and the period, as the kernel reports them.
    pub fn current_spec(&self) -> Result<NativeTimerSpec, TimerError> {
        self.platform
            .read_timer_spec(self.fd)
            .map_err(TimerError::TimerReadFailed)
    }

    /// Number of expirations since the last read, resetting the counter.
    ///
    /// On a blocking timer this waits for the next expiration; on a
    /// non-blocking one it fails with a would-block `TimerReadFailed`.
    pub fn read_expirations(&self) -> Result<u64, TimerError> {
        self.platform
            .read_expirations(self.fd)
            .map_err(TimerError::TimerReadFailed)
    }

    /// Like `read_expirations`, `None` if the timer hasn't fired since the last read.
    pub fn try_read_expirations(&self) -> Result<Option<u64>, TimerError> {
        match self.read_expirations() {
            Ok(expirations) => Ok(Some(expirations)),
            Err(e) if e.is_would_block() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Release the descriptor now and report a failing `close`.
    /// The handle's drop won't close it a second time.
    pub fn close(mut self) -> Result<(), TimerError> {
        self.release()
    }

    // Runs at most one `close`, whatever it returns.
    fn release(&mut self) -> Result<(), TimerError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.platform
            .close(self.fd)
            .map_err(TimerError::ReleaseFailed)?;
        trace!("timer fd {} released.", self.fd);
        Ok(())
    }
}

impl<P: Platform> Drop for TimerHandle<P> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            error!(
                "timer fd {}: {} ({})",
                self.fd,
                e,
                e.io_error().map(ToString::to_string).unwrap_or_default()
            );
        }
    }
}

impl<P: Platform> AsRawFd for TimerHandle<P> {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl<P: Platform> AsFd for TimerHandle<P> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // Open until the handle is dropped, which the borrow outlives.
        unsafe { BorrowedFd::borrow_raw(self.fd) }
    }
}

impl<P: Platform> IntoRawFd for TimerHandle<P> {
    /// The caller becomes responsible for closing the descriptor.
    fn into_raw_fd(mut self) -> RawFd {
        self.released = true;
        self.fd
    }
}

impl<P: Platform> fmt::Debug for TimerHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("fd", &self.fd)
            .field("clock_source", &self.clock_source)
            .field("flags", &self.flags)
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MockPlatform;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;

    const FD: RawFd = 7;

    fn os_error(code: i32) -> io::Error {
        io::Error::from_raw_os_error(code)
    }

    fn expect_create(platform: &mut MockPlatform, clock: ClockSource, flags: TimerFlags) {
        platform
            .expect_create_timer()
            .with(eq(clock), eq(flags))
            .times(1)
            .returning(|_, _| Ok(FD));
    }

    #[test]
    fn test_create_arm_release_in_order() {
        let mut platform = MockPlatform::new();
        let mut seq = Sequence::new();
        let spec = NativeTimerSpec::periodic(Interval::from_millis(1500).unwrap());

        platform
            .expect_create_timer()
            .with(eq(ClockSource::Monotonic), eq(TimerFlags::default()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(FD));
        platform
            .expect_arm_timer()
            .with(eq(FD), eq(ArmFlags::empty()), eq(spec))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(NativeTimerSpec::DISARMED));
        platform
            .expect_close()
            .with(eq(FD))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let timer = TimerBuilder::new()
            .interval_ms(1500)
            .platform(platform)
            .build()
            .unwrap();

        assert_eq!(timer.descriptor(), FD);
        assert_eq!(timer.as_raw_fd(), FD);
        assert_eq!(timer.descriptor(), FD);
        assert_eq!(timer.clock_source(), ClockSource::Monotonic);
        assert_eq!(timer.flags(), TimerFlags::default());
        assert_eq!(timer.interval().as_millis(), 1500);
    }

    #[test]
    fn test_create_failure_allocates_nothing() {
        let mut platform = MockPlatform::new();
        platform
            .expect_create_timer()
            .times(1)
            .returning(|_, _| Err(os_error(libc::EMFILE)));
        platform.expect_arm_timer().times(0);
        platform.expect_close().times(0);

        let err = TimerHandle::create_with(
            platform,
            Interval::from_millis(10).unwrap(),
            ClockSource::Monotonic,
            TimerFlags::default(),
        )
        .unwrap_err();

        assert!(matches!(err, TimerError::TimerCreateFailed(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EMFILE));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_arm_failure_closes_descriptor() {
        let mut platform = MockPlatform::new();
        expect_create(&mut platform, ClockSource::Realtime, TimerFlags::default());
        platform
            .expect_arm_timer()
            .times(1)
            .returning(|_, _, _| Err(os_error(libc::EINVAL)));
        platform
            .expect_close()
            .with(eq(FD))
            .times(1)
            .returning(|_| Ok(()));

        let err = TimerBuilder::new()
            .interval_ms(100)
            .clock_source(ClockSource::Realtime)
            .platform(platform)
            .build()
            .unwrap_err();

        assert!(matches!(err, TimerError::TimerArmFailed(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_arm_failure_reported_over_release_failure() {
        let mut platform = MockPlatform::new();
        expect_create(&mut platform, ClockSource::Monotonic, TimerFlags::default());
        platform
            .expect_arm_timer()
            .times(1)
            .returning(|_, _, _| Err(os_error(libc::EINVAL)));
        platform
            .expect_close()
            .times(1)
            .returning(|_| Err(os_error(libc::EIO)));

        let err = TimerBuilder::new()
            .interval_ms(100)
            .platform(platform)
            .build()
            .unwrap_err();

        assert!(matches!(err, TimerError::TimerArmFailed(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_invalid_interval_makes_no_os_call() {
        let mut platform = MockPlatform::new();
        platform.expect_create_timer().times(0);

        let err = TimerBuilder::new()
            .interval_ms_f64(-1.0)
            .platform(platform)
            .build()
            .unwrap_err();
        assert!(err.is_invalid_input());

        let err = TimerBuilder::new()
            .platform(MockPlatform::new())
            .build()
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_zero_interval_accepted() {
        let mut platform = MockPlatform::new();
        expect_create(&mut platform, ClockSource::Monotonic, TimerFlags::default());
        platform
            .expect_arm_timer()
            .with(eq(FD), eq(ArmFlags::empty()), eq(NativeTimerSpec::DISARMED))
            .times(1)
            .returning(|_, _, _| Ok(NativeTimerSpec::DISARMED));
        platform.expect_close().times(1).returning(|_| Ok(()));

        let timer = TimerBuilder::new()
            .interval_ms(0)
            .platform(platform)
            .build()
            .unwrap();
        assert!(timer.interval().is_zero());
    }

    #[test]
    fn test_empty_flags_forwarded() {
        let mut platform = MockPlatform::new();
        expect_create(&mut platform, ClockSource::Monotonic, TimerFlags::empty());
        platform
            .expect_arm_timer()
            .returning(|_, _, _| Ok(NativeTimerSpec::DISARMED));
        platform.expect_close().times(1).returning(|_| Ok(()));

        let timer = TimerBuilder::new()
            .interval(Interval::from_millis(5).unwrap())
            .flags(TimerFlags::empty())
            .platform(platform)
            .build()
            .unwrap();
        assert!(timer.flags().is_empty());
    }

    fn armed_timer(mut platform: MockPlatform) -> TimerHandle<MockPlatform> {
        expect_create(&mut platform, ClockSource::Monotonic, TimerFlags::default());
        platform
            .expect_arm_timer()
            .returning(|_, _, _| Ok(NativeTimerSpec::DISARMED));

        TimerBuilder::new()
            .interval_ms(100)
            .platform(platform)
            .build()
            .unwrap()
    }

    #[test]
    fn test_explicit_close_releases_once() {
        let mut platform = MockPlatform::new();
        platform
            .expect_close()
            .with(eq(FD))
            .times(1)
            .returning(|_| Ok(()));

        let timer = armed_timer(platform);
        timer.close().unwrap();
    }

    #[test]
    fn test_close_failure_surfaces_release_failed() {
        let mut platform = MockPlatform::new();
        platform
            .expect_close()
            .times(1)
            .returning(|_| Err(os_error(libc::EIO)));

        let err = armed_timer(platform).close().unwrap_err();
        assert!(matches!(err, TimerError::ReleaseFailed(_)));
        assert_eq!(err.raw_os_error(), Some(libc::EIO));
    }

    #[test]
    fn test_drop_swallows_release_failure() {
        let mut platform = MockPlatform::new();
        platform
            .expect_close()
            .times(1)
            .returning(|_| Err(os_error(libc::EBADF)));

        drop(armed_timer(platform));
    }

    #[test]
    fn test_into_raw_fd_gives_up_ownership() {
        let mut platform = MockPlatform::new();
        platform.expect_close().times(0);

        let fd = armed_timer(platform).into_raw_fd();
        assert_eq!(fd, FD);
    }

    #[test]
    fn test_read_passthrough() {
        let mut platform = MockPlatform::new();
        let spec = NativeTimerSpec::periodic(Interval::from_millis(100).unwrap());
        platform
            .expect_read_timer_spec()
            .with(eq(FD))
            .returning(move |_| Ok(spec));
        let mut seq = Sequence::new();
        platform
            .expect_read_expirations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(3));
        platform
            .expect_read_expirations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(os_error(libc::EAGAIN)));
        platform
            .expect_read_expirations()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(os_error(libc::EBADF)));
        platform.expect_close().returning(|_| Ok(()));

        let timer = armed_timer(platform);
        assert_eq!(timer.current_spec().unwrap(), spec);
        assert_eq!(timer.try_read_expirations().unwrap(), Some(3));
        assert_eq!(timer.try_read_expirations().unwrap(), None);

        let err = timer.try_read_expirations().unwrap_err();
        assert!(matches!(err, TimerError::TimerReadFailed(_)));
    }

    #[test]
    fn test_shared_platform_closes_only_own_descriptor() {
        let mut platform = MockPlatform::new();
        let mut next_fd = 3;
        platform
            .expect_create_timer()
            .times(2)
            .returning(move |_, _| {
                next_fd += 1;
                Ok(next_fd)
            });
        platform
            .expect_arm_timer()
            .times(2)
            .returning(|_, _, _| Ok(NativeTimerSpec::DISARMED));
        platform
            .expect_close()
            .with(eq(4))
            .times(1)
            .returning(|_| Ok(()));
        platform
            .expect_close()
            .with(eq(5))
            .times(1)
            .returning(|_| Ok(()));

        let first = TimerBuilder::new()
            .interval_ms(10)
            .platform(&platform)
            .build()
            .unwrap();
        let second = TimerBuilder::new()
            .interval_ms(20)
            .platform(&platform)
            .build()
            .unwrap();

        assert_eq!(first.descriptor(), 4);
        assert_eq!(second.descriptor(), 5);

        drop(first);
        assert_eq!(second.descriptor(), 5);
        second.close().unwrap();
    }

    #[test]
    fn test_debug_output() {
        let mut platform = MockPlatform::new();
        platform.expect_close().returning(|_| Ok(()));

        let timer = armed_timer(platform);
        let debug = format!("{:?}", timer);
        assert!(debug.starts_with("TimerHandle { fd: 7"));
    }
}
