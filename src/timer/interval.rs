//! Interval conversion between caller-facing milliseconds and the kernel's
//! `timespec`/`itimerspec` layout.
use crate::prelude::*;

/// Width of `tv_sec` on the host.
pub type NativeSeconds = libc::time_t;
/// Width of `tv_nsec` on the host.
pub type NativeNanos = libc::c_long;

pub(crate) const MILLIS_PER_SECOND: u64 = 1_000;
pub(crate) const NANOS_PER_MILLI: u64 = 1_000_000;
pub(crate) const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Largest whole second the kernel stores exactly. `timerfd_settime` clamps
/// anything from `KTIME_SEC_MAX` (`i64::MAX / 1e9`) upwards.
const KERNEL_MAX_SECONDS: u64 = i64::MAX as u64 / NANOS_PER_SECOND - 1;

/// Upper bound on `Interval::seconds`, also capped by the host `time_t`.
const MAX_SECONDS: u64 = if (NativeSeconds::MAX as u64) < KERNEL_MAX_SECONDS {
    NativeSeconds::MAX as u64
} else {
    KERNEL_MAX_SECONDS
};

/// Native `(seconds, nanoseconds)` pair, the shape of `struct timespec`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTimeSpec {
    /// Whole seconds.
    pub tv_sec: NativeSeconds,
    /// Nanoseconds, always in `0..1_000_000_000`.
    pub tv_nsec: NativeNanos,
}

impl NativeTimeSpec {
    /// Zero duration. As an initial expiration it disarms a timer.
    pub const ZERO: NativeTimeSpec = NativeTimeSpec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    /// Whether this is the zero duration.
    pub fn is_zero(&self) -> bool {
        self.tv_sec == 0 && self.tv_nsec == 0
    }
}

impl From<NativeTimeSpec> for libc::timespec {
    fn from(spec: NativeTimeSpec) -> Self {
        libc::timespec {
            tv_sec: spec.tv_sec,
            tv_nsec: spec.tv_nsec,
        }
    }
}

impl From<libc::timespec> for NativeTimeSpec {
    fn from(ts: libc::timespec) -> Self {
        NativeTimeSpec {
            tv_sec: ts.tv_sec,
            tv_nsec: ts.tv_nsec,
        }
    }
}

/// Native `(interval, initial expiration)` pair, the shape of `struct itimerspec`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTimerSpec {
    /// Period between firings after the first one. Zero means one-shot.
    pub interval: NativeTimeSpec,
    /// Time until the first firing. Zero disarms.
    pub value: NativeTimeSpec,
}

impl NativeTimerSpec {
    /// Passing this to `timerfd_settime` stops the timer.
    pub const DISARMED: NativeTimerSpec = NativeTimerSpec {
        interval: NativeTimeSpec::ZERO,
        value: NativeTimeSpec::ZERO,
    };

    /// First firing after one full `interval`, then every `interval`.
    pub fn periodic(interval: Interval) -> Self {
        let spec = interval.native();
        NativeTimerSpec {
            interval: spec,
            value: spec,
        }
    }

    /// Whether applying this spec leaves the timer running.
    pub fn is_armed(&self) -> bool {
        !self.value.is_zero()
    }
}

impl From<NativeTimerSpec> for libc::itimerspec {
    fn from(spec: NativeTimerSpec) -> Self {
        libc::itimerspec {
            it_interval: spec.interval.into(),
            it_value: spec.value.into(),
        }
    }
}

impl From<libc::itimerspec> for NativeTimerSpec {
    fn from(spec: libc::itimerspec) -> Self {
        NativeTimerSpec {
            interval: spec.it_interval.into(),
            value: spec.it_value.into(),
        }
    }
}

/// A validated, non-negative timer period already decomposed into native units.
///
/// Every constructor rejects periods above `Interval::MAX`, so an `Interval`
/// can always be handed to the kernel as-is and read back unchanged.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    spec: NativeTimeSpec,
}

impl Interval {
    /// The degenerate zero period. Accepted; the kernel treats a zero initial
    /// expiration as "disarmed", so a zero-interval timer never fires.
    pub const ZERO: Interval = Interval {
        spec: NativeTimeSpec::ZERO,
    };

    /// The longest accepted period, just under the kernel's clamping point
    /// (or the host `time_t` limit if that is lower).
    pub const MAX: Interval = Interval {
        spec: NativeTimeSpec {
            tv_sec: MAX_SECONDS as NativeSeconds,
            tv_nsec: (NANOS_PER_SECOND - 1) as NativeNanos,
        },
    };

    /// `seconds = ms / 1000`, `nanoseconds = (ms % 1000) * 1_000_000`.
    pub fn from_millis(ms: u64) -> Result<Self, TimerError> {
        let tv_sec = seconds_to_native(ms / MILLIS_PER_SECOND)?;
        // < 1_000_000_000, fits a 32-bit c_long.
        let tv_nsec = ((ms % MILLIS_PER_SECOND) * NANOS_PER_MILLI) as NativeNanos;

        Ok(Interval {
            spec: NativeTimeSpec { tv_sec, tv_nsec },
        })
    }

    /// Fractional milliseconds. The sub-millisecond part is rounded to the
    /// nearest nanosecond.
    pub fn from_millis_f64(ms: f64) -> Result<Self, TimerError> {
        if !ms.is_finite() {
            return Err(TimerError::invalid_interval(format!(
                "{} ms is not a finite number",
                ms
            )));
        }
        if ms < 0.0 {
            return Err(TimerError::invalid_interval(format!(
                "{} ms is negative",
                ms
            )));
        }

        let whole_seconds = (ms / MILLIS_PER_SECOND as f64).floor();
        if whole_seconds > MAX_SECONDS as f64 {
            return Err(TimerError::invalid_interval(format!(
                "{} ms exceeds the longest timer period",
                ms
            )));
        }

        let mut seconds = whole_seconds as u64;
        let remainder_ms = ms - whole_seconds * MILLIS_PER_SECOND as f64;
        let mut nanos = (remainder_ms * NANOS_PER_MILLI as f64).round().max(0.0) as u64;
        if nanos >= NANOS_PER_SECOND {
            seconds += 1;
            nanos -= NANOS_PER_SECOND;
        }

        Ok(Interval {
            spec: NativeTimeSpec {
                tv_sec: seconds_to_native(seconds)?,
                tv_nsec: nanos as NativeNanos,
            },
        })
    }

    /// Native representation handed to the kernel.
    pub fn native(&self) -> NativeTimeSpec {
        self.spec
    }

    /// Whole seconds.
    pub fn seconds(&self) -> NativeSeconds {
        self.spec.tv_sec
    }

    /// Nanoseconds past the whole seconds.
    pub fn nanoseconds(&self) -> NativeNanos {
        self.spec.tv_nsec
    }

    /// `seconds * 1000 + nanoseconds / 1_000_000`, sub-millisecond part truncated.
    ///
    /// Bounded by `Interval::MAX`, far below `u64::MAX`.
    pub fn as_millis(&self) -> u64 {
        self.spec.tv_sec as u64 * MILLIS_PER_SECOND + self.spec.tv_nsec as u64 / NANOS_PER_MILLI
    }

    /// As a std `Duration`.
    pub fn as_duration(&self) -> Duration {
        Duration::new(self.spec.tv_sec as u64, self.spec.tv_nsec as u32)
    }

    /// Whether this is the zero period.
    pub fn is_zero(&self) -> bool {
        self.spec.is_zero()
    }
}

// Nanoseconds are always below one second and `Interval::MAX` carries the
// full 999_999_999, so bounding the seconds bounds the whole period.
fn seconds_to_native(seconds: u64) -> Result<NativeSeconds, TimerError> {
    if seconds > MAX_SECONDS {
        return Err(TimerError::invalid_interval(format!(
            "{} s exceeds the longest timer period of {} s",
            seconds, MAX_SECONDS
        )));
    }

    NativeSeconds::try_from(seconds).map_err(|_| {
        TimerError::invalid_interval(format!(
            "{} s overflows the native seconds field",
            seconds
        ))
    })
}

impl TryFrom<u64> for Interval {
    type Error = TimerError;

    fn try_from(ms: u64) -> Result<Self, Self::Error> {
        Interval::from_millis(ms)
    }
}

impl TryFrom<u32> for Interval {
    type Error = TimerError;

    fn try_from(ms: u32) -> Result<Self, Self::Error> {
        Interval::from_millis(u64::from(ms))
    }
}

impl TryFrom<i64> for Interval {
    type Error = TimerError;

    fn try_from(ms: i64) -> Result<Self, Self::Error> {
        let ms = u64::try_from(ms)
            .map_err(|_| TimerError::invalid_interval(format!("{} ms is negative", ms)))?;
        Interval::from_millis(ms)
    }
}

impl TryFrom<i32> for Interval {
    type Error = TimerError;

    fn try_from(ms: i32) -> Result<Self, Self::Error> {
        Interval::try_from(i64::from(ms))
    }
}

impl TryFrom<f64> for Interval {
    type Error = TimerError;

    fn try_from(ms: f64) -> Result<Self, Self::Error> {
        Interval::from_millis_f64(ms)
    }
}

impl TryFrom<Duration> for Interval {
    type Error = TimerError;

    fn try_from(duration: Duration) -> Result<Self, Self::Error> {
        Ok(Interval {
            spec: NativeTimeSpec {
                tv_sec: seconds_to_native(duration.as_secs())?,
                tv_nsec: duration.subsec_nanos() as NativeNanos,
            },
        })
    }
}

impl From<Interval> for Duration {
    fn from(interval: Interval) -> Self {
        interval.as_duration()
    }
}
