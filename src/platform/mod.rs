//! platform
//! The native timer surface a `TimerHandle` drives.
//!
//! Every call maps one-to-one onto a system call, so `TimerHandle` can be
//! exercised against a fake implementation without touching the kernel.

use crate::prelude::*;

pub mod sys;

pub use sys::SysPlatform;

/// Abstraction of the OS interval-timer calls.
#[cfg_attr(test, mockall::automock)]
pub trait Platform {
    /// `timerfd_create`. Returns a fresh descriptor with `flags` already applied.
    fn create_timer(&self, clock: ClockSource, flags: TimerFlags) -> io::Result<RawFd>;

    /// `timerfd_settime`. Replaces the schedule and returns the previous one.
    fn arm_timer(
        &self,
        fd: RawFd,
        flags: ArmFlags,
        new_spec: NativeTimerSpec,
    ) -> io::Result<NativeTimerSpec>;

    /// `timerfd_gettime`. Remaining time until the next expiration and the period.
    fn read_timer_spec(&self, fd: RawFd) -> io::Result<NativeTimerSpec>;

    /// Read the expiration counter and reset it to zero.
    /// Fails with `WouldBlock` on a non-blocking timer that hasn't fired yet.
    fn read_expirations(&self, fd: RawFd) -> io::Result<u64>;

    /// `close`.
    fn close(&self, fd: RawFd) -> io::Result<()>;
}

impl<P: Platform + ?Sized> Platform for &P {
    fn create_timer(&self, clock: ClockSource, flags: TimerFlags) -> io::Result<RawFd> {
        (**self).create_timer(clock, flags)
    }

    fn arm_timer(
        &self,
        fd: RawFd,
        flags: ArmFlags,
        new_spec: NativeTimerSpec,
    ) -> io::Result<NativeTimerSpec> {
        (**self).arm_timer(fd, flags, new_spec)
    }

    fn read_timer_spec(&self, fd: RawFd) -> io::Result<NativeTimerSpec> {
        (**self).read_timer_spec(fd)
    }

    fn read_expirations(&self, fd: RawFd) -> io::Result<u64> {
        (**self).read_expirations(fd)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        (**self).close(fd)
    }
}
