//! Linux `timerfd` bindings through libc.
use super::Platform;
use crate::prelude::*;

use std::mem::{self, MaybeUninit};

macro_rules! syscall {
    ($fn:ident ( $($arg:expr),* $(,)* ) ) => {{
        #[allow(unused_unsafe)]
        let res = unsafe { libc::$fn($($arg, )*) };
        if res == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

/// The host kernel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SysPlatform;

impl Platform for SysPlatform {
    fn create_timer(&self, clock: ClockSource, flags: TimerFlags) -> io::Result<RawFd> {
        syscall!(timerfd_create(clock.as_raw(), flags.bits()))
    }

    fn arm_timer(
        &self,
        fd: RawFd,
        flags: ArmFlags,
        new_spec: NativeTimerSpec,
    ) -> io::Result<NativeTimerSpec> {
        let new_value: libc::itimerspec = new_spec.into();
        let mut old_value = MaybeUninit::<libc::itimerspec>::zeroed();

        syscall!(timerfd_settime(
            fd,
            flags.bits(),
            &new_value,
            old_value.as_mut_ptr()
        ))?;

        // Filled by the kernel on success.
        Ok(unsafe { old_value.assume_init() }.into())
    }

    fn read_timer_spec(&self, fd: RawFd) -> io::Result<NativeTimerSpec> {
        let mut curr_value = MaybeUninit::<libc::itimerspec>::zeroed();
        syscall!(timerfd_gettime(fd, curr_value.as_mut_ptr()))?;
        Ok(unsafe { curr_value.assume_init() }.into())
    }

    fn read_expirations(&self, fd: RawFd) -> io::Result<u64> {
        let mut expirations: u64 = 0;
        let expected = mem::size_of::<u64>();

        let read = syscall!(read(
            fd,
            &mut expirations as *mut u64 as *mut libc::c_void,
            expected
        ))?;

        // A timerfd read is all or nothing.
        if read as usize != expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short timerfd read: {} of {} bytes", read, expected),
            ));
        }

        Ok(expirations)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        syscall!(close(fd)).map(drop)
    }
}
