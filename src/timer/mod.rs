//! timer is the core module of the library, it converts intervals into the
//! kernel's native layout and owns the timer descriptor.

pub mod flags;
pub mod handle;
pub mod interval;

cfg_async!(
    pub mod async_handle;
);

pub use flags::{ArmFlags, ClockSource, TimerFlags};
pub use handle::{TimerBuilder, TimerHandle};
pub use interval::{Interval, NativeTimeSpec, NativeTimerSpec};
