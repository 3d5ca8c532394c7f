//! A "prelude" for users of the `pollable-timer` crate.
//!
//! This prelude is similar to the standard library's prelude in that you'll
//! almost always want to import its entire contents, but unlike the standard
//! library's prelude you'll have to do so manually:
//!
//! ```
//! use pollable_timer::prelude::*;
//! ```
//!
//! The prelude may grow over time as additional items see ubiquitous use.

pub use crate::error::*;
pub use crate::platform::{Platform, SysPlatform};
pub use crate::timer::flags::{ArmFlags, ClockSource, TimerFlags};
pub use crate::timer::handle::{TimerBuilder, TimerHandle};
pub use crate::timer::interval::{Interval, NativeTimeSpec, NativeTimerSpec};

pub use std::os::unix::io::RawFd;
pub use thiserror::Error;

cfg_async!(
    pub use crate::timer::async_handle::{AsyncTimer, Ticks};
);

pub(crate) use log::{debug, error, trace};
pub(crate) use std::convert::TryFrom;
pub(crate) use std::io;
pub(crate) use std::time::Duration;
pub(crate) use tracing::instrument;
