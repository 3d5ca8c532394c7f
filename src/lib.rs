//! pollable-timer wraps the Linux `timerfd` interface into an owned handle
//! whose descriptor can sit in any readiness-polling set (epoll, poll,
//! select, an async reactor) next to sockets and pipes.
//!
//! # Usage
//!
//! First, add this to your Cargo.toml
//!
//! ```toml
//! [dependencies]
//! pollable_timer = "0.1"
//! ```
//!
//! Next:
//!
//! ``` rust
//! use pollable_timer::prelude::*;
//!
//! fn main() -> Result<(), TimerError> {
//!     // Fires every 100ms on the monotonic clock, first after 100ms.
//!     let timer = TimerHandle::new(100)?;
//!
//!     let mut pollfd = libc::pollfd {
//!         fd: timer.descriptor(),
//!         events: libc::POLLIN,
//!         revents: 0,
//!     };
//!     let ready = unsafe { libc::poll(&mut pollfd, 1, 250) };
//!     assert_eq!(ready, 1);
//!
//!     // Drain the expiration counter before polling again.
//!     let expirations = timer.read_expirations()?;
//!     assert!(expirations >= 1);
//!
//!     // The descriptor is closed when `timer` goes out of scope.
//!     Ok(())
//! }
//! ```
//!
//! Non-default clocks and flags go through the builder:
//!
//! ``` rust
//! use pollable_timer::prelude::*;
//!
//! let timer = TimerHandle::builder()
//!     .interval_ms_f64(12.5)
//!     .clock_source(ClockSource::Realtime)
//!     .flags(TimerFlags::empty())
//!     .build()?;
//!
//! assert_eq!(timer.interval().nanoseconds(), 12_500_000);
//! # Ok::<(), TimerError>(())
//! ```
//!
//! With the `async` feature, `AsyncTimer` awaits the same descriptor on the
//! smol reactor.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

#[cfg(not(any(target_os = "linux", target_os = "android")))]
compile_error!("pollable_timer is built on timerfd, which only Linux and Android provide.");

#[macro_use]
pub(crate) mod macros;

pub mod error;
pub mod platform;
pub mod prelude;
pub mod timer;

pub use error::TimerError;
pub use platform::{Platform, SysPlatform};
pub use timer::{ClockSource, Interval, TimerBuilder, TimerFlags, TimerHandle};

cfg_async!(
    pub use timer::async_handle::{AsyncTimer, Ticks};
);
