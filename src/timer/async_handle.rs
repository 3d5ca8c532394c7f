//! Async adapter: wait on a `TimerHandle` through the smol reactor.
//!
//! # Required features
//!
//! This module requires the `async` feature of the `pollable_timer` crate.
use crate::prelude::*;

use futures::Stream;
use smol::Async;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A `TimerHandle` registered with the smol reactor.
///
/// ```
/// use pollable_timer::prelude::*;
///
/// smol::block_on(async {
///     let timer = AsyncTimer::new(10)?;
///     let expirations = timer.tick().await?;
///     assert!(expirations >= 1);
///     Ok::<(), TimerError>(())
/// })?;
/// # Ok::<(), TimerError>(())
/// ```
#[derive(Debug)]
pub struct AsyncTimer<P: Platform = SysPlatform> {
    inner: Async<TimerHandle<P>>,
}

impl AsyncTimer<SysPlatform> {
    /// Periodic timer every `interval_ms` on the monotonic clock.
    pub fn new(interval_ms: u64) -> Result<Self, TimerError> {
        AsyncTimer::from_handle(TimerHandle::new(interval_ms)?)
    }
}

impl<P: Platform> AsyncTimer<P> {
    /// Register an existing handle. Its descriptor is switched to non-blocking mode.
    pub fn from_handle(mut handle: TimerHandle<P>) -> Result<Self, TimerError> {
        handle.mark_non_blocking();
        let inner = Async::new(handle).map_err(TimerError::TimerRegisterFailed)?;
        Ok(AsyncTimer { inner })
    }

    /// Wait for the next expiration and return how many happened since the last tick.
    pub async fn tick(&self) -> Result<u64, TimerError> {
        loop {
            if let Some(expirations) = self.inner.get_ref().try_read_expirations()? {
                return Ok(expirations);
            }

            self.inner
                .readable()
                .await
                .map_err(TimerError::TimerReadFailed)?;
        }
    }

    /// Poll flavour of `tick`.
    pub fn poll_tick(&self, cx: &mut Context<'_>) -> Poll<Result<u64, TimerError>> {
        loop {
            match self.inner.get_ref().try_read_expirations() {
                Ok(Some(expirations)) => return Poll::Ready(Ok(expirations)),
                // Readiness was spurious or consumed elsewhere, wait again.
                Ok(None) => {}
                Err(e) => return Poll::Ready(Err(e)),
            }

            if let Err(e) = futures::ready!(self.inner.poll_readable(cx)) {
                return Poll::Ready(Err(TimerError::TimerReadFailed(e)));
            }
        }
    }

    /// The wrapped handle.
    pub fn get_ref(&self) -> &TimerHandle<P> {
        self.inner.get_ref()
    }

    /// Deregister from the reactor and give the handle back.
    pub fn into_inner(self) -> Result<TimerHandle<P>, TimerError> {
        self.inner
            .into_inner()
            .map_err(TimerError::TimerRegisterFailed)
    }

    /// Endless stream of expiration counts.
    pub fn into_stream(self) -> Ticks<P> {
        Ticks { timer: self }
    }
}

/// Stream returned by [`AsyncTimer::into_stream`].
#[derive(Debug)]
pub struct Ticks<P: Platform = SysPlatform> {
    timer: AsyncTimer<P>,
}

impl<P: Platform> Ticks<P> {
    /// Back to the timer.
    pub fn into_inner(self) -> AsyncTimer<P> {
        self.timer
    }
}

impl<P: Platform> Stream for Ticks<P> {
    type Item = Result<u64, TimerError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.timer.poll_tick(cx).map(Some)
    }
}
