use anyhow::Result;
use pollable_timer::prelude::*;

use std::io;

// RUST_LOG=trace cargo run --example poll_loop
fn main() -> Result<()> {
    env_logger::init();

    let fast = TimerHandle::new(100)?;
    let slow = TimerHandle::builder()
        .interval_ms(350)
        .clock_source(ClockSource::Monotonic)
        .build()?;

    let mut pollfds = [
        libc::pollfd {
            fd: fast.descriptor(),
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: slow.descriptor(),
            events: libc::POLLIN,
            revents: 0,
        },
    ];

    for round in 0..10 {
        let ready = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                1_000,
            )
        };
        if ready == -1 {
            return Err(io::Error::last_os_error().into());
        }

        for (pollfd, (name, timer)) in pollfds
            .iter_mut()
            .zip([("fast", &fast), ("slow", &slow)].iter())
        {
            if pollfd.revents & libc::POLLIN != 0 {
                if let Some(expirations) = timer.try_read_expirations()? {
                    println!("round {}: {} fired {} time(s)", round, name, expirations);
                }
            }
            pollfd.revents = 0;
        }
    }

    slow.close()?;
    Ok(())
}
