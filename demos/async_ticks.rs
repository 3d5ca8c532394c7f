use anyhow::Result;
use futures::StreamExt;
use pollable_timer::prelude::*;

use std::time::Duration;

// RUST_LOG=debug cargo run --example async_ticks --features full
fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    smol::block_on(async {
        let mut ticks = AsyncTimer::new(200)?.into_stream();
        let deadline = smol::Timer::after(Duration::from_secs(1));

        smol::spawn(async {
            let heartbeat = AsyncTimer::new(500)?;
            while heartbeat.tick().await.is_ok() {
                println!("heartbeat");
            }
            Ok::<(), TimerError>(())
        })
        .detach();

        let mut total = 0;
        while let Some(expirations) = ticks.next().await {
            total += expirations?;
            println!("tick, {} so far", total);
            if total >= 5 {
                break;
            }
        }

        deadline.await;
        Ok::<(), anyhow::Error>(())
    })
}
