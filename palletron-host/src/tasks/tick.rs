//! Ticker for the control loop
//!
//! Signals the control loop once per tick period.

use embassy_time::{Duration, Ticker};
use tracing::info;

use crate::channels::TICK_SIGNAL;

/// Default tick period in milliseconds
pub const DEFAULT_TICK_MS: u64 = 20;

/// Periodic tick source
pub async fn tick_loop(period_ms: u64) {
    info!("Tick loop started ({} ms)", period_ms);

    let mut ticker = Ticker::every(Duration::from_millis(period_ms.max(1)));

    loop {
        ticker.next().await;
        TICK_SIGNAL.signal(());
    }
}
