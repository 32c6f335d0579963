//! `system uptime` / `system stats <interface>`.
use std::sync::Arc;

use super::AppState;
use crate::dispatcher::Registration;
use crate::error::Error;

pub fn registrations(state: Arc<AppState>) -> Vec<Registration> {
    vec![uptime(state.clone()), stats(state)]
}

fn uptime(state: Arc<AppState>) -> Registration {
    Registration {
        target: "system".into(),
        action: "uptime".into(),
        handler: Arc::new(move |_args, _ctx| {
            let state = state.clone();
            Box::pin(async move {
                let uptime = state.stats.uptime_seconds().await?;
                Ok(format!("{uptime:.0}"))
            })
        }),
    }
}

fn stats(state: Arc<AppState>) -> Registration {
    Registration {
        target: "system".into(),
        action: "stats".into(),
        handler: Arc::new(move |args, _ctx| {
            let state = state.clone();
            Box::pin(async move {
                let interface = args
                    .first()
                    .ok_or_else(|| Error::InvalidArgument("missing interface argument".into()))?;
                let (total_kb, available_kb) = state.stats.memory_totals_kb().await?;
                let counters = state.stats.interface_counters(interface).await?;
                Ok(format!(
                    "mem_total_kb={total_kb} mem_available_kb={available_kb} rx_bytes={} rx_packets={} tx_bytes={} tx_packets={}",
                    counters.rx_bytes, counters.rx_packets, counters.tx_bytes, counters.tx_packets
                ))
            })
        }),
    }
}
