//! `gpio set <line> <0|1>` / `gpio get <line>`.
use std::sync::Arc;

use crate::dispatcher::Registration;
use crate::error::Error;

use super::AppState;

pub fn registrations(state: Arc<AppState>) -> Vec<Registration> {
    vec![set(state.clone()), get(state)]
}

fn set(state: Arc<AppState>) -> Registration {
    Registration {
        target: "gpio".into(),
        action: "set".into(),
        handler: Arc::new(move |args, _ctx| {
            let state = state.clone();
            Box::pin(async move {
                let line = parse_line(&args)?;
                let value = args
                    .get(1)
                    .ok_or_else(|| Error::InvalidArgument("missing state argument".into()))?;
                let on = match value.as_str() {
                    "0" => false,
                    "1" => true,
                    other => {
                        return Err(Error::InvalidArgument(format!(
                            "state must be 0 or 1, got `{other}`"
                        )))
                    }
                };
                state.gpio.set(line, on).await?;
                Ok(format!("{line} {}", if on { 1 } else { 0 }))
            })
        }),
    }
}

fn get(state: Arc<AppState>) -> Registration {
    Registration {
        target: "gpio".into(),
        action: "get".into(),
        handler: Arc::new(move |args, _ctx| {
            let state = state.clone();
            Box::pin(async move {
                let line = parse_line(&args)?;
                let value = state.gpio.get(line).await?;
                Ok(format!("{line} {}", if value { 1 } else { 0 }))
            })
        }),
    }
}

fn parse_line(args: &[String]) -> crate::error::Result<u32> {
    args.first()
        .ok_or_else(|| Error::InvalidArgument("missing line argument".into()))?
        .parse::<u32>()
        .map_err(|e| Error::InvalidArgument(format!("invalid line number: {e}")))
}
