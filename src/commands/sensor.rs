//! `sensor temperature` / `sensor humidity` / `sensor pressure`.
use std::sync::Arc;

use super::AppState;
use crate::dispatcher::Registration;

pub fn registrations(state: Arc<AppState>) -> Vec<Registration> {
    vec![temperature(state.clone()), humidity(state.clone()), pressure(state)]
}

fn temperature(state: Arc<AppState>) -> Registration {
    Registration {
        target: "sensor".into(),
        action: "temperature".into(),
        handler: Arc::new(move |_args, _ctx| {
            let state = state.clone();
            Box::pin(async move { Ok(format!("{:.2}", state.sensor.get_temperature().await?)) })
        }),
    }
}

fn humidity(state: Arc<AppState>) -> Registration {
    Registration {
        target: "sensor".into(),
        action: "humidity".into(),
        handler: Arc::new(move |_args, _ctx| {
            let state = state.clone();
            Box::pin(async move { Ok(format!("{:.2}", state.sensor.get_humidity().await?)) })
        }),
    }
}

fn pressure(state: Arc<AppState>) -> Registration {
    Registration {
        target: "sensor".into(),
        action: "pressure".into(),
        handler: Arc::new(move |_args, _ctx| {
            let state = state.clone();
            Box::pin(async move { Ok(format!("{:.2}", state.sensor.get_pressure().await?)) })
        }),
    }
}
