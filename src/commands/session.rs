//! `session ping` / `session echo <words...>` / `session quit`.
use std::sync::Arc;

use crate::dispatcher::Registration;

pub fn registrations() -> Vec<Registration> {
    vec![ping(), echo(), quit()]
}

fn ping() -> Registration {
    Registration {
        target: "session".into(),
        action: "ping".into(),
        handler: Arc::new(|_args, _ctx| Box::pin(async { Ok("pong".to_string()) })),
    }
}

fn echo() -> Registration {
    Registration {
        target: "session".into(),
        action: "echo".into(),
        handler: Arc::new(|args, _ctx| Box::pin(async move { Ok(args.join(" ")) })),
    }
}

/// Responds, then signals the issuing client's own forced-disconnect
/// wake descriptor so the worker tears the connection down right after
/// this response is flushed. The disconnect callback is suppressed since
/// the client asked to leave; it is not an unexpected departure.
fn quit() -> Registration {
    Registration {
        target: "session".into(),
        action: "quit".into(),
        handler: Arc::new(|_args, ctx| {
            Box::pin(async move {
                let ctx = super::handler_context(&ctx);
                ctx.hub.disconnect(ctx.client.addr(), true).await?;
                Ok("bye".to_string())
            })
        }),
    }
}
