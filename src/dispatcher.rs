//! The command dispatcher: a fixed-capacity `{target, action -> handler}`
//! table with a tokenizer and an invoker.
//!
//! This is one of the two core subsystems this repository exists to get
//! right (the other is [`crate::server`]); everything in [`crate::commands`]
//! is glue that registers handlers here.
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

/// A handler receives the parsed argument vector and a caller-supplied,
/// opaque context (the serving path supplies the originating client plus
/// shared application state — see [`crate::commands::HandlerContext`]) and
/// returns the response line body (without the leading marker byte, which
/// the application layer prepends).
///
/// Handlers are boxed futures rather than a plain `Fn` because several
/// (sensor reads, GPIO access through an async transport) need to `.await`
/// an external collaborator.
pub type HandlerResult = Pin<Box<dyn Future<Output = Result<String>> + Send>>;
pub type Handler = Arc<dyn Fn(Vec<String>, Arc<dyn std::any::Any + Send + Sync>) -> HandlerResult + Send + Sync>;

struct Slot {
    target: String,
    action: String,
    handler: Handler,
}

/// A single command's target, action, and handler, as passed to
/// [`Dispatcher::register`].
pub struct Registration {
    pub target: String,
    pub action: String,
    pub handler: Handler,
}

/// One parsed command line, built by [`Dispatcher::execute`] and never
/// stored beyond that call.
#[derive(Debug, Clone)]
pub struct TokenizedCommand {
    pub target: String,
    pub action: String,
    pub args: Vec<String>,
}

/// The fixed-capacity command table described in spec.md §3/§4.5.
pub struct Dispatcher {
    delimiter: String,
    max_target_len: usize,
    max_action_len: usize,
    max_arg_len: usize,
    max_args: usize,
    max_buffer_len: usize,
    slots: Mutex<Vec<Option<Slot>>>,
}

impl Dispatcher {
    pub fn new(config: &crate::config::DispatcherConfig) -> Result<Self> {
        if config.delimiter.is_empty() || config.delimiter.len() > crate::config::MAX_DELIMITER_LEN {
            return Err(Error::InvalidArgument("delimiter out of range".into()));
        }
        let mut slots = Vec::with_capacity(config.max_slots);
        slots.resize_with(config.max_slots, || None);
        Ok(Self {
            delimiter: config.delimiter.clone(),
            max_target_len: config.max_target_len,
            max_action_len: config.max_action_len,
            max_arg_len: config.max_arg_len,
            max_args: config.max_args,
            max_buffer_len: config.max_buffer_len(),
            slots: Mutex::new(slots),
        })
    }

    /// Register a handler at `id`. Fails with `Error::IdAlreadyTaken` if
    /// the slot is already populated.
    pub fn register(&self, id: usize, registration: Registration) -> Result<()> {
        if registration.target.is_empty() || registration.target.len() >= self.max_target_len {
            return Err(Error::InvalidArgument("target out of range".into()));
        }
        if registration.action.is_empty() || registration.action.len() >= self.max_action_len {
            return Err(Error::InvalidArgument("action out of range".into()));
        }
        let mut slots = self.slots.lock().map_err(poison_err)?;
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| Error::InvalidArgument(format!("id {id} out of range")))?;
        if slot.is_some() {
            return Err(Error::IdAlreadyTaken);
        }
        *slot = Some(Slot {
            target: registration.target,
            action: registration.action,
            handler: registration.handler,
        });
        Ok(())
    }

    /// Mark `id`'s slot invalid. No-op if already invalid.
    pub fn deregister(&self, id: usize) -> Result<()> {
        let mut slots = self.slots.lock().map_err(poison_err)?;
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| Error::InvalidArgument(format!("id {id} out of range")))?;
        *slot = None;
        Ok(())
    }

    /// Tokenize `buffer` and, on first match (scanning slot-index order,
    /// ASCII case-insensitive target/action comparison), invoke the
    /// matching handler. Returns `Error::CmdNotFound` if no slot matches.
    pub async fn execute(
        &self,
        buffer: &str,
        context: Arc<dyn std::any::Any + Send + Sync>,
    ) -> Result<String> {
        let tokenized = self.tokenize(buffer)?;

        let handler = {
            let slots = self.slots.lock().map_err(poison_err)?;
            let mut found: Option<Handler> = None;
            for slot in slots.iter().flatten() {
                if ascii_ieq(&slot.target, &tokenized.target, self.max_target_len)
                    && ascii_ieq(&slot.action, &tokenized.action, self.max_action_len)
                {
                    found = Some(slot.handler.clone());
                    break;
                }
            }
            found.ok_or(Error::CmdNotFound)?
        };

        handler(tokenized.args, context).await
    }

    fn tokenize(&self, buffer: &str) -> Result<TokenizedCommand> {
        let trimmed = buffer.trim();
        if buffer.len() >= self.max_buffer_len {
            return Err(Error::BufTooLong);
        }
        if trimmed.is_empty() {
            return Err(Error::BufEmpty);
        }

        let mut tokens = trimmed
            .split(self.delimiter.as_str())
            .filter(|t| !t.is_empty());

        let target = tokens.next().ok_or(Error::CmdIncomplete)?;
        if target.len() >= self.max_target_len {
            return Err(Error::TokenTooLong);
        }
        let action = tokens.next().ok_or(Error::CmdIncomplete)?;
        if action.len() >= self.max_action_len {
            return Err(Error::TokenTooLong);
        }

        let mut args = Vec::new();
        for token in tokens {
            if args.len() >= self.max_args {
                return Err(Error::TooManyArgs);
            }
            if token.len() >= self.max_arg_len {
                return Err(Error::TokenTooLong);
            }
            args.push(token.to_string());
        }

        Ok(TokenizedCommand {
            target: target.to_string(),
            action: action.to_string(),
            args,
        })
    }
}

/// ASCII case-insensitive comparison bounded by `max_len`, per spec.md
/// §4.5's routing rule.
fn ascii_ieq(a: &str, b: &str, max_len: usize) -> bool {
    let a = &a.as_bytes()[..a.len().min(max_len)];
    let b = &b.as_bytes()[..b.len().min(max_len)];
    a.eq_ignore_ascii_case(b)
}

fn poison_err<T>(_: std::sync::PoisonError<T>) -> Error {
    Error::SynchronizationFailure("dispatcher lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher_with_capacity(n: usize) -> Dispatcher {
        let mut config = crate::config::DispatcherConfig::new(" ").unwrap();
        config.max_slots = n;
        Dispatcher::new(&config).unwrap()
    }

    fn recording_handler(calls: Arc<Mutex<Vec<(Vec<String>, usize)>>>) -> Handler {
        Arc::new(move |args, _ctx| {
            let calls = calls.clone();
            let count = args.len();
            Box::pin(async move {
                calls.lock().unwrap().push((args, count));
                Ok("ok".to_string())
            })
        })
    }

    #[tokio::test]
    async fn register_and_execute_success() {
        let dispatcher = dispatcher_with_capacity(4);
        let calls = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register(
                0,
                Registration {
                    target: "gpio".into(),
                    action: "set".into(),
                    handler: recording_handler(calls.clone()),
                },
            )
            .unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        let result = dispatcher.execute("gpio set 13 1", ctx).await.unwrap();
        assert_eq!(result, "ok");

        let recorded = calls.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, vec!["13".to_string(), "1".to_string()]);
        assert_eq!(recorded[0].1, 2);
    }

    #[tokio::test]
    async fn case_insensitive_routing() {
        let dispatcher = dispatcher_with_capacity(4);
        let calls = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register(
                0,
                Registration {
                    target: "gpio".into(),
                    action: "set".into(),
                    handler: recording_handler(calls.clone()),
                },
            )
            .unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        dispatcher.execute("GPiO SeT 0 ok", ctx.clone()).await.unwrap();
        assert_eq!(
            calls.lock().unwrap()[0].0,
            vec!["0".to_string(), "ok".to_string()]
        );

        let err = dispatcher.execute("GPiO SeTs 0", ctx).await.unwrap_err();
        assert!(matches!(err, Error::CmdNotFound));
    }

    #[tokio::test]
    async fn buffer_bounds() {
        let mut config = crate::config::DispatcherConfig::new(" ").unwrap();
        config.max_target_len = 4;
        config.max_action_len = 4;
        config.max_arg_len = 4;
        config.max_args = 1;
        let dispatcher = Dispatcher::new(&config).unwrap();
        let max_len = dispatcher.max_buffer_len;

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        let too_long = "a".repeat(max_len);
        assert!(matches!(
            dispatcher.execute(&too_long, ctx.clone()).await,
            Err(Error::BufTooLong)
        ));
        assert!(matches!(
            dispatcher.execute("", ctx.clone()).await,
            Err(Error::BufEmpty)
        ));
        assert!(matches!(
            dispatcher.execute("   ", ctx).await,
            Err(Error::BufEmpty)
        ));
    }

    #[tokio::test]
    async fn target_token_boundary_is_exclusive_of_max_len() {
        let mut config = crate::config::DispatcherConfig::new(" ").unwrap();
        config.max_target_len = 4;
        let dispatcher = Dispatcher::new(&config).unwrap();
        let calls = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register(
                0,
                Registration {
                    target: "abc".into(), // max_target_len - 1, accepted at register time
                    action: "ping".into(),
                    handler: recording_handler(calls.clone()),
                },
            )
            .unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        // "abc" is max_target_len - 1: accepted and routed.
        dispatcher.execute("abc ping", ctx.clone()).await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);

        // "abcd" is exactly max_target_len: rejected, per spec.md §8's
        // "exactly maximum length is rejected" boundary.
        assert!(matches!(
            dispatcher.execute("abcd ping", ctx).await,
            Err(Error::TokenTooLong)
        ));
    }

    #[tokio::test]
    async fn register_deregister_register_round_trips() {
        let dispatcher = dispatcher_with_capacity(2);
        let calls = Arc::new(Mutex::new(Vec::new()));
        let registration = || Registration {
            target: "sys".into(),
            action: "ping".into(),
            handler: recording_handler(calls.clone()),
        };
        dispatcher.register(0, registration()).unwrap();
        dispatcher.deregister(0).unwrap();
        dispatcher.deregister(0).unwrap(); // no-op on an already-invalid slot
        dispatcher.register(0, registration()).unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        dispatcher.execute("sys ping", ctx).await.unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let dispatcher = dispatcher_with_capacity(2);
        let calls = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register(
                0,
                Registration {
                    target: "sys".into(),
                    action: "ping".into(),
                    handler: recording_handler(calls.clone()),
                },
            )
            .unwrap();
        let err = dispatcher
            .register(
                0,
                Registration {
                    target: "sys".into(),
                    action: "uptime".into(),
                    handler: recording_handler(calls),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::IdAlreadyTaken));
    }

    #[tokio::test]
    async fn first_registered_slot_wins_on_duplicate_definitions() {
        let dispatcher = dispatcher_with_capacity(2);
        let order = Arc::new(AtomicUsize::new(0));
        let first_seen = Arc::new(AtomicUsize::new(usize::MAX));

        let make = |order: Arc<AtomicUsize>, first_seen: Arc<AtomicUsize>, tag: usize| -> Handler {
            Arc::new(move |_args, _ctx| {
                let order = order.clone();
                let first_seen = first_seen.clone();
                Box::pin(async move {
                    let seq = order.fetch_add(1, Ordering::SeqCst);
                    if seq == 0 {
                        first_seen.store(tag, Ordering::SeqCst);
                    }
                    Ok("ok".to_string())
                })
            })
        };

        dispatcher
            .register(
                0,
                Registration {
                    target: "sys".into(),
                    action: "ping".into(),
                    handler: make(order.clone(), first_seen.clone(), 0),
                },
            )
            .unwrap();
        dispatcher
            .register(
                1,
                Registration {
                    target: "sys".into(),
                    action: "ping".into(),
                    handler: make(order, first_seen.clone(), 1),
                },
            )
            .unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        dispatcher.execute("sys ping", ctx).await.unwrap();
        assert_eq!(first_seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn extra_delimiter_runs_collapse_to_single_separators() {
        let dispatcher = dispatcher_with_capacity(2);
        let calls = Arc::new(Mutex::new(Vec::new()));
        dispatcher
            .register(
                0,
                Registration {
                    target: "gpio".into(),
                    action: "set".into(),
                    handler: recording_handler(calls.clone()),
                },
            )
            .unwrap();

        let ctx: Arc<dyn std::any::Any + Send + Sync> = Arc::new(());
        dispatcher.execute("gpio   set   13  1", ctx).await.unwrap();
        assert_eq!(
            calls.lock().unwrap()[0].0,
            vec!["13".to_string(), "1".to_string()]
        );
    }
}
