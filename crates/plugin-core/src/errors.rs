//! Central funnel for recoverable errors
//!
//! Components never swallow errors on their own. They report them to the
//! shared [`ErrorChannel`], whose handler decides whether the error is
//! ignored (the operation reports "unchanged") or escalated to the caller.
//!
//! The channel's lock is released before the handler and listeners run, so
//! they may report to, or reconfigure, the same channel.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{Error, Result};

/// What to do with a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Log, notify listeners and carry on.
    Ignore,
    /// Return the error to the caller.
    Escalate,
}

type Handler = Arc<dyn Fn(&Error) -> ErrorAction + Send + Sync>;
type Listener = Arc<dyn Fn(&Error) + Send + Sync>;

#[derive(Default)]
struct Inner {
    handler: Option<Handler>,
    ignored_listeners: Vec<Listener>,
}

/// Shared error policy for one plugin system.
#[derive(Default)]
pub struct ErrorChannel {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ErrorChannel")
            .field("has_handler", &inner.handler.is_some())
            .field("ignored_listeners", &inner.ignored_listeners.len())
            .finish()
    }
}

impl ErrorChannel {
    /// A channel without handler; every report escalates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the decision handler.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&Error) -> ErrorAction + Send + Sync + 'static,
    {
        self.lock().handler = Some(Arc::new(handler));
    }

    pub fn clear_handler(&self) {
        self.lock().handler = None;
    }

    /// Subscribe to errors the handler chose to ignore.
    pub fn on_ignored<F>(&self, listener: F)
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.lock().ignored_listeners.push(Arc::new(listener));
    }

    /// Report an error. `Ok(())` means it was ignored.
    pub fn report(&self, err: Error) -> Result<()> {
        let handler = self.lock().handler.clone();
        let action = match handler {
            Some(handler) => handler(&err),
            None => ErrorAction::Escalate,
        };

        match action {
            ErrorAction::Ignore => {
                tracing::warn!(kind = err.kind(), error = %err, "Ignoring error");
                let listeners = self.lock().ignored_listeners.clone();
                for listener in listeners {
                    listener(&err);
                }
                Ok(())
            }
            ErrorAction::Escalate => {
                tracing::error!(kind = err.kind(), error = %err, "Escalating error");
                Err(err)
            }
        }
    }

    /// Report an error and map "ignored" to `fallback`.
    pub(crate) fn recover<T>(&self, err: Error, fallback: T) -> Result<T> {
        self.report(err).map(|()| fallback)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Error kinds that are ignored; anything else escalates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    kinds: BTreeSet<String>,
}

impl IgnoreList {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    /// Read one kind name per line; `#` starts a comment line.
    pub fn load(path: &Path) -> Result<Self> {
        let lines = plugin_fs::list::read_lines(path)?;
        Ok(Self::new(
            lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.starts_with('#'))
                .map(str::to_string),
        ))
    }

    pub fn ignores(&self, err: &Error) -> bool {
        !err.is_misuse() && self.kinds.contains(err.kind())
    }

    pub fn action(&self, err: &Error) -> ErrorAction {
        if self.ignores(err) {
            ErrorAction::Ignore
        } else {
            ErrorAction::Escalate
        }
    }

    /// Install this list as the handler of `channel`.
    pub fn install(self, channel: &ErrorChannel) {
        channel.set_handler(move |err| self.action(err));
    }
}
