//! Lifecycle hooks
//!
//! Every state transition fires a "before" event that handlers may veto and
//! an "after" notification once the transition is applied. Handlers run
//! synchronously in subscription order. All handlers of a before-event run;
//! a single [`Decision::Cancel`] vetoes the step and suppresses the matching
//! after-notification.

use std::fmt;
use std::path::PathBuf;

use crate::PackagePointer;

/// A before-handler's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Decision {
    #[default]
    Proceed,
    Cancel,
}

type Handler<E> = Box<dyn FnMut(&E) -> Decision + Send>;
type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Vetoable event.
pub struct CancelableEvent<E> {
    handlers: Vec<Handler<E>>,
}

impl<E> Default for CancelableEvent<E> {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for CancelableEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelableEvent")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl<E> CancelableEvent<E> {
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&E) -> Decision + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Run every handler. Returns `true` when no handler cancelled.
    pub fn fire(&mut self, event: &E) -> bool {
        let mut decision = Decision::Proceed;
        for handler in self.handlers.iter_mut() {
            if handler(event) == Decision::Cancel {
                decision = Decision::Cancel;
            }
        }
        decision == Decision::Proceed
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Plain notification.
pub struct Notification<E> {
    listeners: Vec<Listener<E>>,
}

impl<E> Default for Notification<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for Notification<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E> Notification<E> {
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&E) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn fire(&mut self, event: &E) {
        for listener in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// A host entering or leaving the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub host: String,
}

/// An extension attaching to or detaching from a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEvent {
    pub host: String,
    pub extension: String,
    pub pointer: PackagePointer,
}

/// A package state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEvent {
    pub pointer: PackagePointer,
}

/// Start of an install from `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPackageEvent {
    pub source: PathBuf,
}

/// Copying an unpacked package into place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallEvent {
    /// Whether the package was not in the global list before this install.
    pub is_new: bool,
    pub pointer: PackagePointer,
    pub unpacked_dir: PathBuf,
}

/// Removal of a package from the global list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovePackageEvent {
    pub pointer: PackagePointer,
    /// Keep the package files on disk.
    pub keep_archive: bool,
}

/// Deletion of the system temp directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTempEvent {
    pub dir: PathBuf,
}

/// Every lifecycle event of a plugin system.
#[derive(Debug, Default)]
pub struct Hooks {
    pub before_register_host: CancelableEvent<HostEvent>,
    pub after_register_host: Notification<HostEvent>,
    pub before_unregister_host: CancelableEvent<HostEvent>,
    pub after_unregister_host: Notification<HostEvent>,

    pub before_attach: CancelableEvent<ExtensionEvent>,
    pub after_attach: Notification<ExtensionEvent>,
    pub before_detach: CancelableEvent<ExtensionEvent>,
    pub after_detach: Notification<ExtensionEvent>,

    pub before_add_package: CancelableEvent<AddPackageEvent>,
    pub pointer_loaded: CancelableEvent<PackageEvent>,
    pub before_install: CancelableEvent<InstallEvent>,
    pub after_install: Notification<InstallEvent>,
    pub after_add_package: Notification<PackageEvent>,

    pub before_remove_package: CancelableEvent<RemovePackageEvent>,
    pub after_remove_package: Notification<RemovePackageEvent>,

    pub before_activate: CancelableEvent<PackageEvent>,
    pub after_activate: Notification<PackageEvent>,
    pub before_deactivate: CancelableEvent<PackageEvent>,
    pub after_deactivate: Notification<PackageEvent>,

    pub before_clean_temp: CancelableEvent<CleanTempEvent>,
    pub after_clean_temp: Notification<CleanTempEvent>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_handler_runs_even_after_cancel() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut event = CancelableEvent::<HostEvent>::default();

        let log = Arc::clone(&calls);
        event.subscribe(move |_| {
            log.lock().unwrap().push("first");
            Decision::Cancel
        });
        let log = Arc::clone(&calls);
        event.subscribe(move |_| {
            log.lock().unwrap().push("second");
            Decision::Proceed
        });

        assert!(!event.fire(&HostEvent { host: "h".into() }));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn empty_event_proceeds() {
        let mut event = CancelableEvent::<HostEvent>::default();
        assert!(event.is_empty());
        assert!(event.fire(&HostEvent { host: "h".into() }));
    }

    #[test]
    fn notifications_run_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut notification = Notification::<CleanTempEvent>::default();
        for tag in ["a", "b"] {
            let log = Arc::clone(&calls);
            notification.subscribe(move |_| log.lock().unwrap().push(tag));
        }

        notification.fire(&CleanTempEvent { dir: "tmp".into() });
        assert_eq!(notification.len(), 2);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }
}
