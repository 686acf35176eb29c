//! Attaching extensions to hosts
//!
//! The manager owns the in-memory host table: for every registered host, the
//! extensions attached to it in attach order, each bound to the pointer of
//! the package it came from.

use std::path::PathBuf;
use std::sync::Arc;

use plugin_fs::PluginPaths;

use crate::events::{ExtensionEvent, HostEvent, Hooks};
use crate::{ErrorChannel, PackagePointer, Result};

/// A host that extensions attach to.
///
/// Hosts are shared with the application, so callbacks take `&self`; use
/// interior mutability to track state.
pub trait ExtensionHost: Send + Sync {
    /// Identity of the host within a plugin system.
    fn name(&self) -> &str;

    /// Capability tags used by [`ExtensionLifecycleManager::hosts_with`].
    fn capabilities(&self) -> &[&str] {
        &[]
    }

    /// Whether `extension` may attach. A `false` is a silent rejection.
    fn is_allowed(&self, _extension: &dyn Extension) -> bool {
        true
    }

    fn on_extension_load(&self, _extension: &dyn Extension, _pointer: &PackagePointer) {}

    fn on_extension_unload(&self, _extension: &dyn Extension) {}
}

/// An extension object produced by a module loader.
pub trait Extension: Send {
    /// Identity of the extension within its host.
    fn name(&self) -> &str;

    /// Capability tags used by the extension queries.
    fn capabilities(&self) -> &[&str] {
        &[]
    }

    /// Whether package directories must exist before [`Extension::on_load`].
    fn needs_storage(&self) -> bool {
        false
    }

    /// Whether the extension is meant for `host`. Loaders drop extensions
    /// that answer `false`.
    fn satisfies_host(&self, _host: &dyn ExtensionHost) -> bool {
        true
    }

    fn on_load(&mut self, _context: &AttachContext) {}

    fn on_unload(&mut self) {}

    /// Annotations dispatched to the [`MarkerRegistry`] after loading.
    fn markers(&self) -> Vec<Marker> {
        Vec::new()
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Everything an extension learns when it is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachContext {
    pub host: String,
    pub pointer: PackagePointer,
    pub config_dir: PathBuf,
    pub payload_dir: PathBuf,
}

/// A tag placed on one member of an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub member: String,
    pub tag: String,
}

impl Marker {
    pub fn new(member: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            member: member.into(),
            tag: tag.into(),
        }
    }
}

/// What a marker handler sees.
pub struct MarkerContext<'a> {
    pub host: &'a str,
    pub extension: &'a dyn Extension,
    pub pointer: &'a PackagePointer,
    pub marker: &'a Marker,
}

/// Reacts to one marker tag.
pub trait MarkerHandler: Send {
    fn name(&self) -> &str;

    fn tag(&self) -> &str;

    fn handle(&mut self, context: &MarkerContext<'_>);
}

/// Handlers keyed by the tag they react to.
#[derive(Default)]
pub struct MarkerRegistry {
    handlers: Vec<Box<dyn MarkerHandler>>,
}

impl std::fmt::Debug for MarkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.handlers.iter().map(|h| h.name()).collect();
        f.debug_struct("MarkerRegistry").field("handlers", &names).finish()
    }
}

impl MarkerRegistry {
    /// Add a handler unless one with the same name exists.
    pub fn add(&mut self, handler: Box<dyn MarkerHandler>) -> bool {
        if self.handlers.iter().any(|h| h.name() == handler.name()) {
            return false;
        }
        tracing::debug!(handler = handler.name(), tag = handler.tag(), "Added marker handler");
        self.handlers.push(handler);
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| h.name() != name);
        self.handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Hand every marker of `extension` to the handlers of its tag.
    pub fn dispatch(&mut self, host: &str, extension: &dyn Extension, pointer: &PackagePointer) {
        for marker in extension.markers() {
            let context = MarkerContext {
                host,
                extension,
                pointer,
                marker: &marker,
            };
            for handler in self.handlers.iter_mut().filter(|h| h.tag() == marker.tag) {
                handler.handle(&context);
            }
        }
    }
}

/// An attached extension and the pointer it was loaded from.
pub struct HostBinding {
    extension: Box<dyn Extension>,
    pointer: PackagePointer,
}

impl HostBinding {
    pub fn extension(&self) -> &dyn Extension {
        self.extension.as_ref()
    }

    pub fn pointer(&self) -> &PackagePointer {
        &self.pointer
    }
}

impl std::fmt::Debug for HostBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBinding")
            .field("extension", &self.extension.name())
            .field("pointer", &self.pointer)
            .finish()
    }
}

struct HostEntry {
    host: Arc<dyn ExtensionHost>,
    bindings: Vec<HostBinding>,
}

/// Attaches and detaches extensions, firing the lifecycle hooks.
pub struct ExtensionLifecycleManager {
    hosts: Vec<HostEntry>,
    markers: MarkerRegistry,
    channel: Arc<ErrorChannel>,
}

impl std::fmt::Debug for ExtensionLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionLifecycleManager")
            .field("hosts", &self.host_names())
            .field("markers", &self.markers)
            .finish()
    }
}

impl ExtensionLifecycleManager {
    pub fn new(channel: Arc<ErrorChannel>) -> Self {
        Self {
            hosts: Vec::new(),
            markers: MarkerRegistry::default(),
            channel,
        }
    }

    pub fn markers_mut(&mut self) -> &mut MarkerRegistry {
        &mut self.markers
    }

    fn entry(&self, host: &str) -> Option<&HostEntry> {
        self.hosts.iter().find(|e| e.host.name() == host)
    }

    fn entry_mut(&mut self, host: &str) -> Option<&mut HostEntry> {
        self.hosts.iter_mut().find(|e| e.host.name() == host)
    }

    pub fn is_registered(&self, host: &str) -> bool {
        self.entry(host).is_some()
    }

    /// Add `host` to the table. Returns whether the host is registered
    /// afterwards; `false` means a handler vetoed the registration.
    pub fn register_host(&mut self, hooks: &mut Hooks, host: Arc<dyn ExtensionHost>) -> bool {
        if self.is_registered(host.name()) {
            return true;
        }

        let event = HostEvent {
            host: host.name().to_string(),
        };
        if !hooks.before_register_host.fire(&event) {
            tracing::debug!(host = %event.host, "Host registration cancelled");
            return false;
        }

        tracing::info!(host = %event.host, "Registered host");
        self.hosts.push(HostEntry {
            host,
            bindings: Vec::new(),
        });
        true
    }

    /// Detach every extension of `host` in reverse attach order and drop
    /// the host.
    pub fn unregister_host(&mut self, hooks: &mut Hooks, host: &str) -> bool {
        let Some(entry) = self.entry(host) else {
            return false;
        };

        let event = HostEvent {
            host: host.to_string(),
        };
        if !hooks.before_unregister_host.fire(&event) {
            tracing::debug!(host, "Host unregistration cancelled");
            return false;
        }

        let names: Vec<String> = entry
            .bindings
            .iter()
            .rev()
            .map(|b| b.extension.name().to_string())
            .collect();
        let count = names.len();
        for name in names {
            self.detach(hooks, host, &name);
        }

        self.hosts.retain(|e| e.host.name() != host);
        tracing::info!(host, extensions = count, "Unregistered host");
        hooks.after_unregister_host.fire(&event);
        true
    }

    /// Attach `extension` to the registered host `host`.
    ///
    /// Returns `Ok(false)` when the host is unknown, an extension of the
    /// same name is already attached, the host rejects the extension or a
    /// handler vetoes the attach.
    pub fn attach(
        &mut self,
        hooks: &mut Hooks,
        paths: &PluginPaths,
        host: &str,
        extension: Box<dyn Extension>,
        pointer: PackagePointer,
    ) -> Result<bool> {
        let Some(entry) = self.entry(host) else {
            return Ok(false);
        };
        if entry
            .bindings
            .iter()
            .any(|b| b.extension.name() == extension.name())
        {
            return Ok(false);
        }
        let host_ref = Arc::clone(&entry.host);
        if !host_ref.is_allowed(extension.as_ref()) {
            tracing::debug!(host, extension = extension.name(), "Host rejected extension");
            return Ok(false);
        }

        let event = ExtensionEvent {
            host: host.to_string(),
            extension: extension.name().to_string(),
            pointer: pointer.clone(),
        };
        if !hooks.before_attach.fire(&event) {
            tracing::debug!(host, extension = %event.extension, "Attach cancelled");
            return Ok(false);
        }

        if extension.needs_storage() {
            if let Err(err) = paths.ensure_package_dirs(pointer.name()) {
                return self.channel.recover(err.into(), false);
            }
        }

        let context = AttachContext {
            host: host.to_string(),
            pointer: pointer.clone(),
            config_dir: paths.package_config_dir(pointer.name()),
            payload_dir: paths.package_bin_dir(pointer.name()),
        };
        tracing::info!(host, extension = %event.extension, package = %pointer, "Attaching extension");
        let Some(entry) = self.hosts.iter_mut().find(|e| e.host.name() == host) else {
            return Ok(false);
        };
        entry.bindings.push(HostBinding { extension, pointer });
        let Some(binding) = entry.bindings.last_mut() else {
            return Ok(false);
        };
        binding.extension.on_load(&context);
        host_ref.on_extension_load(binding.extension.as_ref(), &binding.pointer);
        self.markers
            .dispatch(host, binding.extension.as_ref(), &binding.pointer);

        hooks.after_attach.fire(&event);
        Ok(true)
    }

    /// Detach the extension named `extension` from `host`.
    pub fn detach(&mut self, hooks: &mut Hooks, host: &str, extension: &str) -> bool {
        let Some(entry) = self.entry_mut(host) else {
            return false;
        };
        let Some(index) = entry
            .bindings
            .iter()
            .position(|b| b.extension.name() == extension)
        else {
            return false;
        };

        let event = ExtensionEvent {
            host: host.to_string(),
            extension: extension.to_string(),
            pointer: entry.bindings[index].pointer.clone(),
        };
        if !hooks.before_detach.fire(&event) {
            tracing::debug!(host, extension, "Detach cancelled");
            return false;
        }

        tracing::info!(host, extension, "Detaching extension");
        let binding = &mut entry.bindings[index];
        binding.extension.on_unload();
        entry.host.on_extension_unload(binding.extension.as_ref());
        entry.bindings.remove(index);
        hooks.after_detach.fire(&event);
        true
    }

    pub fn host(&self, host: &str) -> Option<Arc<dyn ExtensionHost>> {
        self.entry(host).map(|e| Arc::clone(&e.host))
    }

    /// Registered host names in registration order.
    pub fn host_names(&self) -> Vec<String> {
        self.hosts.iter().map(|e| e.host.name().to_string()).collect()
    }

    pub fn hosts_with(&self, capability: &str) -> Vec<Arc<dyn ExtensionHost>> {
        self.hosts
            .iter()
            .filter(|e| e.host.capabilities().contains(&capability))
            .map(|e| Arc::clone(&e.host))
            .collect()
    }

    /// Extensions of every host that carry `capability`.
    pub fn extensions_with(&self, capability: &str) -> Vec<&dyn Extension> {
        self.hosts
            .iter()
            .flat_map(|e| e.bindings.iter())
            .map(HostBinding::extension)
            .filter(|ext| ext.has_capability(capability))
            .collect()
    }

    /// Extensions of `host` that carry `capability`, in attach order.
    pub fn host_extensions_with(&self, host: &str, capability: &str) -> Vec<&dyn Extension> {
        self.extensions(host)
            .into_iter()
            .filter(|ext| ext.has_capability(capability))
            .collect()
    }

    /// Every extension of `host` in attach order.
    pub fn extensions(&self, host: &str) -> Vec<&dyn Extension> {
        self.entry(host)
            .map(|e| e.bindings.iter().map(HostBinding::extension).collect())
            .unwrap_or_default()
    }

    pub fn binding(&self, host: &str, extension: &str) -> Option<&HostBinding> {
        self.entry(host)?
            .bindings
            .iter()
            .find(|b| b.extension.name() == extension)
    }

    pub fn is_attached(&self, host: &str, extension: &str) -> bool {
        self.binding(host, extension).is_some()
    }
}
