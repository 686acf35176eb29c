//! Turning package payloads into extension objects

use std::collections::BTreeMap;
use std::path::Path;

use crate::lifecycle::{Extension, ExtensionHost};
use crate::{Error, PackagePointer};

/// Extensions produced from one payload plus the per-candidate failures.
#[derive(Default)]
pub struct LoaderResult {
    pub extensions: Vec<Box<dyn Extension>>,
    pub failures: Vec<Error>,
}

impl LoaderResult {
    fn failed(error: Error) -> Self {
        Self {
            extensions: Vec::new(),
            failures: vec![error],
        }
    }
}

impl std::fmt::Debug for LoaderResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        f.debug_struct("LoaderResult")
            .field("extensions", &names)
            .field("failures", &self.failures)
            .finish()
    }
}

/// Locates the extensions inside a payload file.
pub trait ModuleLoader: Send {
    /// Every extension of `payload` that is meant for `host`.
    fn load(&self, payload: &Path, pointer: &PackagePointer, host: &dyn ExtensionHost)
    -> LoaderResult;
}

/// Builds one extension instance.
pub type ExtensionFactory =
    Box<dyn Fn(&PackagePointer) -> std::result::Result<Box<dyn Extension>, String> + Send>;

/// Module loader backed by an explicit table of payload file names.
///
/// Each payload file name maps to the factories of the extension types it
/// provides. The payload must exist on disk for its factories to run.
#[derive(Default)]
pub struct StaticModuleLoader {
    modules: BTreeMap<String, Vec<(String, ExtensionFactory)>>,
}

impl std::fmt::Debug for StaticModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let modules: BTreeMap<&str, Vec<&str>> = self
            .modules
            .iter()
            .map(|(file, types)| {
                (
                    file.as_str(),
                    types.iter().map(|(name, _)| name.as_str()).collect(),
                )
            })
            .collect();
        f.debug_struct("StaticModuleLoader")
            .field("modules", &modules)
            .finish()
    }
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension type provided by the payload `file_name`.
    pub fn register<F>(&mut self, file_name: impl Into<String>, type_name: impl Into<String>, factory: F)
    where
        F: Fn(&PackagePointer) -> std::result::Result<Box<dyn Extension>, String> + Send + 'static,
    {
        self.modules
            .entry(file_name.into())
            .or_default()
            .push((type_name.into(), Box::new(factory)));
    }

    pub fn is_registered(&self, file_name: &str) -> bool {
        self.modules.contains_key(file_name)
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load(
        &self,
        payload: &Path,
        pointer: &PackagePointer,
        host: &dyn ExtensionHost,
    ) -> LoaderResult {
        if !payload.is_file() {
            return LoaderResult::failed(Error::ModuleLoad {
                path: payload.to_path_buf(),
                reason: "payload file not found".to_string(),
            });
        }
        let Some(types) = payload
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.modules.get(name))
        else {
            return LoaderResult::failed(Error::ModuleLoad {
                path: payload.to_path_buf(),
                reason: "no module registered for this payload".to_string(),
            });
        };

        let mut result = LoaderResult::default();
        for (type_name, factory) in types {
            match factory(pointer) {
                Ok(extension) if extension.satisfies_host(host) => result.extensions.push(extension),
                Ok(extension) => {
                    tracing::debug!(
                        extension = extension.name(),
                        host = host.name(),
                        "Extension does not target host"
                    );
                }
                Err(reason) => result.failures.push(Error::TypeInstantiation {
                    type_name: type_name.clone(),
                    reason,
                }),
            }
        }
        result
    }
}
