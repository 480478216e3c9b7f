//! Handler unit loading.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! A handler unit is one YAML file naming a registered constructor plus
//! free-form parameters for it. Loading a directory walks it recursively,
//! instantiates one handler per unit, and contains every per-unit failure:
//! a broken unit is reported with its path and its siblings still load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use serde::Deserialize;
use walkdir::WalkDir;

use crate::core::error::Error;
use crate::handlers::factory::{FactoryContext, FactoryRegistry};
use crate::handlers::{
    Handler, HandlerVariant, Loaded, LoadedCommand, LoadedComponent, LoadedEvent,
};

/// Release unit extension, always loaded.
const UNIT_EXT: &str = "yaml";
/// Draft unit extension, loaded only in development mode.
const DRAFT_EXT: &str = "yml";

#[derive(Deserialize)]
struct UnitFile {
    constructor: String,
    #[serde(default)]
    params: serde_yaml::Value,
}

/// Instantiates handlers from unit definition files.
pub struct HandlerLoader<D> {
    factories: Arc<FactoryRegistry<D>>,
    data: Arc<D>,
    dev_units: bool,
}

impl<D> Clone for HandlerLoader<D> {
    fn clone(&self) -> Self {
        HandlerLoader {
            factories: Arc::clone(&self.factories),
            data: Arc::clone(&self.data),
            dev_units: self.dev_units,
        }
    }
}

impl<D> HandlerLoader<D> {
    pub fn new(factories: Arc<FactoryRegistry<D>>, data: Arc<D>, dev_units: bool) -> Self {
        HandlerLoader {
            factories,
            data,
            dev_units,
        }
    }

    /// Whether a path is a unit file under the current mode.
    pub fn is_unit_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(UNIT_EXT) => true,
            Some(DRAFT_EXT) => self.dev_units,
            _ => false,
        }
    }

    /// All unit files under `dir`, deterministically ordered.
    fn unit_files(&self, dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    error!("walking {}: {e}", dir.display());
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| self.is_unit_file(path))
            .collect()
    }

    /// Instantiate the handler a unit file describes.
    fn instantiate(&self, path: &Path) -> Result<Handler<D>, Error> {
        let raw = fs::read_to_string(path)
            .map_err(|e| config_err(path, format!("unreadable unit file: {e}")))?;
        let unit: UnitFile = serde_yaml::from_str(&raw)
            .map_err(|e| config_err(path, format!("invalid unit definition: {e}")))?;
        let factory = self
            .factories
            .get(&unit.constructor)
            .ok_or_else(|| config_err(path, format!("unknown constructor {:?}", unit.constructor)))?;
        let ctx = FactoryContext {
            data: &self.data,
            params: &unit.params,
            path,
        };
        factory
            .build(&ctx)
            .map_err(|e| config_err(path, format!("constructor {:?} failed: {e}", unit.constructor)))
    }

    fn load(&self, dir: &Path, variant: HandlerVariant) -> Vec<Handler<D>> {
        let mut handlers = Vec::new();
        for path in self.unit_files(dir) {
            match self.instantiate(&path) {
                Ok(handler) if handler.variant() == variant => handlers.push(handler),
                Ok(handler) => error!(
                    "{}",
                    config_err(
                        &path,
                        format!("expected a {variant} unit, found {}", handler.variant()),
                    )
                ),
                Err(e) => error!("{e}"),
            }
        }
        info!(
            "{} {variant} units loaded from {}",
            handlers.len(),
            dir.display()
        );
        handlers
    }

    pub fn load_commands(&self, dir: &Path) -> Vec<LoadedCommand<D>> {
        self.load(dir, HandlerVariant::Command)
            .into_iter()
            .filter_map(|handler| match handler {
                Handler::Command(command) => Some(Loaded::new(command)),
                _ => None,
            })
            .collect()
    }

    pub fn load_components(&self, dir: &Path) -> Vec<LoadedComponent<D>> {
        self.load(dir, HandlerVariant::Component)
            .into_iter()
            .filter_map(|handler| match handler {
                Handler::Component(component) => Some(Loaded::new(component)),
                _ => None,
            })
            .collect()
    }

    pub fn load_events(&self, dir: &Path) -> Vec<LoadedEvent<D>> {
        self.load(dir, HandlerVariant::Event)
            .into_iter()
            .filter_map(|handler| match handler {
                Handler::Event(event) => Some(Loaded::new(event)),
                _ => None,
            })
            .collect()
    }

    /// Single-unit path used by hot reload. Failures are reported and
    /// yield `None`.
    pub fn load_unit(&self, path: &Path, variant: HandlerVariant) -> Option<Handler<D>> {
        match self.instantiate(path) {
            Ok(handler) if handler.variant() == variant => Some(handler),
            Ok(handler) => {
                error!(
                    "{}",
                    config_err(
                        path,
                        format!("expected a {variant} unit, found {}", handler.variant()),
                    )
                );
                None
            }
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }

    /// Watch `dir` for unit changes, forwarding matching paths into the
    /// reload inbox. The returned watcher stops when dropped.
    #[cfg(feature = "watch")]
    pub fn watch(
        &self,
        dir: &Path,
        variant: HandlerVariant,
        tx: tokio::sync::mpsc::UnboundedSender<crate::reload::ReloadRequest>,
    ) -> anyhow::Result<notify::RecommendedWatcher>
    where
        D: Send + Sync + 'static,
    {
        use notify::{Event, EventKind, RecursiveMode, Watcher};

        use crate::reload::ReloadRequest;

        let loader = self.clone();
        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        error!("watch error: {e}");
                        return;
                    }
                };
                if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    if !loader.is_unit_file(&path) {
                        continue;
                    }
                    // The coordinator shutting down ends the watch too.
                    if tx.send(ReloadRequest { path, variant }).is_err() {
                        return;
                    }
                }
            })?;
        watcher.watch(dir, RecursiveMode::Recursive)?;
        info!("watching {} for {variant} unit changes", dir.display());
        Ok(watcher)
    }
}

fn config_err(path: &Path, reason: String) -> Error {
    Error::Configuration {
        unit: path.display().to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::event::{EventHandler, EventType, GatewayEvent};
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct MarkerEvent {
        label: String,
    }

    #[async_trait]
    impl EventHandler<()> for MarkerEvent {
        fn event_type(&self) -> EventType {
            EventType::Ready
        }

        async fn handle(&self, _data: &(), _event: &GatewayEvent) -> anyhow::Result<()> {
            let _ = &self.label;
            Ok(())
        }
    }

    fn factories() -> Arc<FactoryRegistry<()>> {
        let mut factories = FactoryRegistry::new();
        factories.register("marker", |ctx: &FactoryContext<'_, ()>| {
            let label = ctx
                .params
                .get("label")
                .and_then(serde_yaml::Value::as_str)
                .unwrap_or("unnamed")
                .to_string();
            Ok(Handler::Event(Arc::new(MarkerEvent { label })))
        });
        factories.register("broken", |_ctx: &FactoryContext<'_, ()>| {
            anyhow::bail!("constructor refused")
        });
        Arc::new(factories)
    }

    fn write_unit(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    fn loader(dev_units: bool) -> (HandlerLoader<()>, TempDir) {
        let dir = TempDir::new().unwrap();
        (
            HandlerLoader::new(factories(), Arc::new(()), dev_units),
            dir,
        )
    }

    #[test]
    fn test_loads_units_recursively() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "a.yaml", "constructor: marker\n");
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write_unit(&nested, "b.yaml", "constructor: marker\nparams:\n  label: b\n");

        let events = loader.load_events(dir.path());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_draft_units_only_load_in_dev_mode() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "a.yaml", "constructor: marker\n");
        write_unit(dir.path(), "b.yml", "constructor: marker\n");

        assert_eq!(loader.load_events(dir.path()).len(), 1);

        let dev_loader = HandlerLoader::new(factories(), Arc::new(()), true);
        assert_eq!(dev_loader.load_events(dir.path()).len(), 2);
    }

    #[test]
    fn test_broken_unit_does_not_abort_siblings() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "a.yaml", "constructor: broken\n");
        write_unit(dir.path(), "b.yaml", "constructor: marker\n");
        write_unit(dir.path(), "c.yaml", "constructor: does_not_exist\n");
        write_unit(dir.path(), "d.yaml", "not: [valid: unit");

        let events = loader.load_events(dir.path());
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_variant_mismatch_is_rejected() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "a.yaml", "constructor: marker\n");

        assert!(loader.load_commands(dir.path()).is_empty());
        assert_eq!(loader.load_events(dir.path()).len(), 1);
    }

    #[test]
    fn test_load_unit_single_path() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "a.yaml", "constructor: marker\n");

        let path = dir.path().join("a.yaml");
        assert!(loader.load_unit(&path, HandlerVariant::Event).is_some());
        assert!(loader.load_unit(&path, HandlerVariant::Command).is_none());
    }

    #[test]
    fn test_non_unit_files_are_ignored() {
        let (loader, dir) = loader(false);
        write_unit(dir.path(), "readme.md", "not a unit");
        write_unit(dir.path(), "a.yaml", "constructor: marker\n");

        assert_eq!(loader.load_events(dir.path()).len(), 1);
    }
}
