//! Component handler registry.

use std::collections::HashMap;

use log::{error, info, warn};

use crate::core::error::Error;
use crate::handlers::component::ComponentKind;
use crate::handlers::LoadedComponent;

/// Button and select-menu handlers keyed by their stable custom id.
pub struct ComponentRegistry<D> {
    buttons: HashMap<String, LoadedComponent<D>>,
    select_menus: HashMap<String, LoadedComponent<D>>,
}

impl<D> Default for ComponentRegistry<D> {
    fn default() -> Self {
        ComponentRegistry {
            buttons: HashMap::new(),
            select_menus: HashMap::new(),
        }
    }
}

impl<D> ComponentRegistry<D> {
    pub fn new() -> Self {
        ComponentRegistry::default()
    }

    /// Clear and rebuild both kind-specific maps. A handler with an empty
    /// custom id is a configuration error: it is reported and skipped,
    /// siblings are unaffected.
    pub fn populate(&mut self, units: Vec<LoadedComponent<D>>) {
        self.buttons.clear();
        self.select_menus.clear();
        for unit in units {
            let Some(custom_id) = Self::checked_custom_id(&unit) else {
                continue;
            };
            let map = self.map_mut(unit.handler.kind());
            if map.insert(custom_id.clone(), unit).is_some() {
                warn!("duplicate custom id {custom_id:?}; keeping the later definition");
            }
        }
    }

    /// Hot-reload replacement: overwrite the entry unconditionally.
    /// Component identity is author-chosen and stable, so no debounce is
    /// needed here.
    pub fn apply_update(&mut self, unit: LoadedComponent<D>) {
        let Some(custom_id) = Self::checked_custom_id(&unit) else {
            return;
        };
        let kind = unit.handler.kind();
        self.map_mut(kind).insert(custom_id.clone(), unit);
        info!("{kind} handler {custom_id:?} reloaded");
    }

    pub fn resolve(&self, kind: ComponentKind, custom_id: &str) -> Option<&LoadedComponent<D>> {
        self.map(kind).get(custom_id)
    }

    pub fn len(&self) -> usize {
        self.buttons.len() + self.select_menus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty() && self.select_menus.is_empty()
    }

    /// Registered custom ids of one kind, for diagnostics.
    pub fn custom_ids(&self, kind: ComponentKind) -> Vec<&str> {
        self.map(kind).keys().map(String::as_str).collect()
    }

    fn map(&self, kind: ComponentKind) -> &HashMap<String, LoadedComponent<D>> {
        match kind {
            ComponentKind::Button => &self.buttons,
            ComponentKind::SelectMenu => &self.select_menus,
        }
    }

    fn map_mut(&mut self, kind: ComponentKind) -> &mut HashMap<String, LoadedComponent<D>> {
        match kind {
            ComponentKind::Button => &mut self.buttons,
            ComponentKind::SelectMenu => &mut self.select_menus,
        }
    }

    fn checked_custom_id(unit: &LoadedComponent<D>) -> Option<String> {
        let custom_id = unit.handler.custom_id();
        if custom_id.is_empty() {
            error!(
                "{}",
                Error::Configuration {
                    unit: format!("{} handler", unit.handler.kind()),
                    reason: "components must have a non-empty custom id".to_string(),
                }
            );
            return None;
        }
        Some(custom_id.to_string())
    }
}
