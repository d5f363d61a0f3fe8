// The campaign: every zone of the session plus campaign-wide settings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::Guid;
use crate::zone::Zone;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignProperties {
    pub token_states: BTreeSet<String>,
    pub lookup_tables: BTreeMap<String, Vec<String>>,
    pub initiative_owner_permissions: bool,
    pub initiative_movement_lock: bool,
    pub initiative_panel_buttons_disabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroButton {
    pub index: u32,
    pub label: String,
    pub command: String,
    pub group: Option<String>,
    pub auto_execute: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Guid,
    pub name: String,
    pub properties: CampaignProperties,
    pub macros: Vec<MacroButton>,
    pub gm_macros: Vec<MacroButton>,
    zones: BTreeMap<Guid, Zone>,
}

impl Default for Campaign {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Campaign {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Guid::new(),
            name: name.into(),
            properties: CampaignProperties::default(),
            macros: Vec::new(),
            gm_macros: Vec::new(),
            zones: BTreeMap::new(),
        }
    }

    pub fn zone(&self, id: Guid) -> Option<&Zone> {
        self.zones.get(&id)
    }

    pub fn zone_mut(&mut self, id: Guid) -> Option<&mut Zone> {
        self.zones.get_mut(&id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn zone_ids(&self) -> Vec<Guid> {
        self.zones.keys().copied().collect()
    }

    /// Insert or replace a zone. Returns the previous version, if any.
    pub fn put_zone(&mut self, zone: Zone) -> Option<Zone> {
        self.zones.insert(zone.id, zone)
    }

    pub fn remove_zone(&mut self, id: Guid) -> Option<Zone> {
        self.zones.remove(&id)
    }
}
