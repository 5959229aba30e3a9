//! Zone-level state and the fleet-wide multi-zone view.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::instance::ServicesState;

/// Where a zone sits relative to the control plane running this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locality {
    Local,
    Remote,
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locality::Local => write!(f, "local"),
            Locality::Remote => write!(f, "remote"),
        }
    }
}

/// Full service map of one zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneState {
    pub services_state: ServicesState,
    pub locality: Locality,
    pub zone: String,
}

impl ZoneState {
    pub fn new(services_state: ServicesState, locality: Locality, zone: impl Into<String>) -> Self {
        Self { services_state, locality, zone: zone.into() }
    }

    pub fn local(services_state: ServicesState, zone: impl Into<String>) -> Self {
        Self::new(services_state, Locality::Local, zone)
    }

    pub fn remote(services_state: ServicesState, zone: impl Into<String>) -> Self {
        Self::new(services_state, Locality::Remote, zone)
    }
}

/// Ordered collection of zone states, one per known zone.
///
/// Values are rebuilt on every aggregation step and never mutated after being
/// published; equality is structural so unchanged snapshots can be skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiZoneState(Vec<ZoneState>);

impl MultiZoneState {
    pub fn new(zones: Vec<ZoneState>) -> Self {
        Self(zones)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ZoneState> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn zone(&self, zone: &str) -> Option<&ZoneState> {
        self.0.iter().find(|z| z.zone == zone)
    }

    pub fn zone_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|z| z.zone.as_str())
    }

    /// Flatten several snapshots in order into one.
    ///
    /// Zone ids stay unique: a zone already present keeps its first state.
    pub fn concat<'a>(parts: impl IntoIterator<Item = &'a MultiZoneState>) -> Self {
        let mut zones: Vec<ZoneState> = Vec::new();
        for zone in parts.into_iter().flat_map(MultiZoneState::iter) {
            if zones.iter().any(|z| z.zone == zone.zone) {
                continue;
            }
            zones.push(zone.clone());
        }
        Self(zones)
    }

    pub fn into_inner(self) -> Vec<ZoneState> {
        self.0
    }
}

impl From<ZoneState> for MultiZoneState {
    fn from(state: ZoneState) -> Self {
        Self(vec![state])
    }
}

impl From<Vec<ZoneState>> for MultiZoneState {
    fn from(zones: Vec<ZoneState>) -> Self {
        Self(zones)
    }
}

impl<'a> IntoIterator for &'a MultiZoneState {
    type Item = &'a ZoneState;
    type IntoIter = std::slice::Iter<'a, ZoneState>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
