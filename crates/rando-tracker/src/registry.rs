//! Which uber states are mirrored to tracker clients, and how.
//!
//! [`TRACKED_STATES`] is the static definition list. A
//! [`TrackedStateRegistry`] indexes it once so the hot path
//! ([`TrackedStateRegistry::lookup`]) is a single hash lookup. Registries
//! are immutable; rebuilding produces a new one that replaces the old
//! one wholesale.

use std::collections::HashMap;

use rando_types::{StateId, TrackerUpdate};

/// Pure conversion from a raw uber state value to the tracked value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueConversion {
    /// Forward the raw value unchanged.
    #[default]
    Identity,
    /// Keep only the lowest bit (multi-bit flag → 0/1).
    LowBit,
}

impl ValueConversion {
    /// Apply the conversion.
    pub const fn apply(self, raw: i64) -> i64 {
        match self {
            Self::Identity => raw,
            Self::LowBit => raw & 0b1,
        }
    }
}

/// One tracked uber state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedStateDefinition {
    /// The uber state being tracked.
    pub id: StateId,
    /// Name tracker clients know the value by.
    pub tracking_id: &'static str,
    /// Conversion applied before the value leaves the hub.
    pub conversion: ValueConversion,
}

impl TrackedStateDefinition {
    /// A definition that forwards raw values unchanged.
    pub const fn new(group: u32, state: u32, tracking_id: &'static str) -> Self {
        Self {
            id: StateId::new(group, state),
            tracking_id,
            conversion: ValueConversion::Identity,
        }
    }

    /// A teleporter definition; only the activation bit is forwarded.
    pub const fn teleporter(group: u32, state: u32, tracking_id: &'static str) -> Self {
        Self {
            id: StateId::new(group, state),
            tracking_id,
            conversion: ValueConversion::LowBit,
        }
    }

    /// Build the update sent to clients for a raw value.
    ///
    /// Both the snapshot and the incremental path go through here.
    pub fn tracker_update(&self, raw: i64) -> TrackerUpdate {
        TrackerUpdate::new(self.tracking_id, self.conversion.apply(raw))
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Two definitions share a state id.
    #[error("uber state {0} is tracked more than once")]
    DuplicateState(StateId),

    /// Two definitions share a tracking id.
    #[error("tracking id {0:?} is used more than once")]
    DuplicateTrackingId(&'static str),
}

/// Immutable index over a list of tracked state definitions.
#[derive(Debug, Clone, Default)]
pub struct TrackedStateRegistry {
    definitions: Vec<TrackedStateDefinition>,
    by_state: HashMap<StateId, usize>,
    by_tracking_id: HashMap<&'static str, usize>,
}

impl TrackedStateRegistry {
    /// Index the given definitions, preserving their order.
    pub fn new(
        definitions: impl IntoIterator<Item = TrackedStateDefinition>,
    ) -> Result<Self, RegistryError> {
        let definitions: Vec<TrackedStateDefinition> = definitions.into_iter().collect();
        let mut by_state = HashMap::with_capacity(definitions.len());
        let mut by_tracking_id = HashMap::with_capacity(definitions.len());

        for (index, definition) in definitions.iter().enumerate() {
            if by_state.insert(definition.id, index).is_some() {
                return Err(RegistryError::DuplicateState(definition.id));
            }
            if by_tracking_id.insert(definition.tracking_id, index).is_some() {
                return Err(RegistryError::DuplicateTrackingId(definition.tracking_id));
            }
        }

        Ok(Self {
            definitions,
            by_state,
            by_tracking_id,
        })
    }

    /// Registry over [`TRACKED_STATES`].
    pub fn standard() -> Result<Self, RegistryError> {
        Self::new(TRACKED_STATES.iter().copied())
    }

    /// Find the definition tracking `id`.
    pub fn lookup(&self, id: StateId) -> Option<&TrackedStateDefinition> {
        self.by_state
            .get(&id)
            .and_then(|&index| self.definitions.get(index))
    }

    /// Find the definition with the given tracking id.
    pub fn find_by_tracking_id(&self, tracking_id: &str) -> Option<&TrackedStateDefinition> {
        self.by_tracking_id
            .get(tracking_id)
            .and_then(|&index| self.definitions.get(index))
    }

    /// All definitions, in declaration order.
    pub fn definitions(&self) -> &[TrackedStateDefinition] {
        &self.definitions
    }

    /// The state ids of all definitions, index-aligned with
    /// [`definitions`](Self::definitions).
    pub fn state_ids(&self) -> Vec<StateId> {
        self.definitions.iter().map(|d| d.id).collect()
    }

    /// Number of tracked states.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Every uber state mirrored to tracker clients.
pub const TRACKED_STATES: &[TrackedStateDefinition] = &[
    // Spirit tree abilities
    TrackedStateDefinition::new(0, 0, "tree_bash"),
    TrackedStateDefinition::new(0, 5, "tree_double_jump"),
    TrackedStateDefinition::new(0, 8, "tree_launch"),
    TrackedStateDefinition::new(0, 51, "tree_light_burst"),
    TrackedStateDefinition::new(0, 57, "tree_grapple"),
    TrackedStateDefinition::new(0, 62, "tree_flash"),
    TrackedStateDefinition::new(0, 77, "tree_regenerate"),
    TrackedStateDefinition::new(0, 97, "tree_bow"),
    TrackedStateDefinition::new(0, 100, "tree_sword"),
    TrackedStateDefinition::new(0, 101, "tree_burrow"),
    TrackedStateDefinition::new(0, 102, "tree_dash"),
    TrackedStateDefinition::new(0, 104, "tree_water_dash"),
    TrackedStateDefinition::new(0, 120, "tree_ancestral_light_glades"),
    TrackedStateDefinition::new(0, 121, "tree_ancestral_light_marsh"),
    // Teleporters
    TrackedStateDefinition::teleporter(24922, 42531, "tp_midnight_burrows"),
    TrackedStateDefinition::teleporter(21786, 10185, "tp_inkwater_marsh"),
    TrackedStateDefinition::teleporter(11666, 61594, "tp_howls_den"),
    TrackedStateDefinition::teleporter(945, 58183, "tp_luma_pools_east"),
    TrackedStateDefinition::teleporter(945, 1370, "tp_luma_pools_west"),
    TrackedStateDefinition::teleporter(53632, 18181, "tp_wellspring"),
    TrackedStateDefinition::teleporter(28895, 54235, "tp_baurs_reach"),
    TrackedStateDefinition::teleporter(6, 106, "tp_kwoloks_hollow"),
    TrackedStateDefinition::teleporter(18793, 38871, "tp_mouldwood_depths"),
    TrackedStateDefinition::teleporter(16155, 41465, "tp_willow_inner"),
    TrackedStateDefinition::teleporter(16155, 50867, "tp_willow_outer"),
    TrackedStateDefinition::teleporter(58674, 7071, "tp_silent_woods_west"),
    TrackedStateDefinition::teleporter(58674, 1965, "tp_silent_woods_east"),
    TrackedStateDefinition::teleporter(58674, 10029, "tp_windswept_wastes_west"),
    TrackedStateDefinition::teleporter(20120, 49994, "tp_windswept_wastes_east"),
    TrackedStateDefinition::teleporter(20120, 41398, "tp_windtorn_ruins_outer"),
    TrackedStateDefinition::teleporter(10289, 4928, "tp_windtorn_ruins_inner"),
    TrackedStateDefinition::teleporter(42178, 42096, "tp_wellspring_glades"),
    // Skills
    TrackedStateDefinition::new(6, 1000, "skill_bash"),
    TrackedStateDefinition::new(6, 1003, "skill_wall_jump"),
    TrackedStateDefinition::new(6, 1005, "skill_double_jump"),
    TrackedStateDefinition::new(6, 1008, "skill_launch"),
    TrackedStateDefinition::new(6, 1014, "skill_glide"),
    TrackedStateDefinition::new(6, 1023, "skill_water_breath"),
    TrackedStateDefinition::new(6, 1051, "skill_light_burst"),
    TrackedStateDefinition::new(6, 1057, "skill_grapple"),
    TrackedStateDefinition::new(6, 1062, "skill_flash"),
    TrackedStateDefinition::new(6, 1074, "skill_spike"),
    TrackedStateDefinition::new(6, 1077, "skill_regenerate"),
    TrackedStateDefinition::new(6, 1097, "skill_bow"),
    TrackedStateDefinition::new(6, 1098, "skill_hammer"),
    TrackedStateDefinition::new(6, 1099, "skill_torch"),
    TrackedStateDefinition::new(6, 1100, "skill_sword"),
    TrackedStateDefinition::new(6, 1101, "skill_burrow"),
    TrackedStateDefinition::new(6, 1102, "skill_dash"),
    TrackedStateDefinition::new(6, 1104, "skill_water_dash"),
    TrackedStateDefinition::new(6, 1106, "skill_shuriken"),
    TrackedStateDefinition::new(6, 1115, "skill_blaze"),
    TrackedStateDefinition::new(6, 1116, "skill_sentry"),
    TrackedStateDefinition::new(6, 1118, "skill_flap"),
    TrackedStateDefinition::new(6, 1120, "skill_ancestral_light_glades"),
    TrackedStateDefinition::new(6, 1121, "skill_ancestral_light_marsh"),
    TrackedStateDefinition::new(6, 2000, "skill_clean_water"),
    // Resources
    TrackedStateDefinition::new(15, 0, "resource_spirit_light"),
    TrackedStateDefinition::new(15, 1, "resource_gorlek_ore"),
    TrackedStateDefinition::new(15, 2, "resource_keystones"),
];
