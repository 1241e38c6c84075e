use serde::{Deserialize, Serialize};
use std::collections::HashSet;

mod validation;

pub use validation::{parse_snapshot, RejectedEntry, ValidationError};

/// Externally assigned agent identifier
pub type AgentId = u64;

/// Externally assigned cube identifier
pub type ObjectId = u64;

/// Point in the shared workspace (client world units)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A cube the client currently reports as free to pick up
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AvailableObject {
    #[serde(rename = "objectId")]
    pub id: ObjectId,
    pub position: Position,
}

/// Fixed drop-off region. Held cubes are deposited once the agent is within
/// `arrival_radius` of `position`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DeliveryZone {
    pub position: Position,
    #[serde(rename = "arrivalRadius")]
    pub arrival_radius: f64,
}

impl DeliveryZone {
    pub fn distance_from(&self, position: &Position) -> f64 {
        self.position.distance_to(position)
    }

    /// True when `position` is close enough to release a cube
    pub fn within_reach(&self, position: &Position) -> bool {
        self.distance_from(position) <= self.arrival_radius
    }
}

/// One agent's validated entry in a snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct AgentObservation {
    pub agent_id: AgentId,
    pub position: Position,
    pub holding: bool,

    /// Client clock in seconds, when the client reports one
    pub time: Option<f64>,

    /// Per-agent view of free cubes; overrides the snapshot-level list
    pub available: Option<Vec<AvailableObject>>,
}

/// A single request's picture of the world.
///
/// Entries keep their request order. Entries that failed validation stay in
/// place as `Err` so the response lines up with the request.
#[derive(Clone, Debug, Default)]
pub struct WorldSnapshot {
    pub entries: Vec<Result<AgentObservation, RejectedEntry>>,
    pub available: Vec<AvailableObject>,
}

impl WorldSnapshot {
    /// Cubes visible to the agent behind `observation`
    pub fn available_for<'a>(&'a self, observation: &'a AgentObservation) -> &'a [AvailableObject] {
        observation.available.as_deref().unwrap_or(&self.available)
    }

    /// Union of every object id reported as available anywhere in the snapshot
    pub fn present_object_ids(&self) -> HashSet<ObjectId> {
        let mut ids: HashSet<ObjectId> = self.available.iter().map(|o| o.id).collect();
        for observation in self.entries.iter().flatten() {
            if let Some(list) = &observation.available {
                ids.extend(list.iter().map(|o| o.id));
            }
        }
        ids
    }

    /// Ids of the agents with a valid entry, in request order
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.entries
            .iter()
            .flatten()
            .map(|o| o.agent_id)
            .collect()
    }
}
