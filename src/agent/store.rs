use super::Agent;
use crate::clock::{ClockSource, Timestamp};
use crate::world::{AgentId, Position};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Errors from admitting an agent into the store
#[derive(Debug, Clone, PartialEq)]
pub enum AdmitError {
    CapacityExceeded { agent_id: AgentId, capacity: usize },
}

impl fmt::Display for AdmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmitError::CapacityExceeded { agent_id, capacity } => write!(
                f,
                "agent {} rejected: agent capacity of {} reached",
                agent_id, capacity
            ),
        }
    }
}

impl std::error::Error for AdmitError {}

/// Bounded set of agent records keyed by id.
///
/// Agents are created on first sight and kept until the store is cleared.
#[derive(Debug)]
pub struct AgentStore {
    agents: BTreeMap<AgentId, Agent>,
    capacity: usize,
}

impl AgentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            agents: BTreeMap::new(),
            capacity,
        }
    }

    /// Get the agent for `agent_id`, creating it if there is room.
    ///
    /// The clock of a new agent is fixed here: reported when the first
    /// observation carries a time, wall otherwise.
    pub fn admit(
        &mut self,
        agent_id: AgentId,
        position: Position,
        reported_time: Option<f64>,
        wall_now: Timestamp,
    ) -> Result<&mut Agent, AdmitError> {
        let len = self.agents.len();
        match self.agents.entry(agent_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                if len >= self.capacity {
                    warn!(agent_id = %agent_id, capacity = self.capacity, "Agent capacity reached");
                    return Err(AdmitError::CapacityExceeded {
                        agent_id,
                        capacity: self.capacity,
                    });
                }

                let (clock, now) = match reported_time {
                    Some(t) => (ClockSource::Reported, Timestamp::from_secs(t)),
                    None => (ClockSource::Wall, wall_now),
                };
                info!(agent_id = %agent_id, clock = ?clock, "Agent registered");
                Ok(entry.insert(Agent::new(agent_id, position, clock, now)))
            }
        }
    }

    pub fn get(&self, agent_id: AgentId) -> Option<&Agent> {
        self.agents.get(&agent_id)
    }

    pub fn get_mut(&mut self, agent_id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&agent_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.agents.clear();
    }
}
