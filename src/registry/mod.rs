// Claim table over cube ids
//
// The client owns the cubes themselves; the registry only remembers which
// agent has been promised which cube id. An id with no entry is free.

use crate::world::{AgentId, ObjectId};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;


/// Exclusive assignment of one cube to one agent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub owner: AgentId,

    /// The owner has picked the cube up; it no longer appears in the
    /// client's available list until it is dropped again
    pub held: bool,
}

/// Result of a claim attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// New claim recorded
    Claimed,
    /// The caller already owned the claim; nothing changed
    Reaffirmed,
    /// Another agent owns the claim; nothing changed
    AlreadyClaimed(AgentId),
}

impl ClaimOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, ClaimOutcome::AlreadyClaimed(_))
    }
}

/// Authoritative claim table, ordered by object id
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    claims: BTreeMap<ObjectId, Claim>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// An object is available iff nobody claims or holds it
    pub fn is_available(&self, object_id: ObjectId) -> bool {
        !self.claims.contains_key(&object_id)
    }

    /// Available to `agent_id` specifically: free, or already its own
    pub fn is_available_to(&self, object_id: ObjectId, agent_id: AgentId) -> bool {
        match self.claims.get(&object_id) {
            None => true,
            Some(claim) => claim.owner == agent_id,
        }
    }

    pub fn owner_of(&self, object_id: ObjectId) -> Option<AgentId> {
        self.claims.get(&object_id).map(|c| c.owner)
    }

    pub fn get(&self, object_id: ObjectId) -> Option<Claim> {
        self.claims.get(&object_id).copied()
    }

    pub fn claim(&mut self, agent_id: AgentId, object_id: ObjectId) -> ClaimOutcome {
        match self.claims.get(&object_id) {
            Some(claim) if claim.owner == agent_id => ClaimOutcome::Reaffirmed,
            Some(claim) => ClaimOutcome::AlreadyClaimed(claim.owner),
            None => {
                self.claims.insert(
                    object_id,
                    Claim {
                        owner: agent_id,
                        held: false,
                    },
                );
                debug!(agent_id = %agent_id, object_id = %object_id, "Claim recorded");
                ClaimOutcome::Claimed
            }
        }
    }

    /// Drop any claim on `object_id`. Releasing a free object is a no-op.
    pub fn release(&mut self, object_id: ObjectId) -> Option<Claim> {
        let released = self.claims.remove(&object_id);
        if let Some(claim) = released {
            debug!(agent_id = %claim.owner, object_id = %object_id, "Claim released");
        }
        released
    }

    /// Release `object_id` only if `agent_id` owns it
    pub fn release_if_owner(&mut self, agent_id: AgentId, object_id: ObjectId) -> bool {
        if self.owner_of(object_id) == Some(agent_id) {
            self.release(object_id);
            true
        } else {
            false
        }
    }

    /// Flag an owned claim as picked up or put down.
    ///
    /// Returns false when `agent_id` does not own the claim.
    pub fn set_held(&mut self, agent_id: AgentId, object_id: ObjectId, held: bool) -> bool {
        match self.claims.get_mut(&object_id) {
            Some(claim) if claim.owner == agent_id => {
                claim.held = held;
                true
            }
            _ => false,
        }
    }

    /// Release every claim owned by `agent_id`, returning the freed ids
    pub fn release_owned_by(&mut self, agent_id: AgentId) -> Vec<ObjectId> {
        let owned = self.claimed_by(agent_id);
        for object_id in &owned {
            self.release(*object_id);
        }
        owned
    }

    pub fn claimed_by(&self, agent_id: AgentId) -> Vec<ObjectId> {
        self.claims
            .iter()
            .filter(|(_, claim)| claim.owner == agent_id)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Release claims on cubes the client no longer reports.
    ///
    /// Held claims are kept: a carried cube is absent from the available
    /// list until it is delivered.
    pub fn retain_present(&mut self, present: &HashSet<ObjectId>) -> Vec<ObjectId> {
        let stale: Vec<ObjectId> = self
            .claims
            .iter()
            .filter(|(id, claim)| !claim.held && !present.contains(*id))
            .map(|(id, _)| *id)
            .collect();
        for object_id in &stale {
            self.release(*object_id);
        }
        stale
    }

    /// All claims in object id order
    pub fn claims(&self) -> Vec<(ObjectId, Claim)> {
        self.claims.iter().map(|(id, claim)| (*id, *claim)).collect()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
    }
}
