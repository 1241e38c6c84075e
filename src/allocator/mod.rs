use crate::registry::ObjectRegistry;
use crate::world::{AgentId, AvailableObject, Position};
use tracing::debug;

/// Nearest cube `agent_id` may take, without claiming it.
///
/// Cubes claimed by another agent are skipped; the agent's own claim stays
/// eligible so an in-progress target can be re-affirmed. Ties go to the
/// first cube in input order.
pub fn nearest_eligible<'a>(
    position: &Position,
    available: &'a [AvailableObject],
    agent_id: AgentId,
    registry: &ObjectRegistry,
) -> Option<(&'a AvailableObject, f64)> {
    let mut best: Option<(&AvailableObject, f64)> = None;

    for object in available {
        if !registry.is_available_to(object.id, agent_id) {
            continue;
        }

        let distance = position.distance_to(&object.position);
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((object, distance)),
        }
    }

    best
}

/// Pick the nearest eligible cube for `agent_id` and claim it.
///
/// Selection and claim happen under the same `&mut` borrow of the registry,
/// so two agents processed one after the other can never be handed the
/// same cube.
pub fn find_target(
    position: &Position,
    available: &[AvailableObject],
    agent_id: AgentId,
    registry: &mut ObjectRegistry,
) -> Option<AvailableObject> {
    let Some((object, distance)) = nearest_eligible(position, available, agent_id, registry) else {
        debug!(agent_id = %agent_id, candidates = available.len(), "No eligible cube");
        return None;
    };

    let object = object.clone();
    if !registry.claim(agent_id, object.id).is_success() {
        // nearest_eligible only yields cubes free for this agent
        return None;
    }

    debug!(
        agent_id = %agent_id,
        object_id = %object.id,
        distance = distance,
        "Targeting nearest cube"
    );
    Some(object)
}
