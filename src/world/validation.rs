use super::{AgentId, AgentObservation, AvailableObject, ObjectId, Position, WorldSnapshot};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Validation errors for snapshot payloads
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NotAnObject(&'static str),
    MissingField(&'static str),
    InvalidField { field: &'static str, reason: String },
    DuplicateAgent(AgentId),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NotAnObject(what) => write!(f, "{} must be a JSON object", what),
            ValidationError::MissingField(field) => write!(f, "{} is required", field),
            ValidationError::InvalidField { field, reason } => {
                write!(f, "invalid {}: {}", field, reason)
            }
            ValidationError::DuplicateAgent(id) => {
                write!(f, "agent {} appears more than once in snapshot", id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// An agent entry that could not be turned into an observation.
///
/// `agent_id` is kept when the id itself parsed, so the error can be
/// attributed in the response.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEntry {
    pub agent_id: Option<AgentId>,
    pub error: ValidationError,
}

/// Raw request body.
///
/// Agent entries are kept as untyped JSON so a single malformed entry can be
/// rejected without failing the whole request.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SnapshotPayload {
    #[serde(rename = "agentStates", default)]
    pub agent_states: Vec<Value>,

    #[serde(rename = "availableCubes", default)]
    pub available_cubes: Vec<Value>,
}

/// Parses a decision/metrics request body into a `WorldSnapshot`.
///
/// Accepted entry shapes:
/// - `{"id": "3", "state": {"position": {...}, "has_cube": false, "time": 12.5}}`
/// - `{"agentId": 3, "position": {...}, "holding": false}`
///
/// Cubes come from the top-level `availableCubes` list, or from a per-entry
/// `available_cubes` list which wins for that agent. A malformed top-level
/// cube is dropped on its own; anything wrong inside one agent entry only
/// rejects that entry. Only a body that is not a snapshot object fails.
pub fn parse_snapshot(body: &[u8]) -> Result<WorldSnapshot, ValidationError> {
    let payload: SnapshotPayload =
        serde_json::from_slice(body).map_err(|e| ValidationError::InvalidField {
            field: "body",
            reason: e.to_string(),
        })?;

    let available = payload
        .available_cubes
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match parse_object(item, "availableCubes") {
            Ok(object) => Some(object),
            Err(e) => {
                warn!(index = index, error = %e, "Dropping malformed cube");
                None
            }
        })
        .collect();

    let mut seen = HashSet::new();
    let entries = payload
        .agent_states
        .iter()
        .map(|raw| {
            let observation = parse_entry(raw)?;
            if !seen.insert(observation.agent_id) {
                return Err(RejectedEntry {
                    agent_id: Some(observation.agent_id),
                    error: ValidationError::DuplicateAgent(observation.agent_id),
                });
            }
            Ok(observation)
        })
        .collect();

    Ok(WorldSnapshot { entries, available })
}

fn parse_entry(raw: &Value) -> Result<AgentObservation, RejectedEntry> {
    let reject = |agent_id, error| RejectedEntry { agent_id, error };

    let entry = raw
        .as_object()
        .ok_or_else(|| reject(None, ValidationError::NotAnObject("agent entry")))?;

    let agent_id = match entry.get("id").or_else(|| entry.get("agentId")) {
        Some(v) => parse_id(v, "id").map_err(|e| reject(None, e))?,
        None => return Err(reject(None, ValidationError::MissingField("id"))),
    };

    // Nested `state` object (client format) or flat entry
    let state: &Map<String, Value> = match entry.get("state") {
        Some(v) => v
            .as_object()
            .ok_or_else(|| reject(Some(agent_id), ValidationError::NotAnObject("state")))?,
        None => entry,
    };

    parse_state(agent_id, state).map_err(|e| reject(Some(agent_id), e))
}

fn parse_state(agent_id: AgentId, state: &Map<String, Value>) -> Result<AgentObservation, ValidationError> {
    let position = match state.get("position") {
        Some(v) => parse_position(v, "position")?,
        None => return Err(ValidationError::MissingField("position")),
    };

    let holding = match state.get("has_cube").or_else(|| state.get("holding")) {
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "has_cube",
                reason: "expected a boolean".to_string(),
            })
        }
        None => return Err(ValidationError::MissingField("has_cube")),
    };

    let time = match state.get("time") {
        None | Some(Value::Null) => None,
        Some(v) => Some(parse_finite(v, "time")?),
    };

    let available = match state.get("available_cubes") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(parse_objects(items, "available_cubes")?),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                field: "available_cubes",
                reason: "expected an array".to_string(),
            })
        }
    };

    Ok(AgentObservation {
        agent_id,
        position,
        holding,
        time,
        available,
    })
}

fn parse_objects(items: &[Value], field: &'static str) -> Result<Vec<AvailableObject>, ValidationError> {
    items.iter().map(|item| parse_object(item, field)).collect()
}

fn parse_object(item: &Value, field: &'static str) -> Result<AvailableObject, ValidationError> {
    let cube = item.as_object().ok_or(ValidationError::NotAnObject(field))?;
    let id = match cube.get("id").or_else(|| cube.get("objectId")) {
        Some(v) => parse_id(v, "cube id")?,
        None => return Err(ValidationError::MissingField("cube id")),
    };
    let position = match cube.get("position") {
        Some(v) => parse_position(v, "cube position")?,
        None => return Err(ValidationError::MissingField("cube position")),
    };
    Ok(AvailableObject { id, position })
}

/// Ids arrive as JSON integers or as decimal strings (the game client
/// serializes agent ids as strings).
fn parse_id(value: &Value, field: &'static str) -> Result<AgentId, ValidationError> {
    let parsed: Option<ObjectId> = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::InvalidField {
        field,
        reason: format!("expected a non-negative integer, got {}", value),
    })
}

fn parse_position(value: &Value, field: &'static str) -> Result<Position, ValidationError> {
    let coords = value.as_object().ok_or(ValidationError::NotAnObject(field))?;
    let axis = |name: &'static str| match coords.get(name) {
        Some(v) => parse_finite(v, field),
        None => Err(ValidationError::InvalidField {
            field,
            reason: format!("missing {} coordinate", name),
        }),
    };
    Ok(Position::new(axis("x")?, axis("y")?, axis("z")?))
}

fn parse_finite(value: &Value, field: &'static str) -> Result<f64, ValidationError> {
    match value.as_f64() {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(ValidationError::InvalidField {
            field,
            reason: format!("expected a finite number, got {}", value),
        }),
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_and_numeric_ids() {
        assert_eq!(parse_id(&json!("7"), "id"), Ok(7));
        assert_eq!(parse_id(&json!(7), "id"), Ok(7));
        assert!(parse_id(&json!(-1), "id").is_err());
        assert!(parse_id(&json!("seven"), "id").is_err());
        assert!(parse_id(&json!(1.5), "id").is_err());
    }

    #[test]
    fn test_position_requires_all_axes() {
        assert!(parse_position(&json!({"x": 1.0, "y": 0.0, "z": 2.0}), "position").is_ok());
        assert!(parse_position(&json!({"x": 1.0, "z": 2.0}), "position").is_err());
        assert!(parse_position(&json!([1.0, 0.0, 2.0]), "position").is_err());
        assert!(parse_position(&json!({"x": "1", "y": 0, "z": 0}), "position").is_err());
    }
}
