//! Wire protocol between clients and the game server.
//!
//! Client frames are JSON objects keyed by operation name
//! (`{"moveUnit": {"id": 4, "pos": {...}, "type": "aggro"}}`) or arrays of
//! such objects. Server messages use a `{"messageType", "data"}` envelope.

use crate::entities::{Builder, Building, BuildingKind, Fighter, ResourceNode, Resources};
use crate::math::{GridLocation, Vector3};
use crate::{EntityId, PlayerId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// A command as received: an operation name plus its unvalidated arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub operation: String,
    pub args: Value,
}

impl CommandRequest {
    pub fn new(operation: impl Into<String>, args: Value) -> Self {
        Self {
            operation: operation.into(),
            args,
        }
    }

    /// Encodes the request the way clients send it.
    pub fn to_frame(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert(self.operation.clone(), self.args.clone());
        Value::Object(object)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },
}

/// Splits a client text frame into command requests, in frame order.
///
/// An object may carry several operations but its keys come back sorted, so
/// clients that care about ordering send an array of single-key objects.
pub fn parse_client_frame(text: &str) -> Result<Vec<CommandRequest>, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))?;

    match value {
        Value::Array(items) => {
            let mut requests = Vec::new();
            for item in items {
                requests.extend(requests_from_object(item)?);
            }
            Ok(requests)
        }
        object @ Value::Object(_) => requests_from_object(object),
        other => Err(ProtocolError::MalformedFrame(format!(
            "expected an object or array, got {}",
            other
        ))),
    }
}

fn requests_from_object(value: Value) -> Result<Vec<CommandRequest>, ProtocolError> {
    let Value::Object(map) = value else {
        return Err(ProtocolError::MalformedFrame(
            "command entries must be objects".to_string(),
        ));
    };
    if map.is_empty() {
        return Err(ProtocolError::MalformedFrame("empty command object".to_string()));
    }
    Ok(map
        .into_iter()
        .map(|(operation, args)| CommandRequest { operation, args })
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Sets the goal of a unit; `aggro` enables auto-targeting.
    MoveUnit {
        id: EntityId,
        goal: Vector3,
        aggro: bool,
    },
    PlaceBuilding {
        kind: BuildingKind,
        position: GridLocation,
    },
    CreateKnight,
    CreateBuilder,
    /// Reserved; acknowledged without effect.
    Attack {
        attacker: Option<EntityId>,
        target: Option<EntityId>,
    },
    /// Adds to the caller's stockpile when cheats are enabled.
    GrantResources(Resources),
}

pub const MOVE_UNIT: &str = "moveUnit";
pub const PLACE_BUILDING: &str = "placeBuilding";
pub const CREATE_KNIGHT: &str = "createKnight";
pub const CREATE_BUILDER: &str = "createBuilder";
pub const ATTACK: &str = "attack";
pub const GRANT_RESOURCES: &str = "grantResources";

#[derive(Deserialize)]
struct MoveUnitArgs {
    id: EntityId,
    pos: Vector3,
    #[serde(rename = "type", default)]
    move_type: String,
}

#[derive(Deserialize)]
struct GroundPosition {
    x: f64,
    z: f64,
}

#[derive(Deserialize)]
struct PlaceBuildingArgs {
    #[serde(rename = "type")]
    kind: BuildingKind,
    pos: GroundPosition,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AttackArgs {
    #[serde(default, alias = "attacker")]
    attacker_id: Option<EntityId>,
    #[serde(default, alias = "target")]
    target_id: Option<EntityId>,
}

#[derive(Deserialize)]
struct GrantArgs {
    #[serde(default)]
    gold: f64,
    #[serde(default)]
    stone: f64,
    #[serde(default)]
    wood: f64,
}

fn decode_args<T: DeserializeOwned>(request: &CommandRequest) -> Result<T, ProtocolError> {
    T::deserialize(&request.args).map_err(|e| ProtocolError::InvalidArguments {
        operation: request.operation.clone(),
        reason: e.to_string(),
    })
}

impl Command {
    /// Validates a request's shape and turns it into a typed command.
    pub fn from_request(request: &CommandRequest) -> Result<Command, ProtocolError> {
        match request.operation.as_str() {
            MOVE_UNIT => {
                let args: MoveUnitArgs = decode_args(request)?;
                let aggro = matches!(args.move_type.as_str(), "aggro" | "aggressive");
                Ok(Command::MoveUnit {
                    id: args.id,
                    goal: args.pos,
                    aggro,
                })
            }
            PLACE_BUILDING => {
                let args: PlaceBuildingArgs = decode_args(request)?;
                if !args.pos.x.is_finite() || !args.pos.z.is_finite() {
                    return Err(ProtocolError::InvalidArguments {
                        operation: request.operation.clone(),
                        reason: "position must be finite".to_string(),
                    });
                }
                Ok(Command::PlaceBuilding {
                    kind: args.kind,
                    position: GridLocation::new(args.pos.x as i32, args.pos.z as i32),
                })
            }
            CREATE_KNIGHT => Ok(Command::CreateKnight),
            CREATE_BUILDER => Ok(Command::CreateBuilder),
            ATTACK => {
                let args: AttackArgs = if request.args.is_object() {
                    decode_args(request)?
                } else {
                    AttackArgs::default()
                };
                Ok(Command::Attack {
                    attacker: args.attacker_id,
                    target: args.target_id,
                })
            }
            GRANT_RESOURCES => {
                let args: GrantArgs = decode_args(request)?;
                let amounts = [args.gold, args.stone, args.wood];
                if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
                    return Err(ProtocolError::InvalidArguments {
                        operation: request.operation.clone(),
                        reason: "amounts must be finite and non-negative".to_string(),
                    });
                }
                Ok(Command::GrantResources(Resources::new(
                    args.gold, args.stone, args.wood,
                )))
            }
            other => Err(ProtocolError::UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub operation: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub gold: f64,
    pub stone: f64,
    pub wood: f64,
    pub fighters: BTreeMap<EntityId, Fighter>,
    pub builders: BTreeMap<EntityId, Builder>,
    pub buildings: BTreeMap<EntityId, Building>,
}

/// Full world state published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub elapsed_time: f64,
    /// Entities removed by this tick's death sweep only.
    pub deceased: Vec<EntityId>,
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub resources: BTreeMap<EntityId, ResourceNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    PlayerNumber {
        #[serde(rename = "playerNumber")]
        player_number: PlayerId,
    },
    CommandResponse(CommandResponse),
    GameState(GameSnapshot),
    Disconnected {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::KNIGHT;
    use serde_json::json;

    #[test]
    fn test_parse_single_object_frame() {
        let requests = parse_client_frame(r#"{"createKnight": {"some": "knight"}}"#).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].operation, CREATE_KNIGHT);
        assert_eq!(
            Command::from_request(&requests[0]).unwrap(),
            Command::CreateKnight
        );
    }

    #[test]
    fn test_parse_array_frame_keeps_order() {
        let frame = r#"[{"placeBuilding": {"type": "house", "pos": {"x": 1, "z": 2}}},
                        {"createBuilder": {}}]"#;
        let requests = parse_client_frame(frame).unwrap();
        let operations: Vec<&str> = requests.iter().map(|r| r.operation.as_str()).collect();
        assert_eq!(operations, vec![PLACE_BUILDING, CREATE_BUILDER]);
    }

    #[test]
    fn test_malformed_frames_are_rejected() {
        assert!(matches!(
            parse_client_frame("not json"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_client_frame("42"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_client_frame("{}"),
            Err(ProtocolError::MalformedFrame(_))
        ));
        assert!(matches!(
            parse_client_frame("[1, 2]"),
            Err(ProtocolError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_move_unit_aggro_modes() {
        let aggro = CommandRequest::new(
            MOVE_UNIT,
            json!({"id": 5, "pos": {"x": 1.0, "y": 0.5, "z": 2.0}, "type": "aggro"}),
        );
        assert_eq!(
            Command::from_request(&aggro).unwrap(),
            Command::MoveUnit {
                id: 5,
                goal: Vector3::new(1.0, 0.5, 2.0),
                aggro: true
            }
        );

        let aggressive = CommandRequest::new(
            MOVE_UNIT,
            json!({"id": 5, "pos": {"x": 0, "y": 0, "z": 0}, "type": "aggressive"}),
        );
        assert!(matches!(
            Command::from_request(&aggressive),
            Ok(Command::MoveUnit { aggro: true, .. })
        ));

        let passive = CommandRequest::new(
            MOVE_UNIT,
            json!({"id": 5, "pos": {"x": 0, "y": 0, "z": 0}, "type": "passive"}),
        );
        assert!(matches!(
            Command::from_request(&passive),
            Ok(Command::MoveUnit { aggro: false, .. })
        ));
    }

    #[test]
    fn test_place_building_truncates_float_grid() {
        let request = CommandRequest::new(
            PLACE_BUILDING,
            json!({"type": "barracks", "pos": {"x": 3.7, "z": -2.2}}),
        );
        assert_eq!(
            Command::from_request(&request).unwrap(),
            Command::PlaceBuilding {
                kind: BuildingKind::Barracks,
                position: GridLocation::new(3, -2)
            }
        );
    }

    #[test]
    fn test_invalid_arguments() {
        let missing_pos = CommandRequest::new(MOVE_UNIT, json!({"id": 5}));
        assert!(matches!(
            Command::from_request(&missing_pos),
            Err(ProtocolError::InvalidArguments { .. })
        ));

        let bad_type = CommandRequest::new(
            PLACE_BUILDING,
            json!({"type": "castle", "pos": {"x": 0, "z": 0}}),
        );
        assert!(matches!(
            Command::from_request(&bad_type),
            Err(ProtocolError::InvalidArguments { .. })
        ));

        let unknown = CommandRequest::new("launchNukes", json!({}));
        assert_eq!(
            Command::from_request(&unknown),
            Err(ProtocolError::UnknownOperation("launchNukes".to_string()))
        );
    }

    #[test]
    fn test_attack_accepts_missing_args() {
        let request = CommandRequest::new(ATTACK, Value::Null);
        assert_eq!(
            Command::from_request(&request).unwrap(),
            Command::Attack {
                attacker: None,
                target: None
            }
        );

        let request = CommandRequest::new(ATTACK, json!({"attackerId": 1, "target": 2}));
        assert_eq!(
            Command::from_request(&request).unwrap(),
            Command::Attack {
                attacker: Some(1),
                target: Some(2)
            }
        );
    }

    #[test]
    fn test_request_frame_round_trip() {
        let request = CommandRequest::new(GRANT_RESOURCES, json!({"gold": 10.0}));
        let frame = request.to_frame().to_string();
        assert_eq!(parse_client_frame(&frame).unwrap(), vec![request]);
    }

    #[test]
    fn test_server_message_envelope() {
        let message = ServerMessage::PlayerNumber { player_number: 2 };
        let encoded = serde_json::to_value(&message).unwrap();
        assert_eq!(
            encoded,
            json!({"messageType": "playerNumber", "data": {"playerNumber": 2}})
        );

        let decoded: ServerMessage = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_snapshot_bincode_and_json() {
        let mut fighters = BTreeMap::new();
        fighters.insert(11, Fighter::spawn(11, &KNIGHT, Vector3::new(1.0, 0.0, 1.0)));
        let mut players = BTreeMap::new();
        players.insert(
            1,
            PlayerSnapshot {
                id: 1,
                gold: 10.0,
                stone: 20.0,
                wood: 30.0,
                fighters,
                builders: BTreeMap::new(),
                buildings: BTreeMap::new(),
            },
        );
        let snapshot = GameSnapshot {
            elapsed_time: 1.5,
            deceased: vec![3, 4],
            players,
            resources: BTreeMap::new(),
        };

        let bytes = bincode::serialize(&snapshot).unwrap();
        let decoded: GameSnapshot = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, snapshot);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["elapsedTime"], json!(1.5));
        assert_eq!(json["players"]["1"]["fighters"]["11"]["unitType"], json!("knight"));
        assert_eq!(json["players"]["1"]["fighters"]["11"]["areaOfAttack"], json!(1.0));
    }

    #[test]
    fn test_protocol_error_messages() {
        let err = Command::from_request(&CommandRequest::new("placeBuilding", json!({"type": "castle"})))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid arguments for 'placeBuilding': "));

        assert_eq!(
            ProtocolError::UnknownOperation("launchNukes".to_string()).to_string(),
            "unknown operation 'launchNukes'"
        );
        let boxed: Box<dyn std::error::Error> = Box::new(parse_client_frame("[1]").unwrap_err());
        assert_eq!(boxed.to_string(), "malformed frame: command entries must be objects");
    }
}
