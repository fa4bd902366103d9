use crate::errors::DispatchError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// A cell on the map. Serialized upstream as strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "coordinate")]
    pub row: u32,
    #[serde(deserialize_with = "coordinate")]
    pub column: u32,
}

impl Position {
    pub const fn new(row: u32, column: u32) -> Self {
        Position { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

// Clients send coordinates either as JSON numbers or as numeric strings.
fn coordinate<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Coordinate {
        Number(u32),
        Text(String),
    }

    match Coordinate::deserialize(deserializer)? {
        Coordinate::Number(n) => Ok(n),
        Coordinate::Text(s) => s.trim().parse().map_err(|_| {
            serde::de::Error::custom(format!("coordinate must be a non-negative integer, got {s:?}"))
        }),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "polyanets", alias = "polyanet")]
    Polyanet,
    #[serde(rename = "soloons", alias = "soloon")]
    Soloon,
    #[serde(rename = "comeths", alias = "cometh")]
    Cometh,
}

impl ObjectType {
    /// Path segment of the upstream endpoint for this object type.
    pub const fn as_path(&self) -> &'static str {
        match self {
            ObjectType::Polyanet => "polyanets",
            ObjectType::Soloon => "soloons",
            ObjectType::Cometh => "comeths",
        }
    }

    /// Singular name for user-facing messages.
    pub const fn name(&self) -> &'static str {
        match self {
            ObjectType::Polyanet => "Polyanet",
            ObjectType::Soloon => "Soloon",
            ObjectType::Cometh => "Cometh",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Accepts the same names as deserialization: the plural path segment or
/// its singular form, in lower case.
impl FromStr for ObjectType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polyanets" | "polyanet" => Ok(ObjectType::Polyanet),
            "soloons" | "soloon" => Ok(ObjectType::Soloon),
            "comeths" | "cometh" => Ok(ObjectType::Cometh),
            other => Err(DispatchError::InvalidObjectType(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoloonColor {
    Blue,
    Red,
    Purple,
    White,
}

impl FromStr for SoloonColor {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(SoloonColor::Blue),
            "red" => Ok(SoloonColor::Red),
            "purple" => Ok(SoloonColor::Purple),
            "white" => Ok(SoloonColor::White),
            other => Err(DispatchError::InvalidAttribute {
                attribute: "color",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComethDirection {
    Up,
    Down,
    Right,
    Left,
}

impl FromStr for ComethDirection {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(ComethDirection::Up),
            "down" => Ok(ComethDirection::Down),
            "right" => Ok(ComethDirection::Right),
            "left" => Ok(ComethDirection::Left),
            other => Err(DispatchError::InvalidAttribute {
                attribute: "direction",
                value: other.to_string(),
            }),
        }
    }
}

/// Type-specific attributes of a create request. Only the one matching the
/// object type is sent upstream; the other is ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<SoloonColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<ComethDirection>,
}

impl Attributes {
    pub fn color(color: SoloonColor) -> Self {
        Attributes {
            color: Some(color),
            direction: None,
        }
    }

    pub fn direction(direction: ComethDirection) -> Self {
        Attributes {
            color: None,
            direction: Some(direction),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Delete,
}

/// One step of a bulk run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub kind: OperationKind,
    pub object_type: ObjectType,
    #[serde(flatten)]
    pub position: Position,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl BulkOperation {
    pub fn create(object_type: ObjectType, position: Position, attributes: Attributes) -> Self {
        BulkOperation {
            kind: OperationKind::Create,
            object_type,
            position,
            attributes,
        }
    }

    pub fn delete(object_type: ObjectType, position: Position) -> Self {
        BulkOperation {
            kind: OperationKind::Delete,
            object_type,
            position,
            attributes: Attributes::default(),
        }
    }
}

/// Wire body sent to the map API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AstralObjectPayload<'a> {
    pub row: String,
    pub column: String,
    pub candidate_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<SoloonColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<ComethDirection>,
}

/// Summary of a completed multi-step run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Upstream calls that succeeded.
    pub applied: usize,
    /// Cells that required no call.
    pub skipped: usize,
}
