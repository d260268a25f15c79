//! Element identity and per-type submission rules

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use super::schema::FieldSchema;

/// Opaque identifier of one structural element (story + label composite).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementKey(String);

impl ElementKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for ElementKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Kind of structural element being edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Pier,
    Column,
    /// Column-like element with a 1x1 bar grid
    Strut,
    Beam,
    DropBeam,
}

/// Request collection an element's update is emitted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionCategory {
    Piers,
    Columns,
    Beams,
    DropBeams,
}

/// Where existing field values live on a baseline record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayout {
    /// Fields sit directly on the record
    Flat,
    /// Fields sit inside the named sub-object of the record
    Nested(&'static str),
}

impl ElementType {
    pub const ALL: [ElementType; 5] = [
        ElementType::Pier,
        ElementType::Column,
        ElementType::Strut,
        ElementType::Beam,
        ElementType::DropBeam,
    ];

    /// Struts are submitted with columns; the backend promotes a strut to a
    /// column when its bar grid grows past 1x1.
    pub fn category(self) -> SubmissionCategory {
        match self {
            ElementType::Pier => SubmissionCategory::Piers,
            ElementType::Column | ElementType::Strut => SubmissionCategory::Columns,
            ElementType::Beam => SubmissionCategory::Beams,
            ElementType::DropBeam => SubmissionCategory::DropBeams,
        }
    }

    pub fn layout(self) -> SourceLayout {
        match self {
            ElementType::Beam => SourceLayout::Nested("reinforcement"),
            _ => SourceLayout::Flat,
        }
    }

    pub fn schema(self) -> FieldSchema {
        match self {
            ElementType::Pier => FieldSchema::PIER,
            ElementType::Column => FieldSchema::COLUMN,
            ElementType::Strut => FieldSchema::STRUT,
            ElementType::Beam => FieldSchema::BEAM,
            ElementType::DropBeam => FieldSchema::DROP_BEAM,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::Pier => "pier",
            ElementType::Column => "column",
            ElementType::Strut => "strut",
            ElementType::Beam => "beam",
            ElementType::DropBeam => "drop_beam",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
