// Copyright (c) 2026 Adrian Robinson. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.

use crate::traits::{Restricted, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enumeration of supported field types.
///
/// The string form is what the field registry persists inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldType {
    Array,
    AsyncArray,
    Map,
    AsyncMap,
    Object,
    AsyncObject,
    Boolean,
    Numeric,
    RestrictedText,
    Set,
    Text,
}

/// Raw primitive kind backing a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Sequence,
    Map,
    Text,
}

impl FieldType {
    pub fn primitive(&self) -> PrimitiveKind {
        match self {
            FieldType::Array | FieldType::AsyncArray | FieldType::Object | FieldType::AsyncObject => {
                PrimitiveKind::Sequence
            }
            FieldType::Map | FieldType::AsyncMap | FieldType::Set => PrimitiveKind::Map,
            FieldType::Boolean | FieldType::Numeric | FieldType::RestrictedText | FieldType::Text => {
                PrimitiveKind::Text
            }
        }
    }

    pub(crate) fn obj_type(&self) -> automerge::ObjType {
        match self.primitive() {
            PrimitiveKind::Sequence => automerge::ObjType::List,
            PrimitiveKind::Map => automerge::ObjType::Map,
            PrimitiveKind::Text => automerge::ObjType::Text,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Array => write!(f, "Array"),
            FieldType::AsyncArray => write!(f, "AsyncArray"),
            FieldType::Map => write!(f, "Map"),
            FieldType::AsyncMap => write!(f, "AsyncMap"),
            FieldType::Object => write!(f, "Object"),
            FieldType::AsyncObject => write!(f, "AsyncObject"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Numeric => write!(f, "Numeric"),
            FieldType::RestrictedText => write!(f, "RestrictedText"),
            FieldType::Set => write!(f, "Set"),
            FieldType::Text => write!(f, "Text"),
        }
    }
}

impl FromStr for FieldType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "").to_lowercase().as_str() {
            "array" => Ok(FieldType::Array),
            "asyncarray" => Ok(FieldType::AsyncArray),
            "map" => Ok(FieldType::Map),
            "asyncmap" => Ok(FieldType::AsyncMap),
            "object" => Ok(FieldType::Object),
            "asyncobject" => Ok(FieldType::AsyncObject),
            "boolean" => Ok(FieldType::Boolean),
            "numeric" => Ok(FieldType::Numeric),
            "restrictedtext" => Ok(FieldType::RestrictedText),
            "set" => Ok(FieldType::Set),
            "text" => Ok(FieldType::Text),
            _ => Err(SyncError::Format(format!("Unknown field type: {}", s))),
        }
    }
}

/// Position of a signer in the access hierarchy, highest first.
///
/// `Ord` follows the hierarchy: `Creator > Owner > Admin > Editor > Viewer > Appender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Creator,
    Owner,
    Admin,
    Editor,
    Viewer,
    Appender,
}

impl Role {
    fn rank(&self) -> u8 {
        match self {
            Role::Creator => 5,
            Role::Owner => 4,
            Role::Admin => 3,
            Role::Editor => 2,
            Role::Viewer => 1,
            Role::Appender => 0,
        }
    }

    /// Roles that may never alter shared state such as access or deletions.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Role::Editor | Role::Viewer | Role::Appender)
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Creator => write!(f, "creator"),
            Role::Owner => write!(f, "owner"),
            Role::Admin => write!(f, "admin"),
            Role::Editor => write!(f, "editor"),
            Role::Viewer => write!(f, "viewer"),
            Role::Appender => write!(f, "appender"),
        }
    }
}

impl Restricted for Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
            Role::Appender => "appender",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for Role {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "creator" => Ok(Role::Creator),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "editor" => Ok(Role::Editor),
            "viewer" => Ok(Role::Viewer),
            "appender" => Ok(Role::Appender),
            _ => Err(SyncError::Format(format!("Unknown role: {}", s))),
        }
    }
}
