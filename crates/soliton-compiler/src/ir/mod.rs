//! Language-agnostic metadata model.
//!
//! Frontends produce [`AggregateDescriptor`]s, the [`Registry`] owns them
//! together with everything derived from them (relations, junction tables,
//! enums), and generators read the finished registry. Aggregates refer to
//! each other only by name; the registry is the arena that resolves names.

mod aggregate;
mod enums;
mod registry;
mod relation;

use std::fmt;

use serde::Serialize;

pub use aggregate::{
    id_priority, AggregateAnnotations, AggregateDescriptor, BaseEntityTraits, FieldAnnotations,
    FieldDescriptor, GoModule, IdPriority, SourceOrigin, TRANSIENT_COLUMN,
};
pub use enums::EnumDescriptor;
pub use registry::{NotFound, Registry};
pub use relation::{JunctionKind, JunctionTable, RelationKind, RelationRecord};

/// The fixed set of basic (non-aggregate) field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicType {
    Int,
    Int32,
    Int64,
    Uint,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Bool,
    Byte,
    Rune,
    Time,
}

impl BasicType {
    /// Every basic type, in declaration order.
    pub const ALL: [BasicType; 13] = [
        BasicType::Int,
        BasicType::Int32,
        BasicType::Int64,
        BasicType::Uint,
        BasicType::Uint32,
        BasicType::Uint64,
        BasicType::Float32,
        BasicType::Float64,
        BasicType::String,
        BasicType::Bool,
        BasicType::Byte,
        BasicType::Rune,
        BasicType::Time,
    ];

    /// The integer type aggregates use for identity when nothing more
    /// specific marks the identity field.
    pub const IDENTITY: BasicType = BasicType::Int64;

    /// Resolves a Go type name (`int64`, `time.Time`, ...).
    pub fn from_go(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.go_name() == name)
    }

    /// The Go spelling of this type.
    pub const fn go_name(self) -> &'static str {
        match self {
            BasicType::Int => "int",
            BasicType::Int32 => "int32",
            BasicType::Int64 => "int64",
            BasicType::Uint => "uint",
            BasicType::Uint32 => "uint32",
            BasicType::Uint64 => "uint64",
            BasicType::Float32 => "float32",
            BasicType::Float64 => "float64",
            BasicType::String => "string",
            BasicType::Bool => "bool",
            BasicType::Byte => "byte",
            BasicType::Rune => "rune",
            BasicType::Time => "time.Time",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            BasicType::Int
                | BasicType::Int32
                | BasicType::Int64
                | BasicType::Uint
                | BasicType::Uint32
                | BasicType::Uint64
                | BasicType::Byte
                | BasicType::Rune
        )
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, BasicType::Float32 | BasicType::Float64)
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.go_name())
    }
}

/// The semantic type of a field: a basic type, or the name of another type
/// (usually another aggregate, sometimes a value object).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum SemanticType {
    Basic(BasicType),
    Reference(String),
}

impl SemanticType {
    /// Resolves a bare Go type name; anything outside the basic set is a
    /// reference.
    pub fn from_go(name: &str) -> Self {
        match BasicType::from_go(name) {
            Some(basic) => SemanticType::Basic(basic),
            None => SemanticType::Reference(name.to_string()),
        }
    }

    pub fn is_basic(&self) -> bool {
        matches!(self, SemanticType::Basic(_))
    }

    pub fn basic(&self) -> Option<BasicType> {
        match self {
            SemanticType::Basic(b) => Some(*b),
            SemanticType::Reference(_) => None,
        }
    }

    pub fn reference(&self) -> Option<&str> {
        match self {
            SemanticType::Basic(_) => None,
            SemanticType::Reference(name) => Some(name),
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticType::Basic(b) => write!(f, "{}", b),
            SemanticType::Reference(name) => f.write_str(name),
        }
    }
}
