//! Aggregate and field descriptors.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{BasicType, SemanticType};
use crate::naming::to_column_name;

/// Persisted name marking a field that has no column.
pub const TRANSIENT_COLUMN: &str = "-";

/// Aggregate-level annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateAnnotations {
    /// Name of the declared base entity trait (`+soliton:baseEntity(Name)`).
    pub base_entity_trait: Option<String>,

    /// The aggregate is a business aggregate for an association and must
    /// never be collapsed into a synthesized junction table.
    pub is_junction_aggregate: bool,

    /// Aggregates this aggregate references at aggregate level.
    pub outward_refs: BTreeSet<String>,
}

/// Field-level annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldAnnotations {
    pub unique: bool,
    pub outward_ref: bool,
    /// Explicit `ref(Target)` target.
    pub ref_target: Option<String>,
    pub required: bool,
    pub is_associated_entity: bool,
    pub is_value_object: bool,
    pub value_object_strategy: Option<String>,
    pub indexed: bool,
    pub enum_values: Vec<String>,
}

/// A single field of an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    pub is_optional: bool,
    pub is_repeated: bool,
    pub persisted_name: String,
    /// Whether `persisted_name` came from an explicit column tag.
    pub explicit_column: bool,
    pub annotations: FieldAnnotations,
}

impl FieldDescriptor {
    /// Creates a singular, required field persisted under its column-case name.
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        let name = name.into();
        Self {
            persisted_name: to_column_name(&name),
            name,
            semantic_type,
            is_optional: false,
            is_repeated: false,
            explicit_column: false,
            annotations: FieldAnnotations::default(),
        }
    }

    /// Shorthand for a basic-typed field.
    pub fn basic(name: impl Into<String>, basic: BasicType) -> Self {
        Self::new(name, SemanticType::Basic(basic))
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.is_repeated = true;
        self
    }

    /// Sets an explicit column name.
    pub fn persisted_as(mut self, column: impl Into<String>) -> Self {
        self.persisted_name = column.into();
        self.explicit_column = true;
        self
    }

    pub fn annotated(mut self, annotations: FieldAnnotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// The field carries no column (`db:"-"`).
    pub fn is_transient(&self) -> bool {
        self.persisted_name == TRANSIENT_COLUMN
    }

    /// The field maps onto a storage column.
    pub fn is_column(&self) -> bool {
        !self.is_transient() && !self.annotations.is_associated_entity
    }

    /// The aggregate an outward reference points at.
    ///
    /// An explicit `ref(Target)` wins; a reference-typed field points at its
    /// type; otherwise the target is the field name without its `ID` suffix.
    pub fn ref_target(&self) -> Option<String> {
        if !self.annotations.outward_ref {
            return None;
        }
        if let Some(target) = &self.annotations.ref_target {
            return Some(target.clone());
        }
        if let Some(reference) = self.semantic_type.reference() {
            return Some(reference.to_string());
        }
        let stem = self
            .name
            .strip_suffix("ID")
            .or_else(|| self.name.strip_suffix("Id"))
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name);
        Some(stem.to_string())
    }
}

/// Identity selection priority; lower variants win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum IdPriority {
    /// The field is explicitly persisted as the `id` column.
    ExplicitColumn = 1,
    /// The field is literally named `ID`.
    NamedId = 2,
    /// The field name ends in `ID` (`OrderID`).
    SuffixId = 3,
    /// The field has the designated integer identity type.
    IntegerIdentity = 4,
}

/// Ranks a field as an identity candidate. Repeated fields never qualify.
pub fn id_priority(field: &FieldDescriptor) -> Option<IdPriority> {
    if field.is_repeated {
        return None;
    }
    if field.explicit_column && field.persisted_name == "id" {
        return Some(IdPriority::ExplicitColumn);
    }
    if field.name == "ID" {
        return Some(IdPriority::NamedId);
    }
    if field.name.len() > 2 && field.name.ends_with("ID") {
        return Some(IdPriority::SuffixId);
    }
    if field.semantic_type == SemanticType::Basic(BasicType::IDENTITY) {
        return Some(IdPriority::IntegerIdentity);
    }
    None
}

/// Conventional capabilities detected from field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BaseEntityTraits {
    pub deleted_at: bool,
    pub version: bool,
    pub created_at: bool,
    pub updated_at: bool,
    pub created_by: bool,
    pub updated_by: bool,
}

impl BaseEntityTraits {
    pub fn detect(fields: &[FieldDescriptor]) -> Self {
        let mut traits = Self::default();
        for field in fields {
            match field.name.as_str() {
                "DeletedAt" => traits.deleted_at = true,
                "Version" => traits.version = true,
                "CreatedAt" => traits.created_at = true,
                "UpdatedAt" => traits.updated_at = true,
                "CreatedBy" => traits.created_by = true,
                "UpdatedBy" => traits.updated_by = true,
                _ => {}
            }
        }
        traits
    }

    pub fn has_soft_delete(&self) -> bool {
        self.deleted_at
    }

    pub fn has_optimistic_lock(&self) -> bool {
        self.version
    }

    pub fn has_audit(&self) -> bool {
        self.created_at || self.updated_at
    }
}

/// A Go module located through its `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoModule {
    pub name: String,
    pub root: PathBuf,
}

/// Where a declaration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceOrigin {
    pub file: Option<PathBuf>,
    pub package: Option<String>,
    pub import_path: Option<String>,
    pub module: Option<GoModule>,
}

/// A declared aggregate root.
///
/// The identity field and base entity traits are derived once at
/// construction and the descriptor is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    annotations: AggregateAnnotations,
    origin: SourceOrigin,
    id_field_index: Option<usize>,
    base_traits: BaseEntityTraits,
}

impl AggregateDescriptor {
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
        annotations: AggregateAnnotations,
    ) -> Self {
        let id_field_index = select_id_field(&fields);
        let base_traits = BaseEntityTraits::detect(&fields);
        Self {
            name: name.into(),
            fields,
            annotations,
            origin: SourceOrigin::default(),
            id_field_index,
            base_traits,
        }
    }

    /// Attaches source location metadata.
    pub fn with_origin(mut self, origin: SourceOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn annotations(&self) -> &AggregateAnnotations {
        &self.annotations
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.origin.file.as_deref()
    }

    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.id_field_index.map(|i| &self.fields[i])
    }

    pub fn base_traits(&self) -> BaseEntityTraits {
        self.base_traits
    }

    pub fn declares_base_entity(&self) -> bool {
        self.annotations.base_entity_trait.is_some()
    }

    /// Fields that map onto storage columns, in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_column())
    }
}

/// Picks the identity field: the best priority wins, the first declared
/// field wins among equals.
fn select_id_field(fields: &[FieldDescriptor]) -> Option<usize> {
    let mut best: Option<(usize, IdPriority)> = None;
    for (index, field) in fields.iter().enumerate() {
        if let Some(priority) = id_priority(field) {
            match best {
                Some((_, current)) if current <= priority => {}
                _ => best = Some((index, priority)),
            }
        }
    }
    best.map(|(index, _)| index)
}
