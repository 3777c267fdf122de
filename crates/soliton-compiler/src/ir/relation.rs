//! Inferred associations between aggregates.

use std::fmt;

use serde::Serialize;

use super::FieldDescriptor;
use crate::naming::to_snake_case;

/// How two aggregates are associated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToMany,
    Ref,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RelationKind::OneToOne => "one-to-one",
            RelationKind::OneToMany => "one-to-many",
            RelationKind::ManyToMany => "many-to-many",
            RelationKind::Ref => "ref",
        };
        f.write_str(name)
    }
}

/// An association from `source` to `target`.
///
/// The kind is derived from the field shape when the record is built and
/// cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationRecord {
    source: String,
    target: String,
    kind: RelationKind,
    field: Option<FieldDescriptor>,
    is_owner: bool,
}

impl RelationRecord {
    /// Classifies a field of `source`.
    ///
    /// A basic-typed outward reference is a `Ref`; an associated entity is
    /// `OneToMany` when repeated and `OneToOne` otherwise. Fields that carry
    /// neither annotation produce no relation.
    pub fn from_field(source: &str, field: &FieldDescriptor) -> Option<Self> {
        let annotations = &field.annotations;

        let (kind, target, is_owner) = if annotations.outward_ref && field.semantic_type.is_basic() {
            (RelationKind::Ref, field.ref_target()?, false)
        } else if annotations.is_associated_entity {
            let target = field
                .semantic_type
                .reference()
                .map(str::to_string)
                .or_else(|| annotations.ref_target.clone())?;
            let kind = if field.is_repeated {
                RelationKind::OneToMany
            } else {
                RelationKind::OneToOne
            };
            (kind, target, true)
        } else if annotations.outward_ref {
            (RelationKind::Ref, field.ref_target()?, false)
        } else {
            return None;
        };

        Some(Self {
            source: source.to_string(),
            target,
            kind,
            field: Some(field.clone()),
            is_owner,
        })
    }

    /// A mutual aggregate-level reference, owned by `source`.
    pub fn many_to_many(source: &str, target: &str) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            kind: RelationKind::ManyToMany,
            field: None,
            is_owner: true,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn field(&self) -> Option<&FieldDescriptor> {
        self.field.as_ref()
    }

    pub fn is_owner(&self) -> bool {
        self.is_owner
    }

    /// Whether this record mentions `aggregate` on either side.
    pub fn involves(&self, aggregate: &str) -> bool {
        self.source == aggregate || self.target == aggregate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JunctionKind {
    /// Synthesized association-only table.
    PureAssociation,
    /// The association is an aggregate of its own with a table of its own.
    BusinessAggregate,
}

/// Junction metadata for a many-to-many association.
///
/// Sides are ordered lexicographically by aggregate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JunctionTable {
    pub table_name: String,
    pub left_aggregate: String,
    pub right_aggregate: String,
    pub left_column: String,
    pub right_column: String,
    pub left_id_field: String,
    pub right_id_field: String,
    pub kind: JunctionKind,
}

impl JunctionTable {
    /// A synthesized table for the pair `a`/`b`; argument order does not matter.
    pub fn pure_association(a: &str, a_id: &str, b: &str, b_id: &str) -> Self {
        let ((left, left_id), (right, right_id)) = ordered((a, a_id), (b, b_id));
        let left_snake = to_snake_case(left);
        let right_snake = to_snake_case(right);
        Self {
            table_name: format!("{}_{}", left_snake, right_snake),
            left_aggregate: left.to_string(),
            right_aggregate: right.to_string(),
            left_column: format!("{}_id", left_snake),
            right_column: format!("{}_id", right_snake),
            left_id_field: left_id.to_string(),
            right_id_field: right_id.to_string(),
            kind: JunctionKind::PureAssociation,
        }
    }

    /// The association carried by the aggregate `owner`, which references
    /// both `a` and `b`.
    pub fn business_aggregate(owner: &str, a: &str, a_id: &str, b: &str, b_id: &str) -> Self {
        let ((left, left_id), (right, right_id)) = ordered((a, a_id), (b, b_id));
        Self {
            table_name: to_snake_case(owner),
            left_aggregate: left.to_string(),
            right_aggregate: right.to_string(),
            left_column: format!("{}_id", to_snake_case(left)),
            right_column: format!("{}_id", to_snake_case(right)),
            left_id_field: left_id.to_string(),
            right_id_field: right_id.to_string(),
            kind: JunctionKind::BusinessAggregate,
        }
    }

    /// Whether this junction joins `a` and `b`, in either order.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        (self.left_aggregate == a && self.right_aggregate == b)
            || (self.left_aggregate == b && self.right_aggregate == a)
    }
}

fn ordered<'a>(a: (&'a str, &'a str), b: (&'a str, &'a str)) -> ((&'a str, &'a str), (&'a str, &'a str)) {
    if a.0 <= b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicType, FieldAnnotations, SemanticType};

    #[test]
    fn test_basic_outward_ref_is_ref() {
        let field = FieldDescriptor::basic("CustomerID", BasicType::Int64).annotated(FieldAnnotations {
            outward_ref: true,
            ..Default::default()
        });
        let record = RelationRecord::from_field("Order", &field).unwrap();
        assert_eq!(record.kind(), RelationKind::Ref);
        assert_eq!(record.target(), "Customer");
        assert!(!record.is_owner());
    }

    #[test]
    fn test_associated_entity_shapes() {
        let entity = FieldAnnotations {
            is_associated_entity: true,
            ..Default::default()
        };
        let items = FieldDescriptor::new("Items", SemanticType::from_go("OrderItem"))
            .repeated()
            .annotated(entity.clone());
        let address = FieldDescriptor::new("Address", SemanticType::from_go("Address"))
            .optional()
            .annotated(entity);

        assert_eq!(
            RelationRecord::from_field("Order", &items).unwrap().kind(),
            RelationKind::OneToMany
        );
        let one = RelationRecord::from_field("Order", &address).unwrap();
        assert_eq!(one.kind(), RelationKind::OneToOne);
        assert_eq!(one.target(), "Address");
    }

    #[test]
    fn test_plain_field_has_no_relation() {
        let field = FieldDescriptor::new("Money", SemanticType::from_go("Money"));
        assert!(RelationRecord::from_field("Order", &field).is_none());
    }

    #[test]
    fn test_junction_naming_is_canonical() {
        let junction = JunctionTable::pure_association("User", "ID", "Role", "ID");
        assert_eq!(junction.table_name, "role_user");
        assert_eq!(junction.left_aggregate, "Role");
        assert_eq!(junction.left_column, "role_id");
        assert_eq!(junction.right_column, "user_id");
        assert!(junction.joins("User", "Role"));
    }

    #[test]
    fn test_business_junction_uses_owner_table() {
        let junction = JunctionTable::business_aggregate("UserRole", "User", "ID", "Role", "ID");
        assert_eq!(junction.table_name, "user_role");
        assert_eq!(junction.kind, JunctionKind::BusinessAggregate);
        assert_eq!(junction.left_aggregate, "Role");
    }
}
