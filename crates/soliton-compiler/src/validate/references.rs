//! Referential integrity of inferred relations.

use crate::diagnostic::RelationValidationError;
use crate::ir::{Registry, RelationKind};

/// Checks that every non-`Ref` relation targets a registered aggregate.
///
/// `Ref` targets are checked while the relation is inferred, so they are
/// skipped here.
pub fn validate_relations(registry: &Registry) -> Vec<RelationValidationError> {
    registry
        .relations()
        .iter()
        .filter(|r| r.kind() != RelationKind::Ref && !registry.exists(r.target()))
        .map(|r| RelationValidationError {
            aggregate: r.source().to_string(),
            field: r.field().map(|f| f.name.clone()),
            target: r.target().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AggregateAnnotations, AggregateDescriptor, FieldAnnotations, FieldDescriptor, RelationRecord, SemanticType};

    #[test]
    fn test_unknown_entity_target() {
        let items = FieldDescriptor::new("Items", SemanticType::from_go("OrderItem"))
            .repeated()
            .annotated(FieldAnnotations {
                is_associated_entity: true,
                ..Default::default()
            });
        let mut registry = Registry::new();
        registry.register(AggregateDescriptor::new("Order", vec![items.clone()], AggregateAnnotations::default()));
        registry.add_relation(RelationRecord::from_field("Order", &items).unwrap());

        let errors = validate_relations(&registry);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].aggregate, "Order");
        assert_eq!(errors[0].field.as_deref(), Some("Items"));
        assert_eq!(errors[0].target, "OrderItem");
    }
}
