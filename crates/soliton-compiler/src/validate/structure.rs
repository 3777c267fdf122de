//! Structure validation for aggregates.
//!
//! Rejects declarations generation could not map consistently onto
//! storage.

use std::collections::HashSet;

use crate::diagnostic::CompilerError;
use crate::ir::{AggregateDescriptor, Registry};

/// Validates every registered aggregate.
pub fn validate_structure(registry: &Registry) -> Result<(), CompilerError> {
    for aggregate in registry.get_all() {
        validate_aggregate_structure(aggregate)?;
    }
    Ok(())
}

fn validate_aggregate_structure(aggregate: &AggregateDescriptor) -> Result<(), CompilerError> {
    let mut columns = HashSet::new();
    for field in aggregate.columns() {
        if !columns.insert(field.persisted_name.as_str()) {
            return Err(CompilerError::DuplicateColumn {
                aggregate: aggregate.name().to_string(),
                column: field.persisted_name.clone(),
            });
        }
    }

    // Enum values are only meaningful on basic (string or integer) fields
    if let Some(field) = aggregate
        .fields()
        .iter()
        .find(|f| !f.annotations.enum_values.is_empty() && !f.semantic_type.is_basic())
    {
        return Err(CompilerError::EnumOnReference {
            aggregate: aggregate.name().to_string(),
            field: field.name.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AggregateAnnotations, BasicType, FieldAnnotations, FieldDescriptor, SemanticType};

    fn registry_with(fields: Vec<FieldDescriptor>) -> Registry {
        let mut registry = Registry::new();
        registry.register(AggregateDescriptor::new("Order", fields, AggregateAnnotations::default()));
        registry
    }

    #[test]
    fn test_duplicate_column() {
        let registry = registry_with(vec![
            FieldDescriptor::basic("ID", BasicType::Int64),
            FieldDescriptor::basic("Key", BasicType::String).persisted_as("id"),
        ]);
        assert!(matches!(
            validate_structure(&registry),
            Err(CompilerError::DuplicateColumn { ref column, .. }) if column == "id"
        ));
    }

    #[test]
    fn test_transient_fields_do_not_collide() {
        let registry = registry_with(vec![
            FieldDescriptor::basic("ID", BasicType::Int64),
            FieldDescriptor::basic("A", BasicType::String).persisted_as("-"),
            FieldDescriptor::basic("B", BasicType::String).persisted_as("-"),
        ]);
        assert!(validate_structure(&registry).is_ok());
    }

    #[test]
    fn test_enum_on_reference() {
        let registry = registry_with(vec![FieldDescriptor::new("State", SemanticType::from_go("Money"))
            .annotated(FieldAnnotations {
                enum_values: vec!["A".into()],
                ..Default::default()
            })]);
        assert!(matches!(
            validate_structure(&registry),
            Err(CompilerError::EnumOnReference { .. })
        ));
    }
}
