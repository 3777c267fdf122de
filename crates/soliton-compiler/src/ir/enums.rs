//! Enumerations declared through field annotations.
//!
//! One enum per annotated field, named after the owning aggregate and field.

use serde::Serialize;

use super::AggregateDescriptor;

/// An enumeration collected from a field's `enum(...)` annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub owning_aggregate: String,
    pub owning_field: String,
    pub values: Vec<String>,
}

impl EnumDescriptor {
    /// Collects every enum declared on `aggregate`, in field order.
    ///
    /// Duplicate values keep their first position.
    pub fn collect_from(aggregate: &AggregateDescriptor) -> Vec<EnumDescriptor> {
        aggregate
            .fields()
            .iter()
            .filter(|f| !f.annotations.enum_values.is_empty())
            .map(|field| {
                let mut values: Vec<String> = Vec::with_capacity(field.annotations.enum_values.len());
                for value in &field.annotations.enum_values {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                EnumDescriptor {
                    name: format!("{}{}", aggregate.name(), field.name),
                    owning_aggregate: aggregate.name().to_string(),
                    owning_field: field.name.clone(),
                    values,
                }
            })
            .collect()
    }
}
