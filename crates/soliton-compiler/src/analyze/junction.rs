//! Junction table synthesis.

use crate::ir::{JunctionTable, Registry, RelationKind};

/// Identity field name assumed for an aggregate without one.
const DEFAULT_ID_FIELD: &str = "ID";

/// Builds junction metadata from the registry's relations and flags.
///
/// One pure association per many-to-many relation, then one business
/// junction per junction-flagged aggregate that references exactly two
/// registered aggregates.
pub fn synthesize(registry: &Registry) -> Vec<JunctionTable> {
    let mut tables = Vec::new();

    for relation in registry.relations() {
        if relation.kind() != RelationKind::ManyToMany {
            continue;
        }
        let left = relation.source();
        let right = relation.target();
        if tables.iter().any(|t: &JunctionTable| t.joins(left, right)) {
            continue;
        }
        tables.push(JunctionTable::pure_association(
            left,
            &id_field_of(registry, left),
            right,
            &id_field_of(registry, right),
        ));
    }

    for aggregate in registry.get_all() {
        if !aggregate.annotations().is_junction_aggregate {
            continue;
        }
        let refs: Vec<&String> = aggregate.annotations().outward_refs.iter().collect();
        if let [a, b] = refs.as_slice() {
            if registry.exists(a) && registry.exists(b) {
                tables.push(JunctionTable::business_aggregate(
                    aggregate.name(),
                    a,
                    &id_field_of(registry, a),
                    b,
                    &id_field_of(registry, b),
                ));
            }
        }
    }

    tables
}

fn id_field_of(registry: &Registry, name: &str) -> String {
    registry
        .get(name)
        .ok()
        .and_then(|a| a.id_field())
        .map(|f| f.name.clone())
        .unwrap_or_else(|| DEFAULT_ID_FIELD.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AggregateAnnotations, AggregateDescriptor, BasicType, FieldDescriptor, RelationRecord};

    #[test]
    fn test_id_fields_follow_selection() {
        let mut registry = Registry::new();
        registry.register(AggregateDescriptor::new(
            "Tag",
            vec![FieldDescriptor::basic("TagID", BasicType::Int64)],
            AggregateAnnotations::default(),
        ));
        registry.register(AggregateDescriptor::new("Post", vec![], AggregateAnnotations::default()));
        registry.add_relation(RelationRecord::many_to_many("Post", "Tag"));

        let tables = synthesize(&registry);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].table_name, "post_tag");
        assert_eq!(tables[0].left_id_field, "ID");
        assert_eq!(tables[0].right_id_field, "TagID");
    }
}
