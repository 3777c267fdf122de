//! Relation inference over a populated registry.

use tracing::{debug, warn};

use super::junction;
use crate::diagnostic::RelationValidationError;
use crate::ir::{Registry, RelationKind, RelationRecord};
use crate::validate;

/// Infers relations, synthesizes junction tables and validates targets.
///
/// Referential-integrity failures are collected, never returned early.
pub struct RelationAnalyzer<'r> {
    registry: &'r mut Registry,
    failures: Vec<RelationValidationError>,
}

impl<'r> RelationAnalyzer<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            failures: Vec::new(),
        }
    }

    /// Classifies every field-level association and detects mutual
    /// aggregate-level references.
    pub fn analyze_relations(&mut self) {
        let mut inferred = Vec::new();

        for aggregate in self.registry.get_all() {
            for field in aggregate.fields() {
                let Some(record) = RelationRecord::from_field(aggregate.name(), field) else {
                    continue;
                };
                // Dangling refs are reported but still recorded under the
                // unresolved name.
                if record.kind() == RelationKind::Ref && !self.registry.exists(record.target()) {
                    self.failures.push(RelationValidationError {
                        aggregate: aggregate.name().to_string(),
                        field: Some(field.name.clone()),
                        target: record.target().to_string(),
                    });
                }
                debug!(
                    source = %record.source(),
                    target = %record.target(),
                    kind = %record.kind(),
                    "inferred relation"
                );
                inferred.push(record);
            }

            for target in &aggregate.annotations().outward_refs {
                let Ok(target_aggregate) = self.registry.get(target) else {
                    self.failures.push(RelationValidationError {
                        aggregate: aggregate.name().to_string(),
                        field: None,
                        target: target.clone(),
                    });
                    continue;
                };

                let mutual = target_aggregate
                    .annotations()
                    .outward_refs
                    .contains(aggregate.name());
                let either_flagged = aggregate.annotations().is_junction_aggregate
                    || target_aggregate.annotations().is_junction_aggregate;

                // Only the lexicographically smaller side records the pair
                if mutual && !either_flagged && aggregate.name() < target.as_str() {
                    debug!(source = %aggregate.name(), target = %target, "inferred many-to-many");
                    inferred.push(RelationRecord::many_to_many(aggregate.name(), target));
                }
            }
        }

        for record in inferred {
            self.registry.add_relation(record);
        }
    }

    /// Creates junction metadata for every many-to-many relation and every
    /// junction-flagged aggregate.
    pub fn synthesize_junctions(&mut self) {
        let junctions = junction::synthesize(self.registry);
        for table in junctions {
            debug!(table = %table.table_name, kind = ?table.kind, "synthesized junction");
            self.registry.add_junction(table);
        }
    }

    /// Checks that non-`Ref` relations point at registered aggregates.
    pub fn validate_relations(&mut self) {
        self.failures.extend(validate::validate_relations(self.registry));
    }

    /// Every failure collected so far, in discovery order.
    pub fn into_failures(self) -> Vec<RelationValidationError> {
        for failure in &self.failures {
            warn!(
                aggregate = %failure.aggregate,
                field = failure.field.as_deref().unwrap_or("-"),
                target = %failure.target,
                "reference to unknown aggregate"
            );
        }
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::ir::{
        AggregateAnnotations, AggregateDescriptor, BasicType, FieldAnnotations, FieldDescriptor,
        JunctionKind,
    };

    fn id() -> FieldDescriptor {
        FieldDescriptor::basic("ID", BasicType::Int64)
    }

    fn with_refs(name: &str, refs: &[&str], junction: bool) -> AggregateDescriptor {
        AggregateDescriptor::new(
            name,
            vec![id()],
            AggregateAnnotations {
                base_entity_trait: None,
                is_junction_aggregate: junction,
                outward_refs: refs.iter().map(|r| r.to_string()).collect::<BTreeSet<_>>(),
            },
        )
    }

    fn analyze(registry: &mut Registry) -> Vec<RelationValidationError> {
        let mut analyzer = RelationAnalyzer::new(registry);
        analyzer.analyze_relations();
        analyzer.synthesize_junctions();
        analyzer.validate_relations();
        analyzer.into_failures()
    }

    #[test]
    fn test_mutual_refs_yield_single_junction() {
        let mut registry = Registry::new();
        registry.register(with_refs("User", &["Role"], false));
        registry.register(with_refs("Role", &["User"], false));

        let failures = analyze(&mut registry);
        assert!(failures.is_empty());

        let many: Vec<_> = registry
            .relations()
            .iter()
            .filter(|r| r.kind() == RelationKind::ManyToMany)
            .collect();
        assert_eq!(many.len(), 1);
        assert_eq!(many[0].source(), "Role");

        assert_eq!(registry.junctions().len(), 1);
        let junction = &registry.junctions()[0];
        assert_eq!(junction.table_name, "role_user");
        assert_eq!(junction.left_column, "role_id");
        assert_eq!(junction.right_column, "user_id");
        assert_eq!(junction.kind, JunctionKind::PureAssociation);
    }

    #[test]
    fn test_one_way_ref_is_not_many_to_many() {
        let mut registry = Registry::new();
        registry.register(with_refs("User", &["Role"], false));
        registry.register(with_refs("Role", &[], false));

        assert!(analyze(&mut registry).is_empty());
        assert!(registry.relations().is_empty());
        assert!(registry.junctions().is_empty());
    }

    #[test]
    fn test_flagged_aggregate_never_pure_junction() {
        let mut registry = Registry::new();
        registry.register(with_refs("User", &["Role", "UserRole"], false));
        registry.register(with_refs("Role", &["User", "UserRole"], false));
        registry.register(with_refs("UserRole", &["User", "Role"], true));

        analyze(&mut registry);

        let kinds: Vec<_> = registry
            .junctions()
            .iter()
            .map(|j| (j.table_name.as_str(), j.kind))
            .collect();
        assert_eq!(
            kinds,
            [
                ("role_user", JunctionKind::PureAssociation),
                ("user_role", JunctionKind::BusinessAggregate),
            ]
        );
    }

    #[test]
    fn test_missing_aggregate_ref_is_collected() {
        let mut registry = Registry::new();
        registry.register(with_refs("User", &["Team"], false));

        let failures = analyze(&mut registry);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].aggregate, "User");
        assert_eq!(failures[0].field, None);
        assert_eq!(failures[0].target, "Team");
    }

    #[test]
    fn test_dangling_field_ref_still_recorded() {
        let warehouse = FieldDescriptor::basic("WarehouseID", BasicType::Int64).annotated(FieldAnnotations {
            outward_ref: true,
            ..Default::default()
        });
        let mut registry = Registry::new();
        registry.register(AggregateDescriptor::new(
            "Order",
            vec![id(), warehouse],
            AggregateAnnotations::default(),
        ));

        let failures = analyze(&mut registry);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].aggregate, "Order");
        assert_eq!(failures[0].field.as_deref(), Some("WarehouseID"));
        assert_eq!(failures[0].target, "Warehouse");

        assert_eq!(registry.relations().len(), 1);
        assert_eq!(registry.relations()[0].kind(), RelationKind::Ref);
        assert_eq!(registry.relations()[0].target(), "Warehouse");
    }
}
