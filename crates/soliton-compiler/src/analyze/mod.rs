//! Phase A: registry population and relation analysis.
//!
//! Runs sequentially on a single task. Classifying one aggregate's fields
//! can depend on annotations declared by any other aggregate, so the whole
//! model is registered before inference starts.

mod junction;
mod relations;

pub use relations::RelationAnalyzer;

use tracing::{info, warn};

use crate::config::RelationPolicy;
use crate::diagnostic::{CompilerError, RelationValidationError};
use crate::ir::{AggregateDescriptor, Registry};
use crate::validate;

/// The finished model handed to generation.
#[derive(Debug)]
pub struct Analysis {
    pub registry: Registry,
    /// Referential-integrity failures. Non-empty only under
    /// [`RelationPolicy::Advisory`].
    pub validation: Vec<RelationValidationError>,
}

/// Runs populate, structure checks, inference, junction synthesis,
/// validation and enum collection, in that order.
pub fn analyze_model(
    aggregates: Vec<AggregateDescriptor>,
    policy: RelationPolicy,
) -> Result<Analysis, CompilerError> {
    if aggregates.is_empty() {
        return Err(CompilerError::NoAggregates);
    }

    let mut registry = Registry::new();
    for aggregate in aggregates {
        let name = aggregate.name().to_string();
        if let Some(previous) = registry.register(aggregate) {
            warn!(
                aggregate = %name,
                previous = ?previous.source_file(),
                "aggregate declared twice, keeping the last declaration"
            );
        }
    }
    info!(aggregates = registry.len(), "registry populated");

    validate::validate_structure(&registry)?;

    let mut analyzer = RelationAnalyzer::new(&mut registry);
    analyzer.analyze_relations();
    analyzer.synthesize_junctions();
    analyzer.validate_relations();
    let validation = analyzer.into_failures();

    let enums = registry.collect_enums().len();
    info!(
        relations = registry.relations().len(),
        junctions = registry.junctions().len(),
        enums,
        failures = validation.len(),
        "relation analysis complete"
    );

    if policy == RelationPolicy::Strict && !validation.is_empty() {
        return Err(CompilerError::RelationValidationFailed { errors: validation });
    }

    Ok(Analysis { registry, validation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AggregateAnnotations, BasicType, FieldAnnotations, FieldDescriptor};

    fn order_with_dangling_ref() -> AggregateDescriptor {
        AggregateDescriptor::new(
            "Order",
            vec![
                FieldDescriptor::basic("ID", BasicType::Int64),
                FieldDescriptor::basic("WarehouseID", BasicType::Int64).annotated(FieldAnnotations {
                    outward_ref: true,
                    ..Default::default()
                }),
            ],
            AggregateAnnotations::default(),
        )
    }

    #[test]
    fn test_empty_model() {
        assert!(matches!(
            analyze_model(vec![], RelationPolicy::Advisory),
            Err(CompilerError::NoAggregates)
        ));
    }

    #[test]
    fn test_advisory_keeps_going() {
        let analysis = analyze_model(vec![order_with_dangling_ref()], RelationPolicy::Advisory).unwrap();
        assert_eq!(analysis.validation.len(), 1);
        assert_eq!(analysis.registry.relations().len(), 1);
    }

    #[test]
    fn test_strict_is_fatal() {
        let err = analyze_model(vec![order_with_dangling_ref()], RelationPolicy::Strict).unwrap_err();
        match err {
            CompilerError::RelationValidationFailed { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].target, "Warehouse");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_enums_collected_after_registration() {
        let status = FieldDescriptor::basic("Status", BasicType::String).annotated(FieldAnnotations {
            enum_values: vec!["OPEN".into(), "CLOSED".into()],
            ..Default::default()
        });
        let ticket = AggregateDescriptor::new(
            "Ticket",
            vec![FieldDescriptor::basic("ID", BasicType::Int64), status],
            AggregateAnnotations::default(),
        );
        let analysis = analyze_model(vec![ticket], RelationPolicy::Advisory).unwrap();
        assert_eq!(analysis.registry.enums().len(), 1);
        assert_eq!(analysis.registry.enums()[0].name, "TicketStatus");
    }
}
