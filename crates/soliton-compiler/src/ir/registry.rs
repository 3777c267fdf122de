//! The metadata registry.

use std::collections::BTreeMap;
use std::path::Path;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

use super::{AggregateDescriptor, EnumDescriptor, JunctionTable, RelationRecord};

/// Lookup of an aggregate name that was never registered.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("aggregate `{0}` is not registered")]
#[diagnostic(code(soliton::registry::not_found))]
pub struct NotFound(pub String);

/// Owns every aggregate and everything derived from them.
///
/// Populated sequentially during analysis; shared read-only (behind an
/// `Arc`) once generation starts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Registry {
    aggregates: BTreeMap<String, AggregateDescriptor>,
    relations: Vec<RelationRecord>,
    junctions: Vec<JunctionTable>,
    enums: Vec<EnumDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an aggregate under its name. A previous descriptor with the
    /// same name is replaced, not merged, and returned.
    pub fn register(&mut self, descriptor: AggregateDescriptor) -> Option<AggregateDescriptor> {
        self.aggregates.insert(descriptor.name().to_string(), descriptor)
    }

    pub fn get(&self, name: &str) -> Result<&AggregateDescriptor, NotFound> {
        self.aggregates
            .get(name)
            .ok_or_else(|| NotFound(name.to_string()))
    }

    /// All aggregates, ordered by name.
    pub fn get_all(&self) -> impl Iterator<Item = &AggregateDescriptor> {
        self.aggregates.values()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.aggregates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }

    pub fn add_relation(&mut self, relation: RelationRecord) {
        self.relations.push(relation);
    }

    pub fn relations(&self) -> &[RelationRecord] {
        &self.relations
    }

    /// Relations in which `name` is the source or the target.
    pub fn relations_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RelationRecord> + 'a {
        self.relations.iter().filter(move |r| r.involves(name))
    }

    pub fn add_junction(&mut self, junction: JunctionTable) {
        self.junctions.push(junction);
    }

    pub fn junctions(&self) -> &[JunctionTable] {
        &self.junctions
    }

    /// Scans every registered aggregate for enumerated fields.
    ///
    /// Must run after all aggregates are registered; the enum set is
    /// rebuilt from scratch on every call.
    pub fn collect_enums(&mut self) -> &[EnumDescriptor] {
        self.enums = self
            .aggregates
            .values()
            .flat_map(EnumDescriptor::collect_from)
            .collect();
        &self.enums
    }

    pub fn enums(&self) -> &[EnumDescriptor] {
        &self.enums
    }

    /// Enum collected for `aggregate.field`, if any.
    pub fn enum_of(&self, aggregate: &str, field: &str) -> Option<&EnumDescriptor> {
        self.enums
            .iter()
            .find(|e| e.owning_aggregate == aggregate && e.owning_field == field)
    }

    /// Aggregates declared in `file`, ordered by name.
    pub fn aggregates_in_file<'a>(&'a self, file: &'a Path) -> impl Iterator<Item = &'a AggregateDescriptor> + 'a {
        self.aggregates
            .values()
            .filter(move |a| a.source_file() == Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{AggregateAnnotations, BasicType, FieldAnnotations, FieldDescriptor};

    fn aggregate(name: &str, fields: Vec<FieldDescriptor>) -> AggregateDescriptor {
        AggregateDescriptor::new(name, fields, AggregateAnnotations::default())
    }

    #[test]
    fn test_register_last_write_wins() {
        let mut registry = Registry::new();
        registry.register(aggregate("Order", vec![FieldDescriptor::basic("ID", BasicType::Int64)]));
        let replaced = registry.register(aggregate("Order", vec![FieldDescriptor::basic("Code", BasicType::String)]));

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        let order = registry.get("Order").unwrap();
        assert_eq!(order.fields().len(), 1);
        assert_eq!(order.fields()[0].name, "Code");
    }

    #[test]
    fn test_get_missing() {
        let registry = Registry::new();
        assert_eq!(registry.get("Ghost").unwrap_err(), NotFound("Ghost".to_string()));
        assert!(!registry.exists("Ghost"));
    }

    #[test]
    fn test_get_all_is_name_ordered() {
        let mut registry = Registry::new();
        registry.register(aggregate("User", vec![]));
        registry.register(aggregate("Order", vec![]));
        registry.register(aggregate("Role", vec![]));
        let names: Vec<_> = registry.get_all().map(|a| a.name()).collect();
        assert_eq!(names, ["Order", "Role", "User"]);
    }

    #[test]
    fn test_collect_enums_after_registration() {
        let status = FieldDescriptor::basic("Status", BasicType::String).annotated(FieldAnnotations {
            enum_values: vec!["PENDING".into(), "PAID".into()],
            ..Default::default()
        });
        let mut registry = Registry::new();
        registry.register(aggregate("Order", vec![status]));

        let enums = registry.collect_enums();
        assert_eq!(enums.len(), 1);
        assert_eq!(enums[0].name, "OrderStatus");
        assert_eq!(enums[0].values, ["PENDING", "PAID"]);

        registry.collect_enums();
        assert_eq!(registry.enums().len(), 1);
        assert!(registry.enum_of("Order", "Status").is_some());
    }
}
