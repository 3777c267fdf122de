//! MySQL DDL for every table of the model.
//!
//! Runs after the per-aggregate fan-out. An aggregate whose columns cannot
//! be mapped is left out of the file and reported on its own; the rest of
//! the schema is still written.

use super::go_types::{columns_of, identity, sql_type, table_name, Storage};
use super::{Artifact, ArtifactKind, GenerationContext, GenerationError, GenerationReason, ModelGenerator, Stage};
use crate::ir::{AggregateDescriptor, JunctionKind, JunctionTable, Registry};

const SQL_HEADER: &str = "-- Code generated by soliton. DO NOT EDIT.";
const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4";

pub struct SchemaGenerator;

impl ModelGenerator for SchemaGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::SchemaDdl
    }

    fn stage(&self) -> Stage {
        Stage::AfterFanOut
    }

    fn generate(&self, ctx: &GenerationContext) -> Vec<Result<Artifact, GenerationError>> {
        let registry = ctx.registry();
        let mut results = Vec::new();
        let mut tables = Vec::new();

        for aggregate in registry.get_all() {
            match create_table(aggregate) {
                Ok(ddl) => tables.push(ddl),
                Err(reason) => results.push(Err(GenerationError::new(
                    Some(aggregate.name()),
                    ArtifactKind::SchemaDdl,
                    reason,
                ))),
            }
        }
        for junction in registry.junctions() {
            if junction.kind == JunctionKind::PureAssociation {
                tables.push(create_junction(registry, junction));
            }
        }

        let mut content = String::from(SQL_HEADER);
        content.push('\n');
        for table in &tables {
            content.push('\n');
            content.push_str(table);
        }

        let path = ctx.domain_dir("sql").join("schema.sql");
        results.push(Ok(Artifact::create(ArtifactKind::SchemaDdl, path, content)));
        results
    }
}

fn create_table(aggregate: &AggregateDescriptor) -> Result<String, GenerationReason> {
    let identity = identity(aggregate)?;
    let columns = columns_of(aggregate)?;
    let table = table_name(aggregate);
    let id_basic = identity.basic();

    let mut lines = Vec::new();
    let id_definition = format!(
        "`{}` {} NOT NULL{}",
        identity.column(),
        sql_type(id_basic),
        if id_basic.is_integer() { " AUTO_INCREMENT" } else { "" }
    );
    if identity.field().is_none() {
        lines.push(id_definition.clone());
    }

    let mut keys = Vec::new();
    for (field, mapping) in &columns {
        if identity.field().is_some_and(|id| id.name == field.name) {
            lines.push(id_definition.clone());
            continue;
        }
        lines.push(format!(
            "`{}` {} {}",
            mapping.column,
            mapping.sql_type,
            if mapping.nullable { "NULL" } else { "NOT NULL" }
        ));
        if field.annotations.unique {
            keys.push(format!(
                "UNIQUE KEY `uk_{0}_{1}` (`{1}`)",
                table, mapping.column
            ));
        } else if field.annotations.indexed
            || field.annotations.outward_ref
            || mapping.storage == Storage::SoftDelete
        {
            keys.push(format!("KEY `idx_{0}_{1}` (`{1}`)", table, mapping.column));
        }
    }

    lines.push(format!("PRIMARY KEY (`{}`)", identity.column()));
    lines.extend(keys);
    Ok(render_table(&table, &lines))
}

fn create_junction(registry: &Registry, junction: &JunctionTable) -> String {
    let id_type = |aggregate: &str| {
        registry
            .get(aggregate)
            .ok()
            .and_then(|a| identity(a).ok())
            .map(|id| sql_type(id.basic()))
            .unwrap_or("BIGINT")
    };
    let lines = vec![
        format!("`{}` {} NOT NULL", junction.left_column, id_type(&junction.left_aggregate)),
        format!("`{}` {} NOT NULL", junction.right_column, id_type(&junction.right_aggregate)),
        format!(
            "PRIMARY KEY (`{}`, `{}`)",
            junction.left_column, junction.right_column
        ),
    ];
    render_table(&junction.table_name, &lines)
}

fn render_table(table: &str, lines: &[String]) -> String {
    let mut ddl = format!("CREATE TABLE IF NOT EXISTS `{}` (\n", table);
    ddl.push_str(
        &lines
            .iter()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    ddl.push_str(&format!("\n) {};\n", TABLE_OPTIONS));
    ddl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::order;
    use crate::codegen::GenerationContext;
    use crate::config::CompilerConfig;
    use crate::ir::{AggregateAnnotations, BasicType, FieldDescriptor, SemanticType};
    use std::sync::Arc;

    fn aggregate(name: &str, fields: Vec<FieldDescriptor>) -> AggregateDescriptor {
        AggregateDescriptor::new(name, fields, AggregateAnnotations::default())
    }

    fn context(registry: Registry) -> GenerationContext {
        GenerationContext::new(Arc::new(registry), &CompilerConfig::default())
    }

    #[test]
    fn test_order_table() {
        let ddl = create_table(&order()).unwrap();
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS `order` (\n  `id` BIGINT NOT NULL AUTO_INCREMENT,\n"));
        assert!(ddl.contains("  `order_no` VARCHAR(255) NOT NULL,\n"));
        assert!(ddl.contains("  `address` JSON NOT NULL,\n"));
        assert!(ddl.contains("  `deleted_at` DATETIME(3) NULL,\n"));
        assert!(ddl.contains("  PRIMARY KEY (`id`),\n  UNIQUE KEY `uk_order_order_no` (`order_no`),\n"));
        assert!(ddl.contains("KEY `idx_order_customer_id` (`customer_id`)"));
        assert!(ddl.ends_with("\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n"));
    }

    #[test]
    fn test_junction_table() {
        let mut registry = Registry::new();
        registry.register(aggregate("Role", vec![FieldDescriptor::basic("ID", BasicType::Int32)]));
        registry.register(aggregate("User", vec![FieldDescriptor::basic("ID", BasicType::Int64)]));
        registry.add_junction(JunctionTable::pure_association("User", "ID", "Role", "ID"));

        let results = SchemaGenerator.generate(&context(registry));
        assert_eq!(results.len(), 1);
        let content = &results[0].as_ref().unwrap().content;
        assert!(content.starts_with(SQL_HEADER));
        assert!(content.contains(
            "CREATE TABLE IF NOT EXISTS `role_user` (\n  `role_id` INT NOT NULL,\n  `user_id` BIGINT NOT NULL,\n  PRIMARY KEY (`role_id`, `user_id`)\n)"
        ));
    }

    #[test]
    fn test_unmappable_aggregate_is_omitted() {
        let mut registry = Registry::new();
        registry.register(aggregate(
            "Invoice",
            vec![
                FieldDescriptor::basic("ID", BasicType::Int64),
                FieldDescriptor::new("Total", SemanticType::from_go("Money")),
            ],
        ));
        registry.register(aggregate("Tag", vec![FieldDescriptor::basic("ID", BasicType::Int64)]));

        let results = SchemaGenerator.generate(&context(registry));
        assert_eq!(results.len(), 2);
        let failure = results[0].as_ref().unwrap_err();
        assert_eq!(failure.aggregate.as_deref(), Some("Invoice"));
        let content = &results[1].as_ref().unwrap().content;
        assert!(content.contains("`tag`"));
        assert!(!content.contains("`invoice`"));
    }
}
