//! Persisted objects: the gorm-tagged row structs.

use super::go_types::{columns_of, identity, sql_type, table_name, ColumnMapping, GoFile, Identity, Storage};
use super::{AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationReason};
use crate::ir::{AggregateDescriptor, FieldDescriptor};

pub struct PersistedObjectGenerator;

impl AggregateGenerator for PersistedObjectGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::PersistedObject
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let content = render(aggregate)?;
        let path = ctx
            .infrastructure_dir("do")
            .join(format!("{}_do.go", table_name(aggregate)));
        Ok(vec![Artifact::create(ArtifactKind::PersistedObject, path, content)])
    }
}

/// `(field name, Go type, gorm tag)` of every persisted column.
fn rows(aggregate: &AggregateDescriptor) -> Result<Vec<(String, String, String)>, GenerationReason> {
    let identity = identity(aggregate)?;
    let columns = columns_of(aggregate)?;

    let mut rows = Vec::with_capacity(columns.len() + 1);
    if let Identity::Inherited = identity {
        rows.push((
            identity.go_name().to_string(),
            identity.basic().go_name().to_string(),
            format!(
                "column:{};type:{};primaryKey;autoIncrement",
                identity.column(),
                sql_type(identity.basic())
            ),
        ));
    }

    for (field, mapping) in &columns {
        let is_id = identity.field().is_some_and(|id| id.name == field.name);
        if is_id {
            rows.push((
                field.name.clone(),
                identity.basic().go_name().to_string(),
                format!(
                    "column:{};type:{};primaryKey;autoIncrement",
                    mapping.column, mapping.sql_type
                ),
            ));
        } else {
            rows.push((field.name.clone(), mapping.go_type.clone(), gorm_tag(field, mapping)));
        }
    }
    Ok(rows)
}

fn gorm_tag(field: &FieldDescriptor, mapping: &ColumnMapping) -> String {
    let mut parts = vec![format!("column:{}", mapping.column), format!("type:{}", mapping.sql_type)];
    if !mapping.nullable {
        parts.push("not null".to_string());
    }
    if field.annotations.unique {
        parts.push("uniqueIndex".to_string());
    } else if field.annotations.indexed || field.annotations.outward_ref {
        parts.push("index".to_string());
    }
    parts.join(";")
}

fn render(aggregate: &AggregateDescriptor) -> Result<String, GenerationReason> {
    let rows = rows(aggregate)?;
    let columns = columns_of(aggregate)?;
    let name = aggregate.name();

    let mut file = GoFile::new("do");
    if columns.iter().any(|(_, m)| m.storage == Storage::SoftDelete) {
        file.import("gorm.io/gorm");
    }
    if columns.iter().any(|(_, m)| m.go_type.contains("time.")) {
        file.import("time");
    }

    let name_width = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    let type_width = rows.iter().map(|r| r.1.len()).max().unwrap_or(0);

    let out = file.body_mut();
    out.push_str(&format!("// {0}DO is the persisted row of {0}.\n", name));
    out.push_str(&format!("type {}DO struct {{\n", name));
    for (field, go_type, tag) in &rows {
        out.push_str(&format!(
            "\t{:<nw$} {:<tw$} `gorm:\"{}\"`\n",
            field,
            go_type,
            tag,
            nw = name_width,
            tw = type_width
        ));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("func ({}DO) TableName() string {{\n", name));
    out.push_str(&format!("\treturn \"{}\"\n}}\n", table_name(aggregate)));

    Ok(file.render())
}
