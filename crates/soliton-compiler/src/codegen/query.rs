//! Typed query fields.
//!
//! `field_types.go` holds the generic field and condition types once per
//! model; every aggregate then gets a table of its queryable columns.

use super::go_types::{base_go_type, columns_of, identity, table_name, GoFile, Storage};
use super::{
    AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationError, GenerationReason,
    ModelGenerator, Stage,
};
use crate::ir::{AggregateDescriptor, BasicType};

const FIELD_TYPES: &str = r#"// Condition is one WHERE clause with its arguments.
type Condition struct {
	Expr string
	Args []any
}

// Apply narrows db by the condition.
func (c Condition) Apply(db *gorm.DB) *gorm.DB {
	return db.Where(c.Expr, c.Args...)
}

// Field is a typed column reference.
type Field[T any] struct {
	column string
}

func NewField[T any](column string) Field[T] {
	return Field[T]{column: column}
}

func (f Field[T]) Column() string {
	return f.column
}

func (f Field[T]) Eq(v T) Condition {
	return Condition{Expr: f.column + " = ?", Args: []any{v}}
}

func (f Field[T]) Neq(v T) Condition {
	return Condition{Expr: f.column + " <> ?", Args: []any{v}}
}

func (f Field[T]) In(vs ...T) Condition {
	return Condition{Expr: f.column + " IN ?", Args: []any{vs}}
}

func (f Field[T]) Gt(v T) Condition {
	return Condition{Expr: f.column + " > ?", Args: []any{v}}
}

func (f Field[T]) Lt(v T) Condition {
	return Condition{Expr: f.column + " < ?", Args: []any{v}}
}

func (f Field[T]) IsNull() Condition {
	return Condition{Expr: f.column + " IS NULL"}
}

// StringField adds pattern matching to Field[string].
type StringField struct {
	Field[string]
}

func NewStringField(column string) StringField {
	return StringField{Field: NewField[string](column)}
}

func (f StringField) Like(pattern string) Condition {
	return Condition{Expr: f.column + " LIKE ?", Args: []any{pattern}}
}
"#;

/// Writes `field_types.go` ahead of the per-aggregate tables.
pub struct FieldTypesGenerator;

impl ModelGenerator for FieldTypesGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::QueryField
    }

    fn stage(&self) -> Stage {
        Stage::BeforeFanOut
    }

    fn generate(&self, ctx: &GenerationContext) -> Vec<Result<Artifact, GenerationError>> {
        let mut file = GoFile::new("query");
        file.import("gorm.io/gorm");
        file.push_str(FIELD_TYPES);
        let path = ctx.infrastructure_dir("query").join("field_types.go");
        vec![Ok(Artifact::create(ArtifactKind::QueryField, path, file.render()))]
    }
}

pub struct QueryFieldGenerator;

impl AggregateGenerator for QueryFieldGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::QueryField
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let path = ctx
            .infrastructure_dir("query")
            .join(format!("{}_fields.go", table_name(aggregate)));
        Ok(vec![Artifact::create(ArtifactKind::QueryField, path, render(aggregate)?)])
    }
}

/// `(field name, field type, constructor call)` of each queryable column.
fn entries(aggregate: &AggregateDescriptor) -> Result<Vec<(String, String, String)>, GenerationReason> {
    let identity = identity(aggregate)?;
    let columns = columns_of(aggregate)?;

    let mut entries = Vec::new();
    if identity.field().is_none() {
        entries.push(typed_entry(identity.go_name(), identity.basic().go_name(), identity.column()));
    }
    for (field, mapping) in &columns {
        if mapping.storage != Storage::Scalar {
            continue;
        }
        if field.semantic_type.basic() == Some(BasicType::String) {
            entries.push((
                field.name.clone(),
                "StringField".to_string(),
                format!("NewStringField(\"{}\")", mapping.column),
            ));
        } else {
            entries.push(typed_entry(&field.name, &base_go_type(&field.semantic_type), &mapping.column));
        }
    }
    Ok(entries)
}

fn typed_entry(name: &str, go_type: &str, column: &str) -> (String, String, String) {
    (
        name.to_string(),
        format!("Field[{}]", go_type),
        format!("NewField[{}](\"{}\")", go_type, column),
    )
}

fn render(aggregate: &AggregateDescriptor) -> Result<String, GenerationReason> {
    let entries = entries(aggregate)?;
    let name = aggregate.name();

    let mut file = GoFile::new("query");
    if entries.iter().any(|(_, ty, _)| ty.contains("time.")) {
        file.import("time");
    }

    let width = entries.iter().map(|(n, _, _)| n.len()).max().unwrap_or(0);
    let out = file.body_mut();
    out.push_str(&format!("// {0}Fields lists the queryable columns of {0}.\n", name));
    out.push_str(&format!("var {}Fields = struct {{\n", name));
    for (field, ty, _) in &entries {
        out.push_str(&format!("\t{:<w$} {}\n", field, ty, w = width));
    }
    out.push_str("}{\n");
    for (field, _, init) in &entries {
        out.push_str(&format!("\t{:<w$} {},\n", format!("{}:", field), init, w = width + 1));
    }
    out.push_str("}\n");

    Ok(file.render())
}
