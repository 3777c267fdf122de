//! Type mapping shared by every generator.
//!
//! [`column_mapping`] is the single table from field types to persisted
//! column types. The persisted-object, convertor and schema generators all
//! read it, so a column can never be typed one way in Go and another in SQL.

use std::collections::BTreeMap;

use super::GenerationReason;
use crate::ir::{AggregateDescriptor, BasicType, FieldDescriptor, SemanticType};
use crate::naming::to_column_name;

/// Header marking a file as generated.
pub const GENERATED_HEADER: &str = "// Code generated by soliton. DO NOT EDIT.";

/// The only value object strategy.
pub const JSON_STRATEGY: &str = "json";

/// Field name whose time column drives soft deletion.
pub const SOFT_DELETE_FIELD: &str = "DeletedAt";

/// How a column's value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Same Go type on both sides.
    Scalar,
    /// JSON-encoded into a text column.
    Json,
    /// `gorm.DeletedAt`, which turns deletes into soft deletes.
    SoftDelete,
}

/// Persisted representation of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub column: String,
    /// Go type of the persisted-object field.
    pub go_type: String,
    pub sql_type: &'static str,
    pub nullable: bool,
    pub storage: Storage,
}

/// SQL column type of a basic type.
pub const fn sql_type(basic: BasicType) -> &'static str {
    match basic {
        BasicType::Int | BasicType::Int64 => "BIGINT",
        BasicType::Int32 | BasicType::Rune => "INT",
        BasicType::Uint | BasicType::Uint64 => "BIGINT UNSIGNED",
        BasicType::Uint32 => "INT UNSIGNED",
        BasicType::Byte => "TINYINT UNSIGNED",
        BasicType::Float32 => "FLOAT",
        BasicType::Float64 => "DOUBLE",
        BasicType::String => "VARCHAR(255)",
        BasicType::Bool => "TINYINT(1)",
        BasicType::Time => "DATETIME(3)",
    }
}

/// Maps a field onto its column. `Ok(None)` for fields without a column
/// (transient fields and associated entities).
pub fn column_mapping(field: &FieldDescriptor) -> Result<Option<ColumnMapping>, GenerationReason> {
    if !field.is_column() {
        return Ok(None);
    }

    if field.annotations.is_value_object {
        if let Some(strategy) = &field.annotations.value_object_strategy {
            if strategy != JSON_STRATEGY {
                return Err(GenerationReason::UnsupportedStrategy {
                    field: field.name.clone(),
                    strategy: strategy.clone(),
                });
            }
        }
        return Ok(Some(json_column(field)));
    }

    if field.is_repeated {
        return Ok(Some(json_column(field)));
    }

    let SemanticType::Basic(basic) = &field.semantic_type else {
        return Err(GenerationReason::UnmappedType {
            field: field.name.clone(),
            type_name: field.semantic_type.to_string(),
        });
    };

    if field.name == SOFT_DELETE_FIELD && *basic == BasicType::Time {
        return Ok(Some(ColumnMapping {
            column: field.persisted_name.clone(),
            go_type: "gorm.DeletedAt".to_string(),
            sql_type: sql_type(*basic),
            nullable: true,
            storage: Storage::SoftDelete,
        }));
    }

    Ok(Some(ColumnMapping {
        column: field.persisted_name.clone(),
        go_type: model_go_type(field),
        sql_type: sql_type(*basic),
        nullable: field.is_optional,
        storage: Storage::Scalar,
    }))
}

fn json_column(field: &FieldDescriptor) -> ColumnMapping {
    ColumnMapping {
        column: field.persisted_name.clone(),
        go_type: "string".to_string(),
        sql_type: "JSON",
        nullable: field.is_optional,
        storage: Storage::Json,
    }
}

/// Every column of an aggregate, in declaration order, paired with its field.
pub fn columns_of(
    aggregate: &AggregateDescriptor,
) -> Result<Vec<(&FieldDescriptor, ColumnMapping)>, GenerationReason> {
    let mut columns = Vec::new();
    for field in aggregate.fields() {
        if let Some(mapping) = column_mapping(field)? {
            columns.push((field, mapping));
        }
    }
    Ok(columns)
}

/// Go type of the field as declared on the model struct.
pub fn model_go_type(field: &FieldDescriptor) -> String {
    let base = base_go_type(&field.semantic_type);
    match (field.is_repeated, field.is_optional) {
        (true, _) => format!("[]{}", base),
        (false, true) => format!("*{}", base),
        (false, false) => base,
    }
}

/// Element type without pointer or slice.
pub fn base_go_type(semantic_type: &SemanticType) -> String {
    match semantic_type {
        SemanticType::Basic(basic) => basic.go_name().to_string(),
        SemanticType::Reference(name) => name.clone(),
    }
}

/// Where an aggregate's identity column comes from.
#[derive(Debug, Clone, Copy)]
pub enum Identity<'a> {
    /// A declared integer field.
    Field(&'a FieldDescriptor, BasicType),
    /// Inherited from the embedded base entity as an `int64` `ID`.
    Inherited,
}

impl Identity<'_> {
    pub fn go_name(&self) -> &str {
        match self {
            Identity::Field(field, _) => &field.name,
            Identity::Inherited => "ID",
        }
    }

    pub fn column(&self) -> &str {
        match self {
            Identity::Field(field, _) => &field.persisted_name,
            Identity::Inherited => "id",
        }
    }

    pub fn basic(&self) -> BasicType {
        match self {
            Identity::Field(_, basic) => *basic,
            Identity::Inherited => BasicType::IDENTITY,
        }
    }

    /// The declared field, if the identity is not inherited.
    pub fn field(&self) -> Option<&FieldDescriptor> {
        match self {
            Identity::Field(field, _) => Some(field),
            Identity::Inherited => None,
        }
    }
}

/// Resolves the identity column of an aggregate.
pub fn identity(aggregate: &AggregateDescriptor) -> Result<Identity<'_>, GenerationReason> {
    match aggregate.id_field() {
        Some(field) => match field.semantic_type.basic() {
            Some(basic) if basic.is_integer() && !field.is_repeated => Ok(Identity::Field(field, basic)),
            _ => Err(GenerationReason::UnsupportedIdentity {
                field: field.name.clone(),
                type_name: field.semantic_type.to_string(),
            }),
        },
        None if aggregate.declares_base_entity() => Ok(Identity::Inherited),
        None => Err(GenerationReason::MissingIdentity),
    }
}

/// Storage table of an aggregate.
pub fn table_name(aggregate: &AggregateDescriptor) -> String {
    to_column_name(aggregate.name())
}

/// Builder for a generated Go source file with grouped imports.
#[derive(Debug)]
pub struct GoFile {
    package: String,
    /// Import path to optional alias.
    imports: BTreeMap<String, Option<String>>,
    body: String,
}

impl GoFile {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            imports: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn import(&mut self, path: &str) {
        self.imports.entry(path.to_string()).or_insert(None);
    }

    pub fn import_as(&mut self, alias: &str, path: &str) {
        self.imports.insert(path.to_string(), Some(alias.to_string()));
    }

    pub fn push_str(&mut self, code: &str) {
        self.body.push_str(code);
    }

    pub fn body_mut(&mut self) -> &mut String {
        &mut self.body
    }

    pub fn render(self) -> String {
        let mut output = String::new();
        output.push_str(GENERATED_HEADER);
        output.push_str("\n\n");
        output.push_str(&format!("package {}\n\n", self.package));

        if !self.imports.is_empty() {
            let (std, external): (Vec<_>, Vec<_>) = self
                .imports
                .iter()
                .partition(|(path, _)| is_std_import(path));

            output.push_str("import (\n");
            for (i, group) in [std, external].iter().filter(|g| !g.is_empty()).enumerate() {
                if i > 0 {
                    output.push('\n');
                }
                for (path, alias) in group {
                    match alias {
                        Some(alias) => output.push_str(&format!("\t{} \"{}\"\n", alias, path)),
                        None => output.push_str(&format!("\t\"{}\"\n", path)),
                    }
                }
            }
            output.push_str(")\n\n");
        }

        output.push_str(self.body.trim_end());
        output.push('\n');
        output
    }
}

/// Standard library paths have no dot in their first element.
fn is_std_import(path: &str) -> bool {
    !path.split('/').next().unwrap_or(path).contains('.')
}

/// Go expression that is true when `expr` (of the field's model type) holds
/// its zero value. `None` for struct-valued fields, which have no cheap
/// zero test.
pub fn zero_check(field: &FieldDescriptor, expr: &str) -> Option<String> {
    if field.is_repeated {
        return Some(format!("len({}) == 0", expr));
    }
    if field.is_optional {
        return Some(format!("{} == nil", expr));
    }
    match field.semantic_type.basic()? {
        BasicType::String => Some(format!("{} == \"\"", expr)),
        BasicType::Bool => None,
        BasicType::Time => Some(format!("{}.IsZero()", expr)),
        b if b.is_numeric() => Some(format!("{} == 0", expr)),
        _ => None,
    }
}
