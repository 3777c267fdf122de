//! Convert Go AST to aggregate descriptors.

use tracing::debug;

use super::annotations::{self, Directive, DirectiveError, DIRECTIVE_PREFIX};
use super::ast::*;
use super::module;
use crate::diagnostic::{CompilerError, Span};
use crate::ir::{
    AggregateAnnotations, AggregateDescriptor, BasicType, FieldAnnotations, FieldDescriptor,
    GoModule, SemanticType, SourceOrigin,
};

/// Converts parsed Go files to aggregate descriptors.
///
/// Only structs whose doc comment carries `+soliton:aggregate` are
/// converted; directive errors elsewhere are ignored.
pub fn to_ir(
    files: &[ParsedFile],
    module: Option<&GoModule>,
) -> Result<Vec<AggregateDescriptor>, CompilerError> {
    let mut aggregates = Vec::new();

    for file in files {
        let import_path = match (module, file.path.parent()) {
            (Some(module), Some(dir)) => module::import_path(module, dir),
            _ => None,
        };

        for decl in &file.structs {
            if !is_aggregate(decl) {
                continue;
            }
            let origin = SourceOrigin {
                file: Some(file.path.clone()),
                package: Some(file.package.clone()),
                import_path: import_path.clone(),
                module: module.cloned(),
            };
            let aggregate = convert_struct(decl)?.with_origin(origin);
            debug!(
                aggregate = %aggregate.name(),
                fields = aggregate.fields().len(),
                file = %file.path.display(),
                "parsed aggregate"
            );
            aggregates.push(aggregate);
        }
    }

    Ok(aggregates)
}

fn is_aggregate(decl: &StructDecl) -> bool {
    let marker = format!("{}aggregate", DIRECTIVE_PREFIX);
    decl.doc.iter().any(|line| {
        line.text
            .match_indices(&marker)
            .any(|(pos, _)| {
                !line.text[pos + marker.len()..]
                    .starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_')
            })
    })
}

fn convert_struct(decl: &StructDecl) -> Result<AggregateDescriptor, CompilerError> {
    let mut annotations = AggregateAnnotations::default();

    for line in &decl.doc {
        let directives = annotations::scan(&line.text).map_err(|e| directive_error(e, &decl.span, line.line))?;
        for directive in directives {
            if !directive.is_aggregate_level() {
                return Err(CompilerError::MisplacedDirective {
                    directive: directive.name().to_string(),
                    target: format!("aggregate '{}'", decl.name),
                    file: decl.span.file.clone(),
                    line: line.line,
                });
            }
            match directive {
                Directive::BaseEntity(name) => annotations.base_entity_trait = Some(name),
                Directive::ManyToMany => annotations.is_junction_aggregate = true,
                Directive::Ref(Some(target)) => {
                    annotations.outward_refs.insert(target);
                }
                _ => {}
            }
        }
    }

    let mut fields = Vec::new();
    for field in &decl.fields {
        if field.is_embedded() {
            continue;
        }
        for name in &field.names {
            fields.push(convert_field(&decl.name, name, field)?);
        }
    }

    Ok(AggregateDescriptor::new(decl.name.clone(), fields, annotations))
}

fn convert_field(aggregate: &str, name: &str, field: &FieldDecl) -> Result<FieldDescriptor, CompilerError> {
    let (semantic_type, is_optional, is_repeated) = resolve_type(&field.type_expr);
    let mut descriptor = FieldDescriptor::new(name, semantic_type);
    descriptor.is_optional = is_optional;
    descriptor.is_repeated = is_repeated;

    let Some(tag) = field.tag.as_deref() else {
        return Ok(descriptor);
    };

    if let Some(column) = annotations::tag_value(tag, "db").filter(|c| !c.is_empty()) {
        let column = column.split(',').next().unwrap_or(column);
        descriptor = descriptor.persisted_as(column);
    }

    let directives = annotations::scan(tag).map_err(|e| directive_error(e, &field.span, field.span.line))?;
    let mut folded = FieldAnnotations::default();
    for directive in directives {
        if !directive.is_field_level() {
            return Err(CompilerError::MisplacedDirective {
                directive: directive.name().to_string(),
                target: format!("field '{}.{}'", aggregate, name),
                file: field.span.file.clone(),
                line: field.span.line,
            });
        }
        match directive {
            Directive::Ref(target) => {
                folded.outward_ref = true;
                if target.is_some() {
                    folded.ref_target = target;
                }
            }
            Directive::Unique => folded.unique = true,
            Directive::Required => folded.required = true,
            Directive::Entity => folded.is_associated_entity = true,
            Directive::ValueObject(strategy) => {
                folded.is_value_object = true;
                folded.value_object_strategy = strategy;
            }
            Directive::Index => folded.indexed = true,
            Directive::Enum(values) => folded.enum_values.extend(values),
            Directive::Aggregate | Directive::BaseEntity(_) | Directive::ManyToMany => {}
        }
    }

    Ok(descriptor.annotated(folded))
}

/// Resolves a field type into (semantic type, optional, repeated).
fn resolve_type(expr: &TypeExpr) -> (SemanticType, bool, bool) {
    match expr {
        TypeExpr::Pointer(inner) => {
            let (semantic, _, repeated) = resolve_type(inner);
            (semantic, true, repeated)
        }
        TypeExpr::Slice(inner) => {
            let (semantic, _, _) = resolve_type(inner);
            (semantic, false, true)
        }
        TypeExpr::Named { package: Some(package), name } if package == "time" && name == "Time" => {
            (SemanticType::Basic(BasicType::Time), false, false)
        }
        TypeExpr::Named { package: Some(_), name } => (SemanticType::Reference(name.clone()), false, false),
        TypeExpr::Named { package: None, name } => (SemanticType::from_go(name), false, false),
        TypeExpr::Other(text) => (SemanticType::Reference(text.clone()), false, false),
    }
}

fn directive_error(error: DirectiveError, span: &Span, line: usize) -> CompilerError {
    match error {
        DirectiveError::Unknown(directive) => CompilerError::UnknownDirective {
            directive,
            file: span.file.clone(),
            line,
        },
        DirectiveError::Malformed { directive, message } => CompilerError::MalformedDirective {
            directive,
            message,
            file: span.file.clone(),
            line,
        },
    }
}
