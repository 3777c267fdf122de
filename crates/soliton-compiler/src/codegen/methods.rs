//! Extension accessors shared by the repository and service generators.

use super::go_types::base_go_type;
use crate::ir::{AggregateDescriptor, FieldDescriptor};
use crate::naming::lower_first;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    /// `GetBy<Field>`: at most one row.
    GetBy,
    /// `FindBy<Field>`: every matching row.
    FindBy,
}

/// An accessor derived from one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor<'a> {
    pub field: &'a FieldDescriptor,
    pub kind: AccessorKind,
    pub method: String,
    pub param: String,
    pub param_type: String,
}

/// Derives at most one accessor per field.
///
/// `unique` yields a single-object getter; otherwise `indexed` or an
/// outward reference yields a list getter. Only scalar columns qualify.
pub fn extension_accessors(aggregate: &AggregateDescriptor) -> Vec<Accessor<'_>> {
    let id = aggregate.id_field().map(|f| f.name.as_str());

    aggregate
        .fields()
        .iter()
        .filter(|f| Some(f.name.as_str()) != id)
        .filter(|f| f.is_column() && !f.is_repeated && !f.annotations.is_value_object)
        .filter(|f| f.semantic_type.is_basic())
        .filter_map(|field| {
            let annotations = &field.annotations;
            let kind = if annotations.unique {
                AccessorKind::GetBy
            } else if annotations.indexed || annotations.outward_ref {
                AccessorKind::FindBy
            } else {
                return None;
            };
            let prefix = match kind {
                AccessorKind::GetBy => "GetBy",
                AccessorKind::FindBy => "FindBy",
            };
            Some(Accessor {
                field,
                kind,
                method: format!("{}{}", prefix, field.name),
                param: go_param_name(&field.name),
                param_type: base_go_type(&field.semantic_type),
            })
        })
        .collect()
}

const GO_KEYWORDS: [&str; 25] = [
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return", "select",
    "struct", "switch", "type", "var",
];

/// Lower-camel parameter name that is never a Go keyword and never
/// shadows the `ctx` parameter.
fn go_param_name(field: &str) -> String {
    let name = lower_first(field);
    if name == "ctx" || GO_KEYWORDS.contains(&name.as_str()) {
        format!("{}Value", name)
    } else {
        name
    }
}

/// The interface method signature of an accessor, without a receiver.
pub fn signature(accessor: &Accessor<'_>, entity: &str) -> String {
    let result = match accessor.kind {
        AccessorKind::GetBy => format!("(*{}, error)", entity),
        AccessorKind::FindBy => format!("([]*{}, error)", entity),
    };
    format!(
        "{}(ctx context.Context, {} {}) {}",
        accessor.method, accessor.param, accessor.param_type, result
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::order;
    use crate::ir::{AggregateAnnotations, BasicType, FieldAnnotations};

    #[test]
    fn test_accessors_for_order() {
        let order = order();
        let accessors = extension_accessors(&order);
        let methods: Vec<_> = accessors.iter().map(|a| a.method.as_str()).collect();
        assert_eq!(methods, ["GetByOrderNo", "FindByCustomerID"]);
        assert_eq!(accessors[1].param, "customerID");
        assert_eq!(
            signature(&accessors[0], "model.Order"),
            "GetByOrderNo(ctx context.Context, orderNo string) (*model.Order, error)"
        );
    }

    #[test]
    fn test_one_accessor_per_field() {
        let field = FieldDescriptor::basic("Email", BasicType::String).annotated(FieldAnnotations {
            unique: true,
            indexed: true,
            outward_ref: true,
            ..Default::default()
        });
        let user = AggregateDescriptor::new(
            "User",
            vec![FieldDescriptor::basic("ID", BasicType::Int64), field],
            AggregateAnnotations::default(),
        );
        let accessors = extension_accessors(&user);
        assert_eq!(accessors.len(), 1);
        assert_eq!(accessors[0].kind, AccessorKind::GetBy);
    }

    #[test]
    fn test_keyword_param() {
        assert_eq!(go_param_name("Type"), "typeValue");
        assert_eq!(go_param_name("OrderNo"), "orderNo");
        for field in ["If", "Else", "For", "Switch", "Break", "Continue", "Goto", "Defer", "Fallthrough"] {
            assert_eq!(go_param_name(field), format!("{}Value", field.to_lowercase()));
        }
        assert_eq!(go_param_name("Ctx"), "ctxValue");
        assert_eq!(go_param_name("Format"), "format");
    }

    #[test]
    fn test_keyword_field_signature() {
        let field = FieldDescriptor::basic("For", BasicType::String).annotated(FieldAnnotations {
            unique: true,
            ..Default::default()
        });
        let slot = AggregateDescriptor::new(
            "Slot",
            vec![FieldDescriptor::basic("ID", BasicType::Int64), field],
            AggregateAnnotations::default(),
        );
        let accessors = extension_accessors(&slot);
        assert_eq!(
            signature(&accessors[0], "model.Slot"),
            "GetByFor(ctx context.Context, forValue string) (*model.Slot, error)"
        );
    }
}
