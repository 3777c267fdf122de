//! Convertors between domain aggregates and persisted rows.

use super::go_types::{columns_of, identity, table_name, GoFile, Identity, Storage};
use super::{AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationReason};
use crate::ir::{AggregateDescriptor, BasicType, FieldDescriptor};

pub struct ConvertorGenerator;

impl AggregateGenerator for ConvertorGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Convertor
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let (model_import, model_pkg) = ctx.model_package(aggregate);
        let do_import = ctx.import_path(&ctx.infrastructure_dir("do"));

        let mut file = GoFile::new("convertor");
        file.import(&model_import);
        file.import(&do_import);
        render(&mut file, aggregate, &model_pkg)?;

        let path = ctx
            .infrastructure_dir("convertor")
            .join(format!("{}_convertor.go", table_name(aggregate)));
        Ok(vec![Artifact::create(ArtifactKind::Convertor, path, file.render())])
    }
}

fn render(file: &mut GoFile, aggregate: &AggregateDescriptor, model_pkg: &str) -> Result<(), GenerationReason> {
    let identity = identity(aggregate)?;
    let columns: Vec<_> = columns_of(aggregate)?
        .into_iter()
        .filter(|(field, _)| identity.field().map_or(true, |id| id.name != field.name))
        .collect();

    if columns.iter().any(|(_, m)| m.storage == Storage::Json) {
        file.import("encoding/json");
    }
    if columns.iter().any(|(_, m)| m.storage == Storage::SoftDelete) {
        file.import("gorm.io/gorm");
    }

    let name = aggregate.name();
    let model = format!("{}.{}", model_pkg, name);
    let row = format!("do.{}DO", name);
    let width = columns
        .iter()
        .filter(|(_, m)| m.storage == Storage::Scalar)
        .map(|(f, _)| f.name.len() + 1)
        .max()
        .unwrap_or(0);

    let out = file.body_mut();

    out.push_str(&format!("// {0}ToDO converts a domain {0} into its persisted row.\n", name));
    out.push_str(&format!("func {}ToDO(e *{}) *{} {{\n", name, model, row));
    out.push_str("\tif e == nil {\n\t\treturn nil\n\t}\n");
    out.push_str(&format!("\td := &{}{{\n", row));
    for (field, _) in columns.iter().filter(|(_, m)| m.storage == Storage::Scalar) {
        out.push_str(&format!(
            "\t\t{:<w$} e.{},\n",
            format!("{}:", field.name),
            field.name,
            w = width
        ));
    }
    out.push_str("\t}\n");
    out.push_str(&format!("\td.{} = {}\n", identity.go_name(), narrow_identity(&identity)));
    for (field, mapping) in &columns {
        match mapping.storage {
            Storage::Scalar => {}
            Storage::Json => out.push_str(&json_encode(field)),
            Storage::SoftDelete => out.push_str(&soft_delete_encode(field)),
        }
    }
    out.push_str("\treturn d\n}\n\n");

    out.push_str(&format!("// {0}ToDomain rebuilds a domain {0} from its persisted row.\n", name));
    out.push_str(&format!("func {}ToDomain(d *{}) *{} {{\n", name, row, model));
    out.push_str("\tif d == nil {\n\t\treturn nil\n\t}\n");
    out.push_str(&format!("\te := &{}{{\n", model));
    for (field, _) in columns.iter().filter(|(_, m)| m.storage == Storage::Scalar) {
        out.push_str(&format!(
            "\t\t{:<w$} d.{},\n",
            format!("{}:", field.name),
            field.name,
            w = width
        ));
    }
    out.push_str("\t}\n");
    if identity.basic() == BasicType::Int64 {
        out.push_str(&format!("\te.SetID(d.{})\n", identity.go_name()));
    } else {
        out.push_str(&format!("\te.SetID(int64(d.{}))\n", identity.go_name()));
    }
    for (field, mapping) in &columns {
        match mapping.storage {
            Storage::Scalar => {}
            Storage::Json => out.push_str(&json_decode(field)),
            Storage::SoftDelete => out.push_str(&soft_delete_decode(field)),
        }
    }
    out.push_str("\treturn e\n}\n");

    Ok(())
}

fn narrow_identity(identity: &Identity<'_>) -> String {
    match identity.basic() {
        BasicType::Int64 => "e.GetID()".to_string(),
        basic => format!("{}(e.GetID())", basic.go_name()),
    }
}

fn json_encode(field: &FieldDescriptor) -> String {
    let name = &field.name;
    let encode = format!(
        "if b, err := json.Marshal(e.{0}); err == nil {{\n\t\td.{0} = string(b)\n\t}}",
        name
    );
    if field.is_optional && !field.is_repeated {
        format!(
            "\tif e.{} != nil {{\n\t\t{}\n\t}}\n",
            name,
            encode.replace("\n\t", "\n\t\t")
        )
    } else {
        format!("\t{}\n", encode)
    }
}

fn json_decode(field: &FieldDescriptor) -> String {
    format!(
        "\tif d.{0} != \"\" {{\n\t\t_ = json.Unmarshal([]byte(d.{0}), &e.{0})\n\t}}\n",
        field.name
    )
}

fn soft_delete_encode(field: &FieldDescriptor) -> String {
    let name = &field.name;
    if field.is_optional {
        format!(
            "\tif e.{0} != nil {{\n\t\td.{0} = gorm.DeletedAt{{Time: *e.{0}, Valid: true}}\n\t}}\n",
            name
        )
    } else {
        format!(
            "\td.{0} = gorm.DeletedAt{{Time: e.{0}, Valid: !e.{0}.IsZero()}}\n",
            name
        )
    }
}

fn soft_delete_decode(field: &FieldDescriptor) -> String {
    let name = &field.name;
    if field.is_optional {
        format!(
            "\tif d.{0}.Valid {{\n\t\tt := d.{0}.Time\n\t\te.{0} = &t\n\t}}\n",
            name
        )
    } else {
        format!("\te.{0} = d.{0}.Time\n", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::{context, order};
    use crate::ir::{AggregateAnnotations, SemanticType};
    use std::path::Path;

    #[test]
    fn test_order_convertor() {
        let order = order();
        let ctx = context(vec![order.clone()]);
        let artifacts = ConvertorGenerator.generate(&order, &ctx).unwrap();
        assert_eq!(artifacts[0].path, Path::new("infrastructure/convertor/order_convertor.go"));

        let content = &artifacts[0].content;
        assert!(content.contains("\t\"example.com/shop/domain/model\"\n"));
        assert!(content.contains("\t\"encoding/json\"\n"));
        assert!(content.contains("func OrderToDO(e *model.Order) *do.OrderDO {"));
        assert!(content.contains("func OrderToDomain(d *do.OrderDO) *model.Order {"));
        assert!(content.contains("\t\tOrderNo:    e.OrderNo,\n"));
        assert!(content.contains("\td.ID = e.GetID()\n"));
        assert!(content.contains("\te.SetID(d.ID)\n"));
        assert!(content.contains("json.Marshal(e.Address)"));
        assert!(content.contains("gorm.DeletedAt{Time: *e.DeletedAt, Valid: true}"));
        assert!(!content.contains("\t\tID:"));
    }

    #[test]
    fn test_optional_value_object_guarded() {
        let field = FieldDescriptor::new("Shipping", SemanticType::from_go("Address")).optional();
        let encoded = json_encode(&field);
        assert!(encoded.starts_with("\tif e.Shipping != nil {\n\t\tif b, err"));
        assert!(encoded.ends_with("\t\t}\n\t}\n"));
    }

    #[test]
    fn test_narrow_identity_conversion() {
        let ticket = AggregateDescriptor::new(
            "Ticket",
            vec![FieldDescriptor::basic("ID", BasicType::Int32)],
            AggregateAnnotations::default(),
        );
        let mut file = GoFile::new("convertor");
        render(&mut file, &ticket, "model").unwrap();
        let content = file.render();
        assert!(content.contains("d.ID = int32(e.GetID())"));
        assert!(content.contains("e.SetID(int64(d.ID))"));
    }
}
