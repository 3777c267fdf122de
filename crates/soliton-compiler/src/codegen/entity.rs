//! Entity methods spliced into the aggregate's own model file.
//!
//! Unlike every other generator this one targets a file the author owns.
//! All aggregates declared in one file share one generated block, written
//! by the first aggregate (by name) whose section renders.

use super::{AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationReason};
use crate::ir::{AggregateDescriptor, BasicType, FieldDescriptor};

pub struct EntityTraitGenerator;

impl AggregateGenerator for EntityTraitGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::EntityTrait
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let Some(file) = aggregate.source_file() else {
            return Ok(Vec::new());
        };

        // Fails for this aggregate alone; its siblings still get a block.
        render_section(aggregate)?;

        let sections: Vec<(&str, String)> = ctx
            .registry()
            .aggregates_in_file(file)
            .filter_map(|member| render_section(member).ok().map(|s| (member.name(), s)))
            .collect();

        match sections.first() {
            Some((emitter, _)) if *emitter == aggregate.name() => {}
            _ => return Ok(Vec::new()),
        }

        let block = sections
            .into_iter()
            .map(|(_, section)| section)
            .collect::<Vec<_>>()
            .join("\n");

        Ok(vec![Artifact::splice(ArtifactKind::EntityTrait, file, block)])
    }
}

fn render_section(aggregate: &AggregateDescriptor) -> Result<String, GenerationReason> {
    let name = aggregate.name();
    let mut output = String::new();

    if aggregate.declares_base_entity() {
        output.push_str(&format!(
            "// {} gets its Entity methods from the embedded base entity.\n",
            name
        ));
        output.push_str("var _ interface {\n");
        output.push_str("\tGetID() int64\n");
        output.push_str("\tSetID(id int64)\n");
        output.push_str("\tIsNew() bool\n");
        output.push_str(&format!("}} = (*{})(nil)\n", name));
        return Ok(output);
    }

    let id = aggregate.id_field().ok_or(GenerationReason::MissingIdentity)?;
    let id_type = match id.semantic_type.basic() {
        Some(basic) if basic.is_integer() && !id.is_repeated => basic,
        _ => {
            return Err(GenerationReason::UnsupportedIdentity {
                field: id.name.clone(),
                type_name: id.semantic_type.to_string(),
            })
        }
    };

    push_identity(&mut output, name, id, id_type);
    push_soft_delete(&mut output, aggregate);
    push_version(&mut output, aggregate);
    push_audit(&mut output, aggregate);
    Ok(output)
}

fn push_identity(output: &mut String, name: &str, id: &FieldDescriptor, id_type: BasicType) {
    let field = &id.name;
    let to_int64 = |expr: &str| {
        if id_type == BasicType::Int64 {
            expr.to_string()
        } else {
            format!("int64({})", expr)
        }
    };
    let from_int64 = if id_type == BasicType::Int64 {
        "id".to_string()
    } else {
        format!("{}(id)", id_type.go_name())
    };

    output.push_str(&format!("// GetID returns the identity of {}.\n", name));
    output.push_str(&format!("func (e *{}) GetID() int64 {{\n", name));
    if id.is_optional {
        output.push_str(&format!("\tif e.{} == nil {{\n\t\treturn 0\n\t}}\n", field));
        output.push_str(&format!("\treturn {}\n", to_int64(&format!("*e.{}", field))));
    } else {
        output.push_str(&format!("\treturn {}\n", to_int64(&format!("e.{}", field))));
    }
    output.push_str("}\n\n");

    output.push_str(&format!("// SetID assigns the identity of {}.\n", name));
    output.push_str(&format!("func (e *{}) SetID(id int64) {{\n", name));
    if id.is_optional {
        output.push_str(&format!("\tv := {}\n", from_int64));
        output.push_str(&format!("\te.{} = &v\n", field));
    } else {
        output.push_str(&format!("\te.{} = {}\n", field, from_int64));
    }
    output.push_str("}\n\n");

    output.push_str(&format!("// IsNew reports whether {} has not been persisted yet.\n", name));
    output.push_str(&format!("func (e *{}) IsNew() bool {{\n", name));
    if id.is_optional {
        output.push_str(&format!("\treturn e.{0} == nil || *e.{0} == 0\n", field));
    } else {
        output.push_str(&format!("\treturn e.{} == 0\n", field));
    }
    output.push_str("}\n");
}

fn time_field<'a>(aggregate: &'a AggregateDescriptor, name: &str) -> Option<&'a FieldDescriptor> {
    aggregate
        .field(name)
        .filter(|f| f.semantic_type.basic() == Some(BasicType::Time) && !f.is_repeated)
}

fn push_soft_delete(output: &mut String, aggregate: &AggregateDescriptor) {
    if !aggregate.base_traits().has_soft_delete() {
        return;
    }
    let Some(field) = time_field(aggregate, "DeletedAt") else {
        return;
    };
    let name = aggregate.name();

    output.push_str(&format!("\nfunc (e *{}) IsDeleted() bool {{\n", name));
    if field.is_optional {
        output.push_str("\treturn e.DeletedAt != nil\n");
    } else {
        output.push_str("\treturn !e.DeletedAt.IsZero()\n");
    }
    output.push_str("}\n\n");

    output.push_str(&format!("func (e *{}) MarkDeleted() {{\n", name));
    if field.is_optional {
        output.push_str("\tnow := time.Now()\n\te.DeletedAt = &now\n");
    } else {
        output.push_str("\te.DeletedAt = time.Now()\n");
    }
    output.push_str("}\n\n");

    output.push_str(&format!("func (e *{}) Restore() {{\n", name));
    if field.is_optional {
        output.push_str("\te.DeletedAt = nil\n");
    } else {
        output.push_str("\te.DeletedAt = time.Time{}\n");
    }
    output.push_str("}\n");
}

fn version_field(aggregate: &AggregateDescriptor) -> Option<&FieldDescriptor> {
    if !aggregate.base_traits().has_optimistic_lock() {
        return None;
    }
    aggregate.field("Version").filter(|f| {
        !f.is_optional && !f.is_repeated && f.semantic_type.basic().is_some_and(|b| b.is_integer())
    })
}

fn push_version(output: &mut String, aggregate: &AggregateDescriptor) {
    if version_field(aggregate).is_none() {
        return;
    }
    output.push_str(&format!("\nfunc (e *{}) IncrementVersion() {{\n", aggregate.name()));
    output.push_str("\te.Version++\n");
    output.push_str("}\n");
}

fn push_audit(output: &mut String, aggregate: &AggregateDescriptor) {
    let created = time_field(aggregate, "CreatedAt");
    let updated = time_field(aggregate, "UpdatedAt");
    if created.is_none() && updated.is_none() {
        return;
    }
    let assign = |field: &FieldDescriptor| {
        if field.is_optional {
            format!("e.{} = &now", field.name)
        } else {
            format!("e.{} = now", field.name)
        }
    };

    output.push_str(&format!("\nfunc (e *{}) SetAuditInfo(isNew bool) {{\n", aggregate.name()));
    output.push_str("\tnow := time.Now()\n");
    let versioned = version_field(aggregate).is_some();
    if created.is_some() || versioned {
        output.push_str("\tif isNew {\n");
        if let Some(field) = created {
            output.push_str(&format!("\t\t{}\n", assign(field)));
        }
        if versioned {
            output.push_str("\t\te.Version = 1\n");
        }
        output.push_str("\t}\n");
    }
    if let Some(field) = updated {
        output.push_str(&format!("\t{}\n", assign(field)));
    }
    output.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::{context, order};
    use crate::ir::{AggregateAnnotations, SourceOrigin};
    use std::path::PathBuf;

    fn in_file(aggregate: AggregateDescriptor, file: &str) -> AggregateDescriptor {
        aggregate.with_origin(SourceOrigin {
            file: Some(PathBuf::from(file)),
            package: Some("model".into()),
            ..Default::default()
        })
    }

    #[test]
    fn test_order_block() {
        let order = order();
        let ctx = context(vec![order.clone()]);
        let artifacts = EntityTraitGenerator.generate(&order, &ctx).unwrap();
        assert_eq!(artifacts.len(), 1);

        let block = &artifacts[0].content;
        assert!(block.contains("func (e *Order) GetID() int64 {\n\treturn e.ID\n}"));
        assert!(block.contains("func (e *Order) SetID(id int64) {\n\te.ID = id\n}"));
        assert!(block.contains("return e.DeletedAt != nil"));
        assert!(block.contains("func (e *Order) IncrementVersion()"));
        assert!(!block.contains("SetAuditInfo"));
        assert!(!block.contains("soliton:generated"));
    }

    #[test]
    fn test_narrow_optional_identity() {
        let ticket = in_file(
            AggregateDescriptor::new(
                "Ticket",
                vec![FieldDescriptor::basic("TicketID", BasicType::Int32).optional()],
                AggregateAnnotations::default(),
            ),
            "/m/ticket.go",
        );
        let section = render_section(&ticket).unwrap();
        assert!(section.contains("return int64(*e.TicketID)"));
        assert!(section.contains("v := int32(id)\n\te.TicketID = &v"));
        assert!(section.contains("return e.TicketID == nil || *e.TicketID == 0"));
    }

    #[test]
    fn test_missing_and_unsupported_identity() {
        let loose = AggregateDescriptor::new(
            "Note",
            vec![FieldDescriptor::basic("Body", BasicType::String)],
            AggregateAnnotations::default(),
        );
        assert_eq!(render_section(&loose).unwrap_err(), GenerationReason::MissingIdentity);

        let keyed = AggregateDescriptor::new(
            "Key",
            vec![FieldDescriptor::basic("KeyID", BasicType::String)],
            AggregateAnnotations::default(),
        );
        assert!(matches!(
            render_section(&keyed),
            Err(GenerationReason::UnsupportedIdentity { .. })
        ));
    }

    #[test]
    fn test_base_entity_gets_assertion() {
        let user = AggregateDescriptor::new(
            "User",
            vec![FieldDescriptor::basic("Name", BasicType::String)],
            AggregateAnnotations {
                base_entity_trait: Some("BaseEntity".into()),
                ..Default::default()
            },
        );
        let section = render_section(&user).unwrap();
        assert!(section.contains("} = (*User)(nil)"));
        assert!(!section.contains("func (e *User)"));
    }

    #[test]
    fn test_shared_file_emitted_once() {
        let id = || vec![FieldDescriptor::basic("ID", BasicType::Int64)];
        let b = in_file(AggregateDescriptor::new("Bravo", id(), AggregateAnnotations::default()), "/m/shared.go");
        let a = in_file(AggregateDescriptor::new("Alpha", id(), AggregateAnnotations::default()), "/m/shared.go");
        let ctx = context(vec![a.clone(), b.clone()]);

        assert!(EntityTraitGenerator.generate(&b, &ctx).unwrap().is_empty());
        let artifacts = EntityTraitGenerator.generate(&a, &ctx).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].content.contains("func (e *Alpha) GetID()"));
        assert!(artifacts[0].content.contains("func (e *Bravo) GetID()"));
    }

    #[test]
    fn test_failing_first_member_hands_off() {
        let a = in_file(
            AggregateDescriptor::new(
                "Alpha",
                vec![FieldDescriptor::basic("Body", BasicType::String)],
                AggregateAnnotations::default(),
            ),
            "/m/shared.go",
        );
        let b = in_file(
            AggregateDescriptor::new("Bravo", vec![FieldDescriptor::basic("ID", BasicType::Int64)], AggregateAnnotations::default()),
            "/m/shared.go",
        );
        let ctx = context(vec![a.clone(), b.clone()]);

        assert!(EntityTraitGenerator.generate(&a, &ctx).is_err());
        let artifacts = EntityTraitGenerator.generate(&b, &ctx).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(!artifacts[0].content.contains("Alpha"));
    }
}
