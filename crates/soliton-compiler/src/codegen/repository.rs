//! Repository interfaces (domain side) and their gorm implementations.

use super::go_types::{columns_of, identity, table_name, GoFile};
use super::methods::{extension_accessors, signature, AccessorKind};
use super::{AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationReason};
use crate::ir::AggregateDescriptor;
use crate::naming::lower_first;

pub struct RepositoryInterfaceGenerator;

impl AggregateGenerator for RepositoryInterfaceGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::RepositoryInterface
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let name = aggregate.name();
        let (model_import, model_pkg) = ctx.model_package(aggregate);
        let entity = format!("{}.{}", model_pkg, name);
        let accessors = extension_accessors(aggregate);

        let mut file = GoFile::new("repository");
        file.import(&model_import);
        file.import(ctx.framework_import());
        if !accessors.is_empty() {
            file.import("context");
        }

        let out = file.body_mut();
        out.push_str(&format!("// {0}Repository persists {0} aggregates.\n", name));
        out.push_str(&format!("type {}Repository interface {{\n", name));
        out.push_str(&format!("\tframework.Repository[*{}]\n", entity));
        if !accessors.is_empty() {
            out.push('\n');
            for accessor in &accessors {
                out.push_str(&format!("\t{}\n", signature(accessor, &entity)));
            }
        }
        out.push_str("}\n");

        let path = ctx
            .domain_dir("repository")
            .join(format!("{}_repository.go", table_name(aggregate)));
        Ok(vec![Artifact::create(ArtifactKind::RepositoryInterface, path, file.render())])
    }
}

pub struct RepositoryImplementationGenerator;

impl AggregateGenerator for RepositoryImplementationGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::RepositoryImplementation
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        // The implementation leans on the row struct and convertor.
        identity(aggregate)?;
        columns_of(aggregate)?;

        let name = aggregate.name();
        let (model_import, model_pkg) = ctx.model_package(aggregate);
        let entity = format!("{}.{}", model_pkg, name);
        let row = format!("do.{}DO", name);
        let receiver_type = format!("{}Repository", lower_first(name));
        let accessors = extension_accessors(aggregate);

        let mut file = GoFile::new("repository");
        file.import("gorm.io/gorm");
        file.import(&model_import);
        file.import(ctx.framework_import());
        file.import_as("domainrepo", &ctx.import_path(&ctx.domain_dir("repository")));
        file.import(&ctx.import_path(&ctx.infrastructure_dir("do")));
        file.import(&ctx.import_path(&ctx.infrastructure_dir("convertor")));
        if !accessors.is_empty() {
            file.import("context");
            file.import(&ctx.import_path(&ctx.infrastructure_dir("query")));
        }
        if accessors.iter().any(|a| a.kind == AccessorKind::GetBy) {
            file.import("errors");
        }

        let out = file.body_mut();
        out.push_str(&format!("type {} struct {{\n", receiver_type));
        out.push_str(&format!("\t*framework.BaseRepository[*{}, {}]\n", entity, row));
        out.push_str("}\n\n");
        out.push_str(&format!(
            "var _ domainrepo.{}Repository = (*{})(nil)\n\n",
            name, receiver_type
        ));

        out.push_str(&format!("// New{0}Repository builds a gorm-backed {0}Repository.\n", name));
        out.push_str(&format!(
            "func New{}Repository(db *gorm.DB) domainrepo.{}Repository {{\n",
            name, name
        ));
        out.push_str(&format!("\treturn &{}{{\n", receiver_type));
        out.push_str(&format!(
            "\t\tBaseRepository: framework.NewBaseRepository[*{}, {}](db, convertor.{}ToDO, convertor.{}ToDomain),\n",
            entity, row, name, name
        ));
        out.push_str("\t}\n}\n");

        for accessor in &accessors {
            let condition = format!(
                "query.{}Fields.{}.Eq({}).Apply(r.DB().WithContext(ctx))",
                name, accessor.field.name, accessor.param
            );
            out.push_str(&format!(
                "\nfunc (r *{}) {} {{\n",
                receiver_type,
                signature(accessor, &entity)
            ));
            match accessor.kind {
                AccessorKind::GetBy => {
                    out.push_str(&format!("\tvar row {}\n", row));
                    out.push_str(&format!("\tif err := {}.First(&row).Error; err != nil {{\n", condition));
                    out.push_str("\t\tif errors.Is(err, gorm.ErrRecordNotFound) {\n");
                    out.push_str("\t\t\treturn nil, nil\n\t\t}\n");
                    out.push_str("\t\treturn nil, err\n\t}\n");
                    out.push_str(&format!("\treturn convertor.{}ToDomain(&row), nil\n", name));
                }
                AccessorKind::FindBy => {
                    out.push_str(&format!("\tvar rows []{}\n", row));
                    out.push_str(&format!("\tif err := {}.Find(&rows).Error; err != nil {{\n", condition));
                    out.push_str("\t\treturn nil, err\n\t}\n");
                    out.push_str(&format!("\tout := make([]*{}, 0, len(rows))\n", entity));
                    out.push_str("\tfor i := range rows {\n");
                    out.push_str(&format!("\t\tout = append(out, convertor.{}ToDomain(&rows[i]))\n", name));
                    out.push_str("\t}\n\treturn out, nil\n");
                }
            }
            out.push_str("}\n");
        }

        let path = ctx
            .infrastructure_dir("repository")
            .join(format!("{}_repository_impl.go", table_name(aggregate)));
        Ok(vec![Artifact::create(
            ArtifactKind::RepositoryImplementation,
            path,
            file.render(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::{context, order};
    use crate::ir::{AggregateAnnotations, BasicType, FieldDescriptor, SemanticType};
    use std::path::Path;

    #[test]
    fn test_interface_embeds_framework_repository() {
        let order = order();
        let ctx = context(vec![order.clone()]);
        let artifacts = RepositoryInterfaceGenerator.generate(&order, &ctx).unwrap();
        assert_eq!(artifacts[0].path, Path::new("domain/repository/order_repository.go"));

        let content = &artifacts[0].content;
        assert!(content.contains("\t\"github.com/soliton-go/soliton/pkg/framework\"\n"));
        assert!(content.contains("\tframework.Repository[*model.Order]\n\n"));
        assert!(content.contains(
            "\tFindByCustomerID(ctx context.Context, customerID int64) ([]*model.Order, error)\n"
        ));
    }

    #[test]
    fn test_implementation() {
        let order = order();
        let ctx = context(vec![order.clone()]);
        let artifacts = RepositoryImplementationGenerator.generate(&order, &ctx).unwrap();
        assert_eq!(
            artifacts[0].path,
            Path::new("infrastructure/repository/order_repository_impl.go")
        );

        let content = &artifacts[0].content;
        assert!(content.contains("\t*framework.BaseRepository[*model.Order, do.OrderDO]\n"));
        assert!(content.contains("var _ domainrepo.OrderRepository = (*orderRepository)(nil)"));
        assert!(content.contains("framework.NewBaseRepository[*model.Order, do.OrderDO](db, convertor.OrderToDO, convertor.OrderToDomain)"));
        assert!(content.contains("query.OrderFields.OrderNo.Eq(orderNo).Apply(r.DB().WithContext(ctx)).First(&row)"));
        assert!(content.contains("errors.Is(err, gorm.ErrRecordNotFound)"));
    }

    #[test]
    fn test_plain_aggregate_skips_context() {
        let tag = AggregateDescriptor::new(
            "Tag",
            vec![
                FieldDescriptor::basic("ID", BasicType::Int64),
                FieldDescriptor::basic("Label", BasicType::String),
            ],
            AggregateAnnotations::default(),
        );
        let ctx = context(vec![tag.clone()]);
        let interface = &RepositoryInterfaceGenerator.generate(&tag, &ctx).unwrap()[0];
        assert!(!interface.content.contains("context"));
        let implementation = &RepositoryImplementationGenerator.generate(&tag, &ctx).unwrap()[0];
        assert!(!implementation.content.contains("\"errors\""));
    }

    #[test]
    fn test_implementation_fails_with_unmapped_column() {
        let invoice = AggregateDescriptor::new(
            "Invoice",
            vec![
                FieldDescriptor::basic("ID", BasicType::Int64),
                FieldDescriptor::new("Total", SemanticType::from_go("Money")),
            ],
            AggregateAnnotations::default(),
        );
        let ctx = context(vec![invoice.clone()]);
        assert!(RepositoryInterfaceGenerator.generate(&invoice, &ctx).is_ok());
        assert!(RepositoryImplementationGenerator.generate(&invoice, &ctx).is_err());
    }
}
