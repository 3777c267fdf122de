//! Application services: interfaces plus implementations that validate
//! before delegating to the repository.

use super::go_types::{table_name, zero_check, GoFile};
use super::methods::{extension_accessors, signature, Accessor, AccessorKind};
use super::{AggregateGenerator, Artifact, ArtifactKind, GenerationContext, GenerationReason};
use crate::ir::AggregateDescriptor;
use crate::naming::lower_first;

pub struct ServiceInterfaceGenerator;

impl AggregateGenerator for ServiceInterfaceGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::ServiceInterface
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

        let mut file = GoFile::new("service");
        file.import(&model_import);
        file.import(ctx.framework_import());
        if !accessors.is_empty() {
            file.import("context");
        }

        let out = file.body_mut();
        out.push_str(&format!("// {0}Service is the application service for {0}.\n", name));
        out.push_str(&format!("type {}Service interface {{\n", name));
        out.push_str(&format!("\tframework.Service[*{}]\n", entity));
        if !accessors.is_empty() {
            out.push('\n');
            for accessor in &accessors {
                out.push_str(&format!("\t{}\n", signature(accessor, &entity)));
            }
        }
        out.push_str("}\n");

        let path = ctx
            .domain_dir("service")
            .join(format!("{}_service.go", table_name(aggregate)));
        Ok(vec![Artifact::create(ArtifactKind::ServiceInterface, path, file.render())])
    }
}

pub struct ServiceImplementationGenerator;

impl AggregateGenerator for ServiceImplementationGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::ServiceImplementation
    }

    fn generate(
        &self,
        aggregate: &AggregateDescriptor,
        ctx: &GenerationContext,
    ) -> Result<Vec<Artifact>, GenerationReason> {
        let name = aggregate.name();
        let (model_import, model_pkg) = ctx.model_package(aggregate);
        let entity = format!("{}.{}", model_pkg, name);
        let receiver_type = format!("{}Service", lower_first(name));
        let accessors = extension_accessors(aggregate);
        let checks = validation_checks(aggregate, ctx, &accessors);

        let mut file = GoFile::new("impl");
        file.import("context");
        file.import(&model_import);
        file.import(ctx.framework_import());
        file.import(&ctx.import_path(&ctx.domain_dir("repository")));
        file.import(&ctx.import_path(&ctx.domain_dir("service")));
        if !checks.is_empty() {
            file.import("fmt");
        }
        if checks.iter().any(|c| c.contains("enum.IsValid")) {
            file.import(&ctx.import_path(&ctx.domain_dir("enum")));
        }

        let out = file.body_mut();
        out.push_str(&format!("type {} struct {{\n", receiver_type));
        out.push_str(&format!("\t*framework.BaseService[*{}]\n", entity));
        out.push_str(&format!("\trepo repository.{}Repository\n", name));
        out.push_str("}\n\n");
        out.push_str(&format!(
            "var _ service.{}Service = (*{})(nil)\n\n",
            name, receiver_type
        ));

        out.push_str(&format!(
            "func New{0}Service(repo repository.{0}Repository) service.{0}Service {{\n",
            name
        ));
        out.push_str(&format!("\treturn &{}{{\n", receiver_type));
        out.push_str(&format!(
            "\t\tBaseService: framework.NewBaseService[*{}](repo),\n",
            entity
        ));
        out.push_str("\t\trepo:        repo,\n");
        out.push_str("\t}\n}\n\n");

        for (method, is_new) in [("Add", true), ("Update", false)] {
            out.push_str(&format!(
                "func (s *{}) {}(ctx context.Context, entity *{}) error {{\n",
                receiver_type, method, entity
            ));
            out.push_str(&format!(
                "\tif err := s.validate(ctx, entity, {}); err != nil {{\n\t\treturn err\n\t}}\n",
                is_new
            ));
            out.push_str(&format!("\treturn s.BaseService.{}(ctx, entity)\n}}\n\n", method));
        }

        out.push_str(&format!(
            "func (s *{}) validate(ctx context.Context, entity *{}, isNew bool) error {{\n",
            receiver_type, entity
        ));
        for check in &checks {
            out.push_str(check);
        }
        out.push_str("\treturn nil\n}\n");

        for accessor in &accessors {
            out.push_str(&format!(
                "\nfunc (s *{}) {} {{\n",
                receiver_type,
                signature(accessor, &entity)
            ));
            out.push_str(&format!(
                "\treturn s.repo.{}(ctx, {})\n}}\n",
                accessor.method, accessor.param
            ));
        }

        let path = ctx
            .domain_dir("service")
            .join("impl")
            .join(format!("{}_service_impl.go", table_name(aggregate)));
        Ok(vec![Artifact::create(
            ArtifactKind::ServiceImplementation,
            path,
            file.render(),
        )])
    }
}

/// Go statements run by `validate`, in field order: required, enum,
/// then uniqueness.
fn validation_checks(
    aggregate: &AggregateDescriptor,
    ctx: &GenerationContext,
    accessors: &[Accessor<'_>],
) -> Vec<String> {
    let name = aggregate.name();
    let mut checks = Vec::new();

    for field in aggregate.fields().iter().filter(|f| f.annotations.required) {
        let Some(zero) = zero_check(field, &format!("entity.{}", field.name)) else {
            continue;
        };
        checks.push(format!(
            "\tif {} {{\n\t\treturn fmt.Errorf(\"%w: {}.{} is required\", framework.ErrValidationFailed)\n\t}}\n",
            zero, name, field.name
        ));
    }

    for field in aggregate.fields() {
        let Some(descriptor) = ctx.registry().enum_of(name, &field.name) else {
            continue;
        };
        let Some(basic) = field.semantic_type.basic() else {
            continue;
        };
        if field.is_repeated {
            continue;
        }
        let value = if field.is_optional {
            format!("*entity.{}", field.name)
        } else {
            format!("entity.{}", field.name)
        };
        let converted = if basic.is_integer() {
            format!("int64({})", value)
        } else {
            format!("string({})", value)
        };
        let guard = match (field.is_optional, basic.is_integer()) {
            (true, _) => format!("entity.{} != nil && ", field.name),
            (false, false) => format!("entity.{} != \"\" && ", field.name),
            (false, true) => String::new(),
        };
        checks.push(format!(
            "\tif {}!enum.IsValid{}({}) {{\n\t\treturn fmt.Errorf(\"%w: {}.{} has invalid value %v\", framework.ErrValidationFailed, {})\n\t}}\n",
            guard, descriptor.name, converted, name, field.name, value
        ));
    }

    for accessor in accessors.iter().filter(|a| a.kind == AccessorKind::GetBy) {
        let field = &accessor.field.name;
        let arg = if accessor.field.is_optional {
            format!("*entity.{}", field)
        } else {
            format!("entity.{}", field)
        };
        let lookup = format!(
            "if existing, err := s.repo.{}(ctx, {}); err != nil {{\n\t\treturn err\n\t}} else if existing != nil && (isNew || existing.GetID() != entity.GetID()) {{\n\t\treturn fmt.Errorf(\"%w: {} with {} %v\", framework.ErrEntityAlreadyExists, {})\n\t}}",
            accessor.method, arg, name, field, arg
        );
        if accessor.field.is_optional {
            checks.push(format!(
                "\tif entity.{} != nil {{\n\t\t{}\n\t}}\n",
                field,
                lookup.replace("\n\t", "\n\t\t")
            ));
        } else {
            checks.push(format!("\t{}\n", lookup));
        }
    }

    checks
}
