//! One Go file per collected enum.

use std::collections::HashSet;

use super::go_types::GoFile;
use super::{Artifact, ArtifactKind, GenerationContext, GenerationError, GenerationReason, ModelGenerator, Stage};
use crate::ir::EnumDescriptor;
use crate::naming::{lower_first, to_column_name, to_pascal_case};

pub struct EnumGenerator;

impl ModelGenerator for EnumGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Enum
    }

    fn stage(&self) -> Stage {
        Stage::BeforeFanOut
    }

    fn generate(&self, ctx: &GenerationContext) -> Vec<Result<Artifact, GenerationError>> {
        ctx.registry()
            .enums()
            .iter()
            .map(|descriptor| {
                let integer = ctx
                    .registry()
                    .get(&descriptor.owning_aggregate)
                    .ok()
                    .and_then(|a| a.field(&descriptor.owning_field))
                    .and_then(|f| f.semantic_type.basic())
                    .is_some_and(|b| b.is_integer());

                let path = ctx
                    .domain_dir("enum")
                    .join(format!("{}.go", to_column_name(&descriptor.name)));
                render_enum(descriptor, integer)
                    .map(|content| Artifact::create(ArtifactKind::Enum, path, content))
                    .map_err(|reason| {
                        GenerationError::new(Some(&descriptor.owning_aggregate), ArtifactKind::Enum, reason)
                    })
            })
            .collect()
    }
}

struct Constant {
    name: String,
    literal: String,
}

fn constants(descriptor: &EnumDescriptor, integer: bool) -> Result<Vec<Constant>, GenerationReason> {
    let mut seen = HashSet::new();
    let mut constants = Vec::with_capacity(descriptor.values.len());

    for value in &descriptor.values {
        let invalid = || GenerationReason::InvalidEnumValue {
            value: value.clone(),
            type_name: descriptor.name.clone(),
        };

        let literal = if integer {
            value.trim().parse::<i64>().map_err(|_| invalid())?.to_string()
        } else {
            format!("\"{}\"", value)
        };

        let suffix = to_pascal_case(value);
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }
        let name = format!("{}{}", descriptor.name, suffix);
        if !seen.insert(name.clone()) {
            return Err(invalid());
        }
        constants.push(Constant { name, literal });
    }
    Ok(constants)
}

fn render_enum(descriptor: &EnumDescriptor, integer: bool) -> Result<String, GenerationReason> {
    let constants = constants(descriptor, integer)?;
    let name = &descriptor.name;
    let values_var = format!("{}Values", lower_first(name));
    let underlying = if integer { "int" } else { "string" };
    let parameter = if integer { "int64" } else { "string" };

    let mut file = GoFile::new("enum");
    let out = file.body_mut();

    out.push_str(&format!(
        "// {} enumerates the values of {}.{}.\n",
        name, descriptor.owning_aggregate, descriptor.owning_field
    ));
    out.push_str(&format!("type {} {}\n\n", name, underlying));

    let width = constants.iter().map(|c| c.name.len()).max().unwrap_or(0);
    out.push_str("const (\n");
    for constant in &constants {
        out.push_str(&format!(
            "\t{:<width$} {} = {}\n",
            constant.name,
            name,
            constant.literal,
            width = width
        ));
    }
    out.push_str(")\n\n");

    out.push_str(&format!("var {} = []{}{{\n", values_var, name));
    for constant in &constants {
        out.push_str(&format!("\t{},\n", constant.name));
    }
    out.push_str("}\n\n");

    out.push_str(&format!("// IsValid reports whether v is a declared {}.\n", name));
    out.push_str(&format!("func (v {}) IsValid() bool {{\n", name));
    out.push_str(&format!("\tfor _, candidate := range {} {{\n", values_var));
    out.push_str("\t\tif candidate == v {\n\t\t\treturn true\n\t\t}\n\t}\n\treturn false\n}\n\n");

    out.push_str(&format!("// {0}Values returns every declared {0}.\n", name));
    out.push_str(&format!("func {0}Values() []{0} {{\n", name));
    out.push_str(&format!("\tout := make([]{}, len({}))\n", name, values_var));
    out.push_str(&format!("\tcopy(out, {})\n\treturn out\n}}\n\n", values_var));

    out.push_str(&format!("func IsValid{}(v {}) bool {{\n", name, parameter));
    out.push_str(&format!("\treturn {}(v).IsValid()\n}}\n", name));

    Ok(file.render())
}
