use std::fmt;

use super::{dependency_order, source_names, Names, SECTIONS};
use crate::shader::{
    interface::ShaderInterface,
    types::{GlslType, Scalar},
};

/// Exported interfaces for the structs and the shader, plus a `const` mapping each member to its
/// GLSL type name and holding the shader text for runtime use.
pub(super) struct TypeScript<'a> {
    interface: &'a ShaderInterface,
    names: &'a Names,
}

impl<'a> TypeScript<'a> {
    pub(super) fn new(interface: &'a ShaderInterface, names: &'a Names) -> Self {
        TypeScript { interface, names }
    }
}

impl fmt::Display for TypeScript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.names.header(f)?;

        for source in &self.interface.sources {
            let (constant, _) = source_names(source.stage);
            writeln!(f, "const {constant} = `{}`;", template_literal(&source.text))?;
            writeln!(f)?;
        }

        for definition in dependency_order(&self.interface.structs) {
            writeln!(f, "export interface {} {{", definition.name)?;
            for (name, ty) in &definition.fields {
                writeln!(f, "  {name}: {};", type_name(ty))?;
            }
            writeln!(f, "}}")?;
            writeln!(f)?;
        }

        writeln!(f, "export interface {} {{", self.names.top)?;
        for (qualifier, section, _) in SECTIONS {
            let declarations = self.interface.declarations(qualifier);
            if declarations.is_empty() {
                writeln!(f, "  {section}: {{}};")?;
                continue;
            }

            writeln!(f, "  {section}: {{")?;
            for declaration in declarations {
                writeln!(f, "    {}: {};", declaration.name, type_name(&declaration.ty))?;
            }
            writeln!(f, "  }};")?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "export const {} = {{", self.names.top)?;
        for (qualifier, section, _) in SECTIONS {
            let declarations = self.interface.declarations(qualifier);
            if declarations.is_empty() {
                writeln!(f, "  {section}: {{}},")?;
                continue;
            }

            writeln!(f, "  {section}: {{")?;
            for declaration in declarations {
                writeln!(f, "    {}: \"{}\",", declaration.name, declaration.ty)?;
            }
            writeln!(f, "  }},")?;
        }
        for source in &self.interface.sources {
            let (constant, field) = source_names(source.stage);
            writeln!(f, "  {field}: {constant},")?;
        }
        writeln!(f, "}} as const;")
    }
}

/// Escapes `text` for the body of a template literal.
fn template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

fn scalar(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "boolean",
        Scalar::Int | Scalar::Uint | Scalar::Float | Scalar::Double => "number",
    }
}

fn tuple(element: &str, length: usize) -> String {
    format!("[{}]", vec![element; length].join(", "))
}

fn type_name(ty: &GlslType) -> String {
    match ty {
        GlslType::Scalar(base) => scalar(*base).to_owned(),
        GlslType::Vector(base, size) => tuple(scalar(*base), *size as usize),
        // column-major, like the data uploaded with `uniformMatrix*fv`
        GlslType::Matrix { columns, rows, .. } => {
            tuple("number", *columns as usize * *rows as usize)
        }
        // texture unit
        GlslType::Sampler(_) => "number".to_owned(),
        GlslType::Array(element, _) => format!("{}[]", type_name(element)),
        GlslType::Struct(name) => name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::types::{ArraySize, SamplerDim, SamplerKind};

    #[test]
    fn type_names() {
        assert_eq!(type_name(&GlslType::Scalar(Scalar::Bool)), "boolean");
        assert_eq!(type_name(&GlslType::Scalar(Scalar::Uint)), "number");
        assert_eq!(
            type_name(&GlslType::Vector(Scalar::Float, 3)),
            "[number, number, number]"
        );
        assert_eq!(
            type_name(&GlslType::Vector(Scalar::Bool, 2)),
            "[boolean, boolean]"
        );
        assert_eq!(
            type_name(&GlslType::Matrix {
                scalar: Scalar::Float,
                columns: 2,
                rows: 2
            }),
            "[number, number, number, number]"
        );
        assert_eq!(
            type_name(&GlslType::Sampler(SamplerKind {
                sampled: Scalar::Float,
                dim: SamplerDim::D2,
                shadow: false,
            })),
            "number"
        );
        assert_eq!(
            type_name(&GlslType::Array(
                Box::new(GlslType::Vector(Scalar::Float, 2)),
                ArraySize::Fixed(4)
            )),
            "[number, number][]"
        );
        assert_eq!(
            type_name(&GlslType::Array(
                Box::new(GlslType::Struct("Light".into())),
                ArraySize::Unknown
            )),
            "Light[]"
        );
    }

    #[test]
    fn template_literals_are_escaped() {
        assert_eq!(template_literal("void main() {}\n"), "void main() {}\n");
        assert_eq!(
            template_literal("// `${x}` \\ end"),
            "// \\`\\${x}\\` \\\\ end"
        );
        assert_eq!(template_literal("$ {x} $"), "$ {x} $");
    }
}
