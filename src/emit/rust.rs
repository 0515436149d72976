use std::{borrow::Cow, fmt};

use super::{dependency_order, source_names, Names, SECTIONS};
use crate::shader::{
    interface::ShaderInterface,
    types::{ArraySize, GlslType, Scalar},
};

/// Plain structs for the GLSL structs and one struct per qualifier section, grouped under a
/// top-level struct whose associated constants list the GLSL name and type of every member and
/// hold the shader text.
pub(super) struct Rust<'a> {
    interface: &'a ShaderInterface,
    names: &'a Names,
}

impl<'a> Rust<'a> {
    pub(super) fn new(interface: &'a ShaderInterface, names: &'a Names) -> Self {
        Rust { interface, names }
    }
}

const DERIVES: &str = "#[derive(Debug, Clone, PartialEq)]";

impl fmt::Display for Rust<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.names.header(f)?;

        for definition in dependency_order(&self.interface.structs) {
            let fields = definition
                .fields
                .iter()
                .map(|(name, ty)| (name.as_str(), ty));
            write_struct(f, &identifier(&definition.name), fields)?;
        }

        let top = &self.names.top;
        for (qualifier, _, suffix) in SECTIONS {
            let fields = self
                .interface
                .declarations(qualifier)
                .iter()
                .map(|declaration| (declaration.name.as_str(), &declaration.ty));
            write_struct(f, &format!("{top}{suffix}"), fields)?;
        }

        writeln!(f, "{DERIVES}")?;
        writeln!(f, "pub struct {top} {{")?;
        for (_, section, suffix) in SECTIONS {
            writeln!(f, "    pub {section}: {top}{suffix},")?;
        }
        writeln!(f, "}}")?;
        writeln!(f)?;

        writeln!(f, "impl {top} {{")?;
        for (index, (qualifier, section, _)) in SECTIONS.into_iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            writeln!(f, "    /// GLSL name and type of every member of `{section}`.")?;
            write!(
                f,
                "    pub const {}: &'static [(&'static str, &'static str)] = &[",
                section.to_ascii_uppercase()
            )?;
            let declarations = self.interface.declarations(qualifier);
            if declarations.is_empty() {
                writeln!(f, "];")?;
                continue;
            }

            writeln!(f)?;
            for declaration in declarations {
                writeln!(f, "        (\"{}\", \"{}\"),", declaration.name, declaration.ty)?;
            }
            writeln!(f, "    ];")?;
        }
        for source in &self.interface.sources {
            let (constant, _) = source_names(source.stage);
            writeln!(f)?;
            writeln!(
                f,
                "    pub const {constant}: &'static str = {};",
                raw_string(&source.text)
            )?;
        }
        writeln!(f, "}}")
    }
}

/// A raw string literal with enough `#` to hold `text`.
fn raw_string(text: &str) -> String {
    let mut longest = 0;
    let mut run = None;
    for c in text.chars() {
        run = match (c, run) {
            ('"', _) => Some(0),
            ('#', Some(count)) => Some(count + 1),
            _ => None,
        };
        if let Some(count) = run {
            longest = longest.max(count);
        }
    }

    let hashes = "#".repeat(longest + 1);
    format!("r{hashes}\"{text}\"{hashes}")
}

fn write_struct<'t>(
    f: &mut fmt::Formatter,
    name: &str,
    fields: impl ExactSizeIterator<Item = (&'t str, &'t GlslType)>,
) -> fmt::Result {
    writeln!(f, "{DERIVES}")?;
    if fields.len() == 0 {
        writeln!(f, "pub struct {name} {{}}")?;
    } else {
        writeln!(f, "pub struct {name} {{")?;
        for (field, ty) in fields {
            writeln!(f, "    pub {}: {},", identifier(field), type_name(ty))?;
        }
        writeln!(f, "}}")?;
    }
    writeln!(f)
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in", "let",
    "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return",
    "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use",
    "virtual", "where", "while", "yield",
];

/// Keywords that cannot be used as raw identifiers either.
const PATH_KEYWORDS: &[&str] = &["crate", "self", "Self", "super"];

fn identifier(name: &str) -> Cow<'_, str> {
    if PATH_KEYWORDS.contains(&name) {
        Cow::Owned(format!("{name}_"))
    } else if KEYWORDS.contains(&name) {
        Cow::Owned(format!("r#{name}"))
    } else {
        Cow::Borrowed(name)
    }
}

fn scalar(scalar: Scalar) -> &'static str {
    match scalar {
        Scalar::Bool => "bool",
        Scalar::Int => "i32",
        Scalar::Uint => "u32",
        Scalar::Float => "f32",
        Scalar::Double => "f64",
    }
}

fn type_name(ty: &GlslType) -> String {
    match ty {
        GlslType::Scalar(base) => scalar(*base).to_owned(),
        GlslType::Vector(base, size) => format!("[{}; {size}]", scalar(*base)),
        GlslType::Matrix {
            scalar: base,
            columns,
            rows,
        } => format!("[[{}; {rows}]; {columns}]", scalar(*base)),
        // texture unit
        GlslType::Sampler(_) => "i32".to_owned(),
        GlslType::Array(element, ArraySize::Fixed(length)) => {
            format!("[{}; {length}]", type_name(element))
        }
        GlslType::Array(element, ArraySize::Unknown) => format!("Vec<{}>", type_name(element)),
        GlslType::Struct(name) => identifier(name).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(type_name(&GlslType::Scalar(Scalar::Int)), "i32");
        assert_eq!(type_name(&GlslType::Vector(Scalar::Uint, 4)), "[u32; 4]");
        assert_eq!(
            type_name(&GlslType::Matrix {
                scalar: Scalar::Double,
                columns: 4,
                rows: 3
            }),
            "[[f64; 3]; 4]"
        );
        assert_eq!(
            type_name(&GlslType::Array(
                Box::new(GlslType::Array(
                    Box::new(GlslType::Scalar(Scalar::Float)),
                    ArraySize::Fixed(2)
                )),
                ArraySize::Unknown
            )),
            "Vec<[f32; 2]>"
        );
        assert_eq!(type_name(&GlslType::Struct("Light".into())), "Light");
    }

    #[test]
    fn escapes_keywords() {
        assert_eq!(identifier("color"), "color");
        assert_eq!(identifier("type"), "r#type");
        assert_eq!(identifier("self"), "self_");
    }

    #[test]
    fn raw_strings_outlast_their_contents() {
        assert_eq!(raw_string("uniform float t;\n"), "r#\"uniform float t;\n\"#");
        assert_eq!(
            raw_string("#define NAME \"a\"#\n"),
            "r##\"#define NAME \"a\"#\n\"##"
        );
        assert_eq!(raw_string("\"##\" \"#"), "r###\"\"##\" \"#\"###");
    }
}
