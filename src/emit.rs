//! Rendering of a [`ShaderInterface`] into a binding source file.

mod rust;
mod typescript;

use std::{
    collections::HashSet,
    fmt,
    path::{Component, Path, PathBuf},
};

use crate::shader::{interface::ShaderInterface, types::StructDef, Qualifier, ShaderStage};

/// Language the bindings are generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Language {
    #[default]
    #[value(name = "ts")]
    TypeScript,
    #[value(name = "rs")]
    Rust,
}

impl Language {
    pub fn extension(self) -> &'static str {
        match self {
            Language::TypeScript => "ts",
            Language::Rust => "rs",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Language::TypeScript => "TypeScript",
            Language::Rust => "Rust",
        })
    }
}

/// A generated binding file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub relative_output_path: PathBuf,
    pub contents: String,
}

/// Renders the bindings for `interface`.
///
/// `relative_source` is the shader path relative to the input directory; the artifact mirrors it
/// with the extension of `language`. The output only depends on the arguments.
pub fn emit(
    interface: &ShaderInterface,
    relative_source: &Path,
    language: Language,
) -> GeneratedArtifact {
    let names = Names::new(interface, relative_source);

    let contents = match language {
        Language::TypeScript => typescript::TypeScript::new(interface, &names).to_string(),
        Language::Rust => rust::Rust::new(interface, &names).to_string(),
    };

    GeneratedArtifact {
        relative_output_path: relative_source.with_extension(language.extension()),
        contents,
    }
}

/// The sections of the top-level declaration: qualifier, field name and type name suffix.
const SECTIONS: [(Qualifier, &str, &str); 4] = [
    (Qualifier::Uniform, "uniforms", "Uniforms"),
    (Qualifier::In, "inputs", "Inputs"),
    (Qualifier::Out, "outputs", "Outputs"),
    (Qualifier::Const, "constants", "Constants"),
];

/// Names shared by every backend.
struct Names {
    /// Source paths with `/` separators, for the header.
    sources: Vec<String>,
    /// Name of the top-level declaration.
    top: String,
}

impl Names {
    fn new(interface: &ShaderInterface, relative_source: &Path) -> Names {
        let mut sources: Vec<String> = interface
            .sources
            .iter()
            .map(|source| match source.file.extension() {
                Some(extension) => slashed(&relative_source.with_extension(extension)),
                None => slashed(relative_source),
            })
            .collect();
        if sources.is_empty() {
            sources.push(slashed(relative_source));
        }

        let stem = relative_source
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();

        let mut top = pascal_case(&stem);
        let taken: HashSet<&str> = interface.structs.iter().map(|s| s.name.as_str()).collect();
        let collides = |top: &str| {
            taken.contains(top)
                || SECTIONS
                    .iter()
                    .any(|(_, _, suffix)| taken.contains(format!("{top}{suffix}").as_str()))
        };
        if collides(&top) {
            top.push_str("Bindings");
        }

        Names { sources, top }
    }

    fn header(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "// DO NOT EDIT THIS FILE")?;
        writeln!(
            f,
            "// This file is generated by glsl-types from {}",
            self.sources.join(" and ")
        )?;
        writeln!(f)
    }
}

fn slashed(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Names of the constant (and TypeScript field) holding the text of a shader.
fn source_names(stage: ShaderStage) -> (&'static str, &'static str) {
    match stage {
        ShaderStage::Vertex => ("VERTEX_SHADER_SOURCE", "vertexShaderSource"),
        ShaderStage::Fragment => ("FRAGMENT_SHADER_SOURCE", "fragmentShaderSource"),
        ShaderStage::Generic => ("SHADER_SOURCE", "shaderSource"),
    }
}

/// `my-blur_shader` becomes `MyBlurShader`.
fn pascal_case(stem: &str) -> String {
    let mut name = String::new();
    for word in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars);
        }
    }

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Shader");
    }
    name
}

/// Structs ordered so that every struct comes after the structs it embeds, otherwise in
/// definition order.
fn dependency_order(structs: &[StructDef]) -> Vec<&StructDef> {
    fn visit<'a>(
        definition: &'a StructDef,
        structs: &'a [StructDef],
        visited: &mut HashSet<&'a str>,
        ordered: &mut Vec<&'a StructDef>,
    ) {
        if !visited.insert(&definition.name) {
            return;
        }

        for (_, ty) in &definition.fields {
            let embedded = ty
                .struct_name()
                .and_then(|name| structs.iter().find(|other| other.name == name));
            if let Some(embedded) = embedded {
                visit(embedded, structs, visited, ordered);
            }
        }

        ordered.push(definition);
    }

    let mut visited = HashSet::new();
    let mut ordered = Vec::with_capacity(structs.len());
    for definition in structs {
        visit(definition, structs, &mut visited, &mut ordered);
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{
        interface::StageSource,
        types::{ArraySize, Declaration, GlslType, Scalar},
        Location,
    };

    fn location() -> Location {
        Location {
            file: PathBuf::from("shader.frag"),
            line: 1,
            column: 1,
            range: 0..0,
        }
    }

    fn struct_def(name: &str, fields: &[(&str, GlslType)]) -> StructDef {
        StructDef {
            name: name.to_owned(),
            fields: fields
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            location: location(),
        }
    }

    fn interface(structs: Vec<StructDef>) -> ShaderInterface {
        ShaderInterface {
            source_file: PathBuf::from("shaders/shader.frag"),
            uniforms: vec![Declaration {
                qualifier: Qualifier::Uniform,
                ty: GlslType::Vector(Scalar::Float, 3),
                name: "color".into(),
                location: location(),
            }],
            inputs: Vec::new(),
            outputs: Vec::new(),
            constants: Vec::new(),
            structs,
            sources: Vec::new(),
        }
    }

    #[test]
    fn output_path_replaces_extension() {
        let interface = interface(Vec::new());
        let artifact = emit(&interface, Path::new("post/blur.frag"), Language::TypeScript);
        assert_eq!(artifact.relative_output_path, PathBuf::from("post/blur.ts"));

        let artifact = emit(&interface, Path::new("lit.vert"), Language::Rust);
        assert_eq!(artifact.relative_output_path, PathBuf::from("lit.rs"));
    }

    #[test]
    fn emit_is_deterministic() {
        let interface = interface(vec![struct_def(
            "Light",
            &[("pos", GlslType::Vector(Scalar::Float, 3))],
        )]);
        for language in [Language::TypeScript, Language::Rust] {
            let first = emit(&interface, Path::new("shader.frag"), language);
            let second = emit(&interface, Path::new("shader.frag"), language);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn pascal_case_names() {
        assert_eq!(pascal_case("shader"), "Shader");
        assert_eq!(pascal_case("my-blur_shader"), "MyBlurShader");
        assert_eq!(pascal_case("phongLighting"), "PhongLighting");
        assert_eq!(pascal_case("2d"), "Shader2d");
        assert_eq!(pascal_case("--"), "Shader");
    }

    #[test]
    fn top_level_name_avoids_structs() {
        let plain = interface(Vec::new());
        assert_eq!(Names::new(&plain, Path::new("light.frag")).top, "Light");

        let clashing = interface(vec![struct_def("Light", &[])]);
        assert_eq!(
            Names::new(&clashing, Path::new("light.frag")).top,
            "LightBindings"
        );

        let clashing = interface(vec![struct_def("LightUniforms", &[])]);
        assert_eq!(
            Names::new(&clashing, Path::new("light.frag")).top,
            "LightBindings"
        );
    }

    #[test]
    fn embedded_structs_come_first() {
        let structs = vec![
            struct_def(
                "Scene",
                &[(
                    "lights",
                    GlslType::Array(
                        Box::new(GlslType::Struct("Light".into())),
                        ArraySize::Fixed(4),
                    ),
                )],
            ),
            struct_def("Material", &[("albedo", GlslType::Vector(Scalar::Float, 3))]),
            struct_def("Light", &[("material", GlslType::Struct("Material".into()))]),
        ];

        let order: Vec<_> = dependency_order(&structs)
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(order, vec!["Material", "Light", "Scene"]);
    }

    #[test]
    fn header_uses_forward_slashes() {
        let names = Names::new(&interface(Vec::new()), &Path::new("post").join("blur.frag"));
        assert_eq!(names.sources, vec!["post/blur.frag"]);
    }

    #[test]
    fn header_names_every_stage() {
        let mut interface = interface(Vec::new());
        for (stage, file) in [
            (ShaderStage::Vertex, "shaders/post/blur.vert"),
            (ShaderStage::Fragment, "shaders/post/blur.frag"),
        ] {
            interface.sources.push(StageSource {
                stage,
                file: PathBuf::from(file),
                text: String::new(),
            });
        }

        let artifact = emit(&interface, Path::new("post/blur.vert"), Language::TypeScript);
        assert!(artifact
            .contents
            .contains("// This file is generated by glsl-types from post/blur.vert and post/blur.frag\n"));
        assert_eq!(artifact.relative_output_path, PathBuf::from("post/blur.ts"));
    }
}
