use std::{collections::HashMap, path::PathBuf};

use super::{
    types::{Declaration, StructDef},
    Qualifier, ShaderStage,
};
use crate::error::ErrorKind;

/// Everything a shader file (or a vertex and fragment shader pair) exposes to the calling code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderInterface {
    pub source_file: PathBuf,
    pub uniforms: Vec<Declaration>,
    pub inputs: Vec<Declaration>,
    pub outputs: Vec<Declaration>,
    pub constants: Vec<Declaration>,
    pub structs: Vec<StructDef>,
    /// Text of the shaders, embedded in the bindings.
    pub sources: Vec<StageSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSource {
    pub stage: ShaderStage,
    pub file: PathBuf,
    pub text: String,
}

impl ShaderInterface {
    /// The declarations of one qualifier class, in source order.
    pub fn declarations(&self, qualifier: Qualifier) -> &[Declaration] {
        match qualifier {
            Qualifier::Uniform => &self.uniforms,
            Qualifier::In => &self.inputs,
            Qualifier::Out => &self.outputs,
            Qualifier::Const => &self.constants,
        }
    }

    fn declarations_mut(&mut self, qualifier: Qualifier) -> &mut Vec<Declaration> {
        match qualifier {
            Qualifier::Uniform => &mut self.uniforms,
            Qualifier::In => &mut self.inputs,
            Qualifier::Out => &mut self.outputs,
            Qualifier::Const => &mut self.constants,
        }
    }
}

/// Partitions declarations by qualifier.
///
/// Redeclaring a name with the same qualifier and type is allowed and collapses into the first
/// declaration. Redeclaring it with another type is a [`ErrorKind::TypeConflict`]; every conflict
/// is reported and no interface is built.
pub fn build(
    source_file: impl Into<PathBuf>,
    declarations: Vec<Declaration>,
    structs: Vec<StructDef>,
) -> Result<ShaderInterface, Vec<ErrorKind>> {
    let mut interface = ShaderInterface {
        source_file: source_file.into(),
        uniforms: Vec::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
        constants: Vec::new(),
        structs,
        sources: Vec::new(),
    };

    let mut seen: HashMap<(Qualifier, String), usize> = HashMap::new();
    let mut errors = Vec::new();

    for declaration in declarations {
        let qualifier = declaration.qualifier;
        let key = (qualifier, declaration.name.clone());

        match seen.get(&key) {
            Some(&index) => {
                let first = &interface.declarations(qualifier)[index];
                if first.ty != declaration.ty {
                    errors.push(ErrorKind::TypeConflict {
                        qualifier,
                        name: declaration.name,
                        first: first.ty.clone(),
                        second: declaration.ty,
                        location: declaration.location,
                        previous: first.location.clone(),
                    });
                }
            }
            None => {
                let partition = interface.declarations_mut(qualifier);
                seen.insert(key, partition.len());
                partition.push(declaration);
            }
        }
    }

    if errors.is_empty() {
        Ok(interface)
    } else {
        Err(errors)
    }
}

/// Combines the interfaces of the vertex and fragment shader of one program.
///
/// Uniforms, constants and structs are merged; declaring one differently in the two stages is a
/// conflict. The vertex inputs and the fragment outputs are kept, while every vertex output has
/// to be matched by a fragment input of the same name and type.
pub fn link(
    vertex: ShaderInterface,
    fragment: ShaderInterface,
) -> Result<ShaderInterface, Vec<ErrorKind>> {
    let mut errors = Vec::new();

    for output in &vertex.outputs {
        match fragment.inputs.iter().find(|input| input.name == output.name) {
            Some(input) if input.ty != output.ty => errors.push(ErrorKind::TypeConflict {
                qualifier: Qualifier::In,
                name: input.name.clone(),
                first: output.ty.clone(),
                second: input.ty.clone(),
                location: input.location.clone(),
                previous: output.location.clone(),
            }),
            Some(_) => {}
            None => errors.push(ErrorKind::UnmatchedVarying {
                name: output.name.clone(),
                stage: ShaderStage::Vertex,
                location: output.location.clone(),
            }),
        }
    }
    for input in &fragment.inputs {
        if !vertex.outputs.iter().any(|output| output.name == input.name) {
            errors.push(ErrorKind::UnmatchedVarying {
                name: input.name.clone(),
                stage: ShaderStage::Fragment,
                location: input.location.clone(),
            });
        }
    }

    let mut structs = vertex.structs;
    for definition in fragment.structs {
        match structs.iter().find(|known| known.name == definition.name) {
            Some(known) if known.fields != definition.fields => {
                errors.push(ErrorKind::StructConflict {
                    name: definition.name,
                    location: definition.location,
                    previous: known.location.clone(),
                })
            }
            Some(_) => {}
            None => structs.push(definition),
        }
    }

    let linked = ShaderInterface {
        source_file: vertex.source_file,
        uniforms: merge(vertex.uniforms, fragment.uniforms, &mut errors),
        inputs: vertex.inputs,
        outputs: fragment.outputs,
        constants: merge(vertex.constants, fragment.constants, &mut errors),
        structs,
        sources: vertex.sources.into_iter().chain(fragment.sources).collect(),
    };

    if errors.is_empty() {
        Ok(linked)
    } else {
        Err(errors)
    }
}

fn merge(
    mut merged: Vec<Declaration>,
    other: Vec<Declaration>,
    errors: &mut Vec<ErrorKind>,
) -> Vec<Declaration> {
    for declaration in other {
        match merged.iter().find(|known| known.name == declaration.name) {
            Some(known) if known.ty != declaration.ty => errors.push(ErrorKind::TypeConflict {
                qualifier: declaration.qualifier,
                name: declaration.name,
                first: known.ty.clone(),
                second: declaration.ty,
                location: declaration.location,
                previous: known.location.clone(),
            }),
            Some(_) => {}
            None => merged.push(declaration),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{
        types::{GlslType, Scalar},
        Location,
    };
    use std::path::Path;

    fn declaration(qualifier: Qualifier, ty: GlslType, name: &str, line: u32) -> Declaration {
        Declaration {
            qualifier,
            ty,
            name: name.to_owned(),
            location: Location {
                file: PathBuf::from("test.frag"),
                line,
                column: 1,
                range: 0..0,
            },
        }
    }

    const FLOAT: GlslType = GlslType::Scalar(Scalar::Float);

    #[test]
    fn partitions_in_source_order() {
        let interface = build(
            "test.frag",
            vec![
                declaration(Qualifier::Out, GlslType::Vector(Scalar::Float, 4), "color", 1),
                declaration(Qualifier::Uniform, FLOAT, "time", 2),
                declaration(Qualifier::In, GlslType::Vector(Scalar::Float, 2), "uv", 3),
                declaration(Qualifier::Uniform, FLOAT, "scale", 4),
                declaration(Qualifier::Const, FLOAT, "PI", 5),
            ],
            Vec::new(),
        )
        .unwrap();

        let names = |qualifier| {
            interface
                .declarations(qualifier)
                .iter()
                .map(|decl| decl.name.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(Qualifier::Uniform), vec!["time", "scale"]);
        assert_eq!(names(Qualifier::In), vec!["uv"]);
        assert_eq!(names(Qualifier::Out), vec!["color"]);
        assert_eq!(names(Qualifier::Const), vec!["PI"]);
    }

    #[test]
    fn identical_redeclarations_collapse() {
        let interface = build(
            "test.frag",
            vec![
                declaration(Qualifier::Uniform, FLOAT, "time", 1),
                declaration(Qualifier::Uniform, FLOAT, "time", 7),
            ],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(interface.uniforms.len(), 1);
        assert_eq!(interface.uniforms[0].location.line, 1);
    }

    #[test]
    fn same_name_in_other_class_is_not_a_conflict() {
        let interface = build(
            "test.frag",
            vec![
                declaration(Qualifier::In, GlslType::Vector(Scalar::Float, 3), "normal", 1),
                declaration(Qualifier::Out, FLOAT, "normal", 2),
            ],
            Vec::new(),
        )
        .unwrap();

        assert_eq!(interface.inputs.len(), 1);
        assert_eq!(interface.outputs.len(), 1);
    }

    #[test]
    fn conflicting_types_fail() {
        let errors = build(
            "test.frag",
            vec![
                declaration(Qualifier::Uniform, FLOAT, "x", 1),
                declaration(Qualifier::Uniform, GlslType::Vector(Scalar::Float, 3), "x", 2),
            ],
            Vec::new(),
        )
        .unwrap_err();

        match errors.as_slice() {
            [ErrorKind::TypeConflict {
                name,
                first,
                second,
                location,
                previous,
                ..
            }] => {
                assert_eq!(name, "x");
                assert_eq!(first.to_string(), "float");
                assert_eq!(second.to_string(), "vec3");
                assert_eq!((location.line, previous.line), (2, 1));
            }
            other => panic!("expected one conflict, got {other:?}"),
        }
    }

    fn stage(file: &str, declarations: Vec<Declaration>) -> ShaderInterface {
        let mut interface = build(file, declarations, Vec::new()).unwrap();
        interface.sources.push(StageSource {
            stage: ShaderStage::of(Path::new(file)),
            file: PathBuf::from(file),
            text: format!("// {file}"),
        });
        interface
    }

    #[test]
    fn link_merges_stages() {
        let vertex = stage(
            "quad.vert",
            vec![
                declaration(Qualifier::In, GlslType::Vector(Scalar::Float, 2), "position", 1),
                declaration(Qualifier::Out, GlslType::Vector(Scalar::Float, 2), "uv", 2),
                declaration(Qualifier::Uniform, FLOAT, "time", 3),
            ],
        );
        let fragment = stage(
            "quad.frag",
            vec![
                declaration(Qualifier::In, GlslType::Vector(Scalar::Float, 2), "uv", 1),
                declaration(Qualifier::Uniform, FLOAT, "time", 2),
                declaration(Qualifier::Uniform, GlslType::Vector(Scalar::Float, 3), "tint", 3),
                declaration(Qualifier::Out, GlslType::Vector(Scalar::Float, 4), "color", 4),
            ],
        );

        let linked = link(vertex, fragment).unwrap();
        let names = |declarations: &[Declaration]| {
            declarations
                .iter()
                .map(|decl| decl.name.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(linked.source_file, PathBuf::from("quad.vert"));
        assert_eq!(names(&linked.uniforms), vec!["time", "tint"]);
        assert_eq!(names(&linked.inputs), vec!["position"]);
        assert_eq!(names(&linked.outputs), vec!["color"]);
        let stages: Vec<_> = linked.sources.iter().map(|source| source.stage).collect();
        assert_eq!(stages, vec![ShaderStage::Vertex, ShaderStage::Fragment]);
    }

    #[test]
    fn link_reports_every_mismatch() {
        let vertex = stage(
            "quad.vert",
            vec![
                declaration(Qualifier::Uniform, FLOAT, "time", 1),
                declaration(Qualifier::Out, GlslType::Vector(Scalar::Float, 2), "uv", 2),
                declaration(Qualifier::Out, FLOAT, "depth", 3),
            ],
        );
        let fragment = stage(
            "quad.frag",
            vec![
                declaration(Qualifier::Uniform, GlslType::Vector(Scalar::Float, 2), "time", 1),
                declaration(Qualifier::In, GlslType::Vector(Scalar::Float, 3), "uv", 2),
                declaration(Qualifier::In, FLOAT, "fog", 3),
            ],
        );

        let errors = link(vertex, fragment).unwrap_err();
        let summary: Vec<String> = errors
            .iter()
            .map(|error| match error {
                ErrorKind::TypeConflict { name, .. } => format!("conflict {name}"),
                ErrorKind::UnmatchedVarying { name, stage, .. } => format!("{stage} {name}"),
                other => panic!("unexpected error {other:?}"),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                "conflict uv",
                "vertex shader depth",
                "fragment shader fog",
                "conflict time",
            ]
        );
    }
}
