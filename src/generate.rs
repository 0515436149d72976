use std::path::{Path, PathBuf};

use crate::{
    emit::{self, GeneratedArtifact, Language},
    error::{ErrorKind, GenerationError, Stage, Warning},
    shader::{
        include,
        interface::{self, ShaderInterface, StageSource},
        parser, types, ShaderStage,
    },
    source::{FileSystem, SourceProvider},
};

/// Extensions of the files bindings are generated for.
pub const SHADER_EXTENSIONS: &[&str] = &["vert", "frag", "vs", "fs", "glsl"];

pub fn is_shader(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map_or(false, |extension| SHADER_EXTENSIONS.contains(&extension))
}

/// The other stage of the program `path` belongs to: `a.vert` and `a.frag`, or `a.vs` and `a.fs`.
pub fn paired_stage(path: &Path) -> Option<PathBuf> {
    let other = match path.extension()?.to_str()? {
        "vert" => "frag",
        "frag" => "vert",
        "vs" => "fs",
        "fs" => "vs",
        _ => return None,
    };
    Some(path.with_extension(other))
}

/// Result of a successful generation.
#[derive(Debug, Clone)]
pub struct Generation {
    pub artifact: GeneratedArtifact,
    /// `output_root` joined with the artifact's relative path.
    pub output_path: PathBuf,
    pub warnings: Vec<Warning>,
    /// Canonical paths of every file pulled in through `#include`, by either stage of a program.
    pub dependencies: Vec<PathBuf>,
}

/// Interface of a single file, before emitting.
struct Analysis {
    interface: ShaderInterface,
    warnings: Vec<Warning>,
    dependencies: Vec<PathBuf>,
}

/// Generates bindings for the shaders below an input directory.
///
/// A generator only holds configuration; [`Generator::generate`] can be called for different
/// files concurrently.
#[derive(Debug, Clone)]
pub struct Generator<P> {
    provider: P,
    input_root: PathBuf,
    output_root: PathBuf,
    language: Language,
}

impl<P: SourceProvider> Generator<P> {
    pub fn new(
        provider: P,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        language: Language,
    ) -> Self {
        Generator {
            provider,
            input_root: input_root.into(),
            output_root: output_root.into(),
            language,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Runs the whole pipeline for one shader file.
    ///
    /// A vertex or fragment shader whose other stage exists next to it is generated together
    /// with it as one program, named after the vertex shader. Nothing is written: the caller
    /// stores the artifact at [`Generation::output_path`].
    pub fn generate(&self, file: &Path) -> Result<Generation, GenerationError> {
        let analysis = match self.program(file) {
            (vertex, Some(fragment)) => self.link(&vertex, &fragment)?,
            (file, None) => self.analyze(&file)?,
        };

        let relative_source = self.relative_source(&analysis.interface.source_file);
        let artifact = emit::emit(&analysis.interface, &relative_source, self.language);

        Ok(Generation {
            output_path: self.output_root.join(&artifact.relative_output_path),
            artifact,
            warnings: analysis.warnings,
            dependencies: analysis.dependencies,
        })
    }

    /// The file [`Generator::generate`] names its output after when asked for `file`.
    pub fn entry_point(&self, file: &Path) -> PathBuf {
        self.program(file).0
    }

    /// The vertex (or only) shader of the program `file` belongs to, and its fragment shader.
    fn program(&self, file: &Path) -> (PathBuf, Option<PathBuf>) {
        let partner = paired_stage(file).filter(|partner| self.provider.exists(partner));
        match (ShaderStage::of(file), partner) {
            (ShaderStage::Vertex, Some(fragment)) => (file.to_owned(), Some(fragment)),
            (ShaderStage::Fragment, Some(vertex)) => (vertex, Some(file.to_owned())),
            _ => (file.to_owned(), None),
        }
    }

    fn link(&self, vertex: &Path, fragment: &Path) -> Result<Analysis, GenerationError> {
        let (vertex, fragment) = match (self.analyze(vertex), self.analyze(fragment)) {
            (Ok(vertex), Ok(fragment)) => (vertex, fragment),
            (Err(error), Ok(other)) | (Ok(other), Err(error)) => {
                let dependencies = union(error.dependencies.clone(), other.dependencies);
                return Err(error.with_dependencies(dependencies));
            }
            (Err(error), Err(other)) => {
                let dependencies = union(error.dependencies.clone(), other.dependencies);
                return Err(error.with_dependencies(dependencies));
            }
        };

        let mut warnings = vertex.warnings;
        warnings.extend(fragment.warnings);
        let dependencies = union(vertex.dependencies, fragment.dependencies);

        let file = vertex.interface.source_file.clone();
        let interface = interface::link(vertex.interface, fragment.interface).map_err(|errors| {
            GenerationError::new(file, Stage::Linking, errors)
                .with_dependencies(dependencies.clone())
        })?;

        Ok(Analysis {
            interface,
            warnings,
            dependencies,
        })
    }

    /// Loads one file and builds its interface.
    fn analyze(&self, file: &Path) -> Result<Analysis, GenerationError> {
        let fail = |stage, errors| GenerationError::new(file, stage, errors);

        let source = self.provider.read_text(file).map_err(|source| {
            fail(
                Stage::Loading,
                vec![ErrorKind::Read {
                    path: file.to_owned(),
                    source,
                }],
            )
        })?;

        // the lexer is total; tokens are produced lazily while parsing
        let unit = parser::parse(&source, file).map_err(|error| fail(Stage::Parsing, vec![error]))?;

        let resolved = include::resolve(&self.provider, &self.input_root, file, unit)
            .map_err(|failure| {
                fail(Stage::IncludeResolution, vec![failure.error])
                    .with_dependencies(failure.dependencies)
            })?;
        let dependencies = resolved.dependencies;

        let (structs, declarations) = types::resolve(resolved.structs, resolved.declarations)
            .map_err(|errors| {
                fail(Stage::TypeResolution, errors).with_dependencies(dependencies.clone())
            })?;

        let mut interface = interface::build(file, declarations, structs).map_err(|errors| {
            fail(Stage::Building, errors).with_dependencies(dependencies.clone())
        })?;
        interface.sources.push(StageSource {
            stage: ShaderStage::of(file),
            file: file.to_owned(),
            text: source,
        });

        Ok(Analysis {
            interface,
            warnings: resolved.warnings,
            dependencies,
        })
    }

    /// Path of `file` below the input root, falling back to its file name for files outside it.
    fn relative_source(&self, file: &Path) -> PathBuf {
        if let Ok(relative) = file.strip_prefix(&self.input_root) {
            return relative.to_owned();
        }

        let canonical = (
            self.provider.canonicalize(file),
            self.provider.canonicalize(&self.input_root),
        );
        if let (Ok(file), Ok(root)) = canonical {
            if let Ok(relative) = file.strip_prefix(root) {
                return relative.to_owned();
            }
        }

        file.file_name().map(PathBuf::from).unwrap_or_default()
    }
}

fn union(mut paths: Vec<PathBuf>, more: Vec<PathBuf>) -> Vec<PathBuf> {
    for path in more {
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}

/// Generates TypeScript bindings for a shader on disk.
pub fn generate(
    file: &Path,
    input_root: &Path,
    output_root: &Path,
) -> Result<Generation, GenerationError> {
    Generator::new(FileSystem, input_root, output_root, Language::TypeScript).generate(file)
}
