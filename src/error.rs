use std::{fmt, io, path::PathBuf};

use crate::shader::{types::GlslType, Location, Qualifier, ShaderStage};

/// Reason a shader could not be turned into bindings.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("could not read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{location}: {message}")]
    Parse { message: String, location: Location },

    #[error("{location}: unknown type `{name}`")]
    UnknownType { name: String, location: Location },

    #[error("{location}: {qualifier} `{name}` is declared as both `{first}` and `{second}`")]
    TypeConflict {
        qualifier: Qualifier,
        name: String,
        first: GlslType,
        second: GlslType,
        location: Location,
        previous: Location,
    },

    #[error("{location}: struct `{name}` is redefined with different fields")]
    StructConflict {
        name: String,
        location: Location,
        previous: Location,
    },

    #[error("{location}: could not find include \"{path}\"")]
    IncludeNotFound { path: String, location: Location },

    /// A vertex output without a fragment input of the same name, or the other way around.
    #[error("{location}: `{name}` is passed between the shaders but only declared in the {stage}")]
    UnmatchedVarying {
        name: String,
        stage: ShaderStage,
        location: Location,
    },
}

impl ErrorKind {
    /// Where the error was found, if it points into a shader.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ErrorKind::Read { .. } => None,
            ErrorKind::Parse { location, .. }
            | ErrorKind::UnknownType { location, .. }
            | ErrorKind::TypeConflict { location, .. }
            | ErrorKind::StructConflict { location, .. }
            | ErrorKind::IncludeNotFound { location, .. }
            | ErrorKind::UnmatchedVarying { location, .. } => Some(location),
        }
    }
}

/// Non-fatal finding reported alongside a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("{location}: {} is included recursively, skipping it", path.display())]
    CyclicInclude { path: PathBuf, location: Location },

    #[error("{location}: array length of `{name}` is not an integer literal, treating it as dynamically sized")]
    UnresolvedArrayLength { name: String, location: Location },
}

impl Warning {
    pub fn location(&self) -> &Location {
        match self {
            Warning::CyclicInclude { location, .. }
            | Warning::UnresolvedArrayLength { location, .. } => location,
        }
    }
}

/// Step of the generation pipeline for a single top-level file.
///
/// Lexing and emitting are total, so no [`GenerationError`] is ever reported for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Lexing,
    Parsing,
    IncludeResolution,
    TypeResolution,
    Building,
    /// Combining the vertex and fragment shader of a program.
    Linking,
    Emitting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Stage::Loading => "loading",
            Stage::Lexing => "lexing",
            Stage::Parsing => "parsing",
            Stage::IncludeResolution => "include resolution",
            Stage::TypeResolution => "type resolution",
            Stage::Building => "building",
            Stage::Linking => "linking",
            Stage::Emitting => "emitting",
        })
    }
}

/// Failure to generate bindings for one file.
///
/// `errors` is never empty.
#[derive(Debug)]
pub struct GenerationError {
    pub file: PathBuf,
    pub stage: Stage,
    pub errors: Vec<ErrorKind>,
    /// Files whose creation or modification could change the outcome, as far as the pipeline
    /// got. Includes that were not found are listed with every path they were looked up at.
    pub dependencies: Vec<PathBuf>,
}

impl GenerationError {
    pub fn new(file: impl Into<PathBuf>, stage: Stage, errors: Vec<ErrorKind>) -> Self {
        debug_assert!(!errors.is_empty());
        GenerationError {
            file: file.into(),
            stage,
            errors,
            dependencies: Vec::new(),
        }
    }

    pub fn single(file: impl Into<PathBuf>, stage: Stage, error: ErrorKind) -> Self {
        Self::new(file, stage, vec![error])
    }

    pub fn with_dependencies(mut self, dependencies: Vec<PathBuf>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "could not generate bindings for {} ({} failed)",
            self.file.display(),
            self.stage
        )?;

        if let Some(first) = self.errors.first() {
            write!(f, ": {first}")?;
        }
        if self.errors.len() > 1 {
            write!(f, " (and {} more)", self.errors.len() - 1)?;
        }

        Ok(())
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|error| error as &(dyn std::error::Error + 'static))
    }
}
