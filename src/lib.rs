//! Generates typed bindings for the interface of GLSL shaders.
//!
//! The `uniform`, `in`, `out` and `const` declarations of a shader (including the files it
//! pulls in with `#include`) are collected into a [`shader::interface::ShaderInterface`] and
//! rendered as TypeScript or Rust source by [`emit`]. A vertex shader and the fragment shader
//! next to it with the same stem are generated together as one program, see
//! [`shader::interface::link`].
//!
//! ```no_run
//! use std::path::Path;
//!
//! let generation = glsl_types::generate(
//!     Path::new("shaders/blur.frag"),
//!     Path::new("shaders"),
//!     Path::new("output"),
//! )?;
//! std::fs::write(&generation.output_path, &generation.artifact.contents)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod diagnostic;
pub mod emit;
pub mod error;
mod generate;
pub mod shader;
pub mod source;

pub use emit::{GeneratedArtifact, Language};
pub use error::{ErrorKind, GenerationError, Stage, Warning};
pub use generate::{
    generate, is_shader, paired_stage, Generation, Generator, SHADER_EXTENSIONS,
};
pub use shader::ShaderStage;
pub use source::{FileSystem, InMemory, SourceProvider};
