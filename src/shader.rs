//! Static analysis of GLSL shader interfaces.
//!
//! A shader goes through [`lexer`], [`parser`] and [`include`] resolution, has its type names
//! resolved by [`types`] and is finally folded into a [`interface::ShaderInterface`].

pub mod include;
pub mod interface;
pub mod lexer;
pub mod parser;
pub mod types;

use std::{
    fmt,
    ops::Range,
    path::{Path, PathBuf},
};

/// Position of a token or declaration in a shader file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
    /// Byte range in the file.
    pub range: Range<usize>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// Storage class of an interface declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Qualifier {
    Uniform,
    /// `in` or `attribute`
    In,
    /// `out` or `varying`
    Out,
    Const,
}

impl Qualifier {
    pub fn from_keyword(keyword: &str) -> Option<Qualifier> {
        match keyword {
            "uniform" => Some(Qualifier::Uniform),
            "in" | "attribute" => Some(Qualifier::In),
            "out" | "varying" => Some(Qualifier::Out),
            "const" => Some(Qualifier::Const),
            _ => None,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Qualifier::Uniform => "uniform",
            Qualifier::In => "input",
            Qualifier::Out => "output",
            Qualifier::Const => "constant",
        })
    }
}

/// Programmable stage a shader file is written for, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// `.vert` or `.vs`
    Vertex,
    /// `.frag` or `.fs`
    Fragment,
    /// Anything else, such as `.glsl` libraries.
    Generic,
}

impl ShaderStage {
    pub fn of(path: &Path) -> ShaderStage {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("vert" | "vs") => ShaderStage::Vertex,
            Some("frag" | "fs") => ShaderStage::Fragment,
            _ => ShaderStage::Generic,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex shader",
            ShaderStage::Fragment => "fragment shader",
            ShaderStage::Generic => "shader",
        })
    }
}
