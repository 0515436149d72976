use std::{collections::HashSet, fmt};

use super::{
    parser::{RawDeclaration, RawStruct, TypeRef},
    Location, Qualifier,
};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool,
    Int,
    Uint,
    Float,
    Double,
}

impl Scalar {
    /// Prefix used by vector and sampler names (`ivec3`, `usampler2D`).
    fn prefix(self) -> &'static str {
        match self {
            Scalar::Bool => "b",
            Scalar::Int => "i",
            Scalar::Uint => "u",
            Scalar::Float => "",
            Scalar::Double => "d",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Scalar::Bool => "bool",
            Scalar::Int => "int",
            Scalar::Uint => "uint",
            Scalar::Float => "float",
            Scalar::Double => "double",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerDim {
    D1,
    D2,
    D3,
    Cube,
    D1Array,
    D2Array,
    CubeArray,
    D2Multisample,
    D2MultisampleArray,
    Rect,
    Buffer,
}

const SAMPLER_DIMS: &[(&str, SamplerDim)] = &[
    ("1D", SamplerDim::D1),
    ("2D", SamplerDim::D2),
    ("3D", SamplerDim::D3),
    ("Cube", SamplerDim::Cube),
    ("1DArray", SamplerDim::D1Array),
    ("2DArray", SamplerDim::D2Array),
    ("CubeArray", SamplerDim::CubeArray),
    ("2DMS", SamplerDim::D2Multisample),
    ("2DMSArray", SamplerDim::D2MultisampleArray),
    ("2DRect", SamplerDim::Rect),
    ("Buffer", SamplerDim::Buffer),
];

impl SamplerDim {
    fn suffix(self) -> &'static str {
        SAMPLER_DIMS
            .iter()
            .find(|(_, dim)| *dim == self)
            .map(|(suffix, _)| *suffix)
            .unwrap_or_default()
    }

    fn supports_shadow(self) -> bool {
        matches!(
            self,
            SamplerDim::D1
                | SamplerDim::D2
                | SamplerDim::Cube
                | SamplerDim::D1Array
                | SamplerDim::D2Array
                | SamplerDim::CubeArray
                | SamplerDim::Rect
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerKind {
    /// `Float`, `Int` or `Uint`.
    pub sampled: Scalar,
    pub dim: SamplerDim,
    pub shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArraySize {
    Fixed(u32),
    /// The length is not an integer literal; bindings treat it as dynamically sized.
    Unknown,
}

/// Normalized type of a shader interface member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlslType {
    Scalar(Scalar),
    Vector(Scalar, u8),
    Matrix {
        /// `Float` or `Double`.
        scalar: Scalar,
        columns: u8,
        rows: u8,
    },
    Sampler(SamplerKind),
    Array(Box<GlslType>, ArraySize),
    Struct(String),
}

impl GlslType {
    /// The innermost non-array type together with the array sizes, outermost first.
    pub fn split_arrays(&self) -> (&GlslType, Vec<ArraySize>) {
        let mut sizes = Vec::new();
        let mut ty = self;
        while let GlslType::Array(element, size) = ty {
            sizes.push(*size);
            ty = element;
        }
        (ty, sizes)
    }

    /// Name of the struct this type refers to, looking through arrays.
    pub fn struct_name(&self) -> Option<&str> {
        match self.split_arrays().0 {
            GlslType::Struct(name) => Some(name),
            _ => None,
        }
    }
}

/// Renders the type in GLSL notation, e.g. `mat2x3`, `usampler2DArray` or `Light[4][]`.
impl fmt::Display for GlslType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (base, sizes) = self.split_arrays();

        match base {
            GlslType::Scalar(scalar) => write!(f, "{scalar}")?,
            GlslType::Vector(scalar, size) => write!(f, "{}vec{size}", scalar.prefix())?,
            GlslType::Matrix {
                scalar,
                columns,
                rows,
            } => {
                write!(f, "{}mat{columns}", scalar.prefix())?;
                if columns != rows {
                    write!(f, "x{rows}")?;
                }
            }
            GlslType::Sampler(kind) => {
                write!(f, "{}sampler{}", kind.sampled.prefix(), kind.dim.suffix())?;
                if kind.shadow {
                    f.write_str("Shadow")?;
                }
            }
            GlslType::Struct(name) => f.write_str(name)?,
            GlslType::Array(..) => unreachable!("arrays are split off above"),
        }

        for size in sizes {
            match size {
                ArraySize::Fixed(length) => write!(f, "[{length}]")?,
                ArraySize::Unknown => f.write_str("[]")?,
            }
        }

        Ok(())
    }
}

/// Looks up a built-in GLSL type name.
pub fn builtin(name: &str) -> Option<GlslType> {
    let scalar = match name {
        "bool" => Some(Scalar::Bool),
        "int" => Some(Scalar::Int),
        "uint" => Some(Scalar::Uint),
        "float" => Some(Scalar::Float),
        "double" => Some(Scalar::Double),
        _ => None,
    };
    if let Some(scalar) = scalar {
        return Some(GlslType::Scalar(scalar));
    }

    if let Some((scalar, rest)) = split_scalar_prefix(name, "vec") {
        let size = dimension(rest)?;
        return Some(GlslType::Vector(scalar, size));
    }

    if let Some((scalar, rest)) = split_scalar_prefix(name, "mat") {
        if !matches!(scalar, Scalar::Float | Scalar::Double) {
            return None;
        }
        let (columns, rows) = match rest.split_once('x') {
            Some((columns, rows)) => (dimension(columns)?, dimension(rows)?),
            None => (dimension(rest)?, dimension(rest)?),
        };
        return Some(GlslType::Matrix {
            scalar,
            columns,
            rows,
        });
    }

    if let Some((sampled, rest)) = split_scalar_prefix(name, "sampler") {
        if !matches!(sampled, Scalar::Float | Scalar::Int | Scalar::Uint) {
            return None;
        }
        let (rest, shadow) = match rest.strip_suffix("Shadow") {
            Some(rest) => (rest, true),
            None => (rest, false),
        };
        let dim = SAMPLER_DIMS
            .iter()
            .find(|(suffix, _)| *suffix == rest)
            .map(|(_, dim)| *dim)?;
        if shadow && (sampled != Scalar::Float || !dim.supports_shadow()) {
            return None;
        }
        return Some(GlslType::Sampler(SamplerKind {
            sampled,
            dim,
            shadow,
        }));
    }

    None
}

fn split_scalar_prefix<'a>(name: &'a str, stem: &str) -> Option<(Scalar, &'a str)> {
    let (scalar, rest) = match name.as_bytes().first()? {
        b'b' => (Scalar::Bool, &name[1..]),
        b'i' => (Scalar::Int, &name[1..]),
        b'u' => (Scalar::Uint, &name[1..]),
        b'd' => (Scalar::Double, &name[1..]),
        _ => (Scalar::Float, name),
    };
    rest.strip_prefix(stem).map(|rest| (scalar, rest))
}

fn dimension(text: &str) -> Option<u8> {
    match text {
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

/// A struct definition with resolved field types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub fields: Vec<(String, GlslType)>,
    pub location: Location,
}

/// An interface declaration with a resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub qualifier: Qualifier,
    pub ty: GlslType,
    pub name: String,
    pub location: Location,
}

/// Structs defined so far, by name.
#[derive(Debug, Default)]
pub struct StructTable {
    names: HashSet<String>,
}

impl StructTable {
    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_owned());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// Resolves a type name against the built-in table and then the known structs.
pub fn resolve_type(name: &str, known_structs: &StructTable) -> Option<GlslType> {
    builtin(name).or_else(|| {
        known_structs
            .contains(name)
            .then(|| GlslType::Struct(name.to_owned()))
    })
}

fn resolve_ref(ty: &TypeRef, known_structs: &StructTable) -> Result<GlslType, ErrorKind> {
    let base = resolve_type(&ty.name, known_structs).ok_or_else(|| ErrorKind::UnknownType {
        name: ty.name.clone(),
        location: ty.location.clone(),
    })?;

    Ok(ty
        .dims
        .iter()
        .rev()
        .fold(base, |element, size| GlslType::Array(Box::new(element), *size)))
}

/// Resolves every struct field and declaration type.
///
/// Structs may only refer to structs defined before them. Resolution continues past unknown
/// types so that all of them are reported at once.
pub fn resolve(
    structs: Vec<RawStruct>,
    declarations: Vec<RawDeclaration>,
) -> Result<(Vec<StructDef>, Vec<Declaration>), Vec<ErrorKind>> {
    let mut known = StructTable::default();
    let mut errors = Vec::new();

    let mut resolved_structs = Vec::with_capacity(structs.len());
    for raw in structs {
        let mut fields = Vec::with_capacity(raw.fields.len());
        for field in raw.fields {
            match resolve_ref(&field.ty, &known) {
                Ok(ty) => fields.push((field.name, ty)),
                Err(error) => errors.push(error),
            }
        }

        // registered even when a field failed so that users of the struct don't cascade
        known.insert(&raw.name);
        resolved_structs.push(StructDef {
            name: raw.name,
            fields,
            location: raw.location,
        });
    }

    let mut resolved = Vec::with_capacity(declarations.len());
    for raw in declarations {
        match resolve_ref(&raw.ty, &known) {
            Ok(ty) => resolved.push(Declaration {
                qualifier: raw.qualifier,
                ty,
                name: raw.name,
                location: raw.location,
            }),
            Err(error) => errors.push(error),
        }
    }

    if errors.is_empty() {
        Ok((resolved_structs, resolved))
    } else {
        Err(errors)
    }
}
