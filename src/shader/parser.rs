//! Recognizes the interface declarations of a GLSL file.
//!
//! Only top-level statements that start with a storage qualifier or `struct` are parsed
//! structurally. Everything else (functions, `precision` statements, unqualified globals) is
//! skipped up to the next top-level `;` or the `}` closing its body, so shader bodies never need
//! to be understood.

use std::path::Path;

use super::{
    lexer::{tokenize, Token, TokenKind},
    types::ArraySize,
    Location, Qualifier, ShaderStage,
};
use crate::error::{ErrorKind, Warning};

/// A type as written in the source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    /// Array sizes, outermost first.
    pub dims: Vec<ArraySize>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeclaration {
    pub qualifier: Qualifier,
    pub ty: TypeRef,
    pub name: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub name: String,
    pub ty: TypeRef,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStruct {
    pub name: String,
    pub fields: Vec<RawField>,
    pub location: Location,
}

impl RawStruct {
    /// Compares field names and written types, ignoring where they were written.
    pub fn same_fields(&self, other: &RawStruct) -> bool {
        self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| {
                a.name == b.name && a.ty.name == b.ty.name && a.ty.dims == b.ty.dims
            })
    }
}

/// An `#include` directive, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub path: String,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct ParsedUnit {
    pub declarations: Vec<RawDeclaration>,
    pub structs: Vec<RawStruct>,
    pub includes: Vec<Include>,
    pub warnings: Vec<Warning>,
}

/// Qualifiers that have no influence on the generated bindings.
const IGNORED_QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "sample",
    "patch",
    "invariant",
    "precise",
    "highp",
    "mediump",
    "lowp",
    "coherent",
    "volatile",
    "restrict",
    "readonly",
    "writeonly",
];

/// Names with this prefix are reserved for built-in variables.
const RESERVED_PREFIX: &str = "gl_";

pub fn parse(source: &str, file: &Path) -> Result<ParsedUnit, ErrorKind> {
    Parser {
        tokens: tokenize(source).collect(),
        position: 0,
        file,
        stage: ShaderStage::of(file),
        unit: ParsedUnit::default(),
    }
    .run()
}

enum Declarators<'src> {
    List(Vec<(Token<'src>, Vec<ArraySize>)>),
    Function,
}

struct Parser<'src, 'path> {
    tokens: Vec<Token<'src>>,
    position: usize,
    file: &'path Path,
    stage: ShaderStage,
    unit: ParsedUnit,
}

impl<'src, 'path> Parser<'src, 'path> {
    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.position).copied()
    }

    fn next_is(&self, punct: char) -> bool {
        self.peek().map_or(false, |token| token.is_punct(punct))
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let token = self.peek()?;
        self.position += 1;
        Some(token)
    }

    fn eat(&mut self, punct: char) -> bool {
        let found = self.next_is(punct);
        if found {
            self.position += 1;
        }
        found
    }

    /// `varying` declares an output of a vertex shader but an input of a fragment shader.
    fn qualifier(&self, token: &Token) -> Option<Qualifier> {
        match Qualifier::from_keyword(token.text)? {
            Qualifier::Out if token.text == "varying" && self.stage == ShaderStage::Fragment => {
                Some(Qualifier::In)
            }
            qualifier => Some(qualifier),
        }
    }

    fn location(&self, token: &Token) -> Location {
        Location {
            file: self.file.to_owned(),
            line: token.line,
            column: token.column,
            range: token.range(),
        }
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> ErrorKind {
        ErrorKind::Parse {
            message: message.into(),
            location: self.location(token),
        }
    }

    fn unterminated(&self, start: &Token) -> ErrorKind {
        self.error(
            start,
            format!(
                "unterminated declaration starting on line {}: missing `;`",
                start.line
            ),
        )
    }

    fn run(mut self) -> Result<ParsedUnit, ErrorKind> {
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Directive => {
                    self.advance();
                    self.directive(&token)?;
                }
                // empty statements and stray closing braces
                TokenKind::Punct if token.is_punct(';') || token.is_punct('}') => {
                    self.advance();
                }
                _ => self.statement()?,
            }
        }

        Ok(self.unit)
    }

    fn directive(&mut self, token: &Token) -> Result<(), ErrorKind> {
        let body = token.text[1..].trim_start();
        let Some(rest) = body.strip_prefix("include") else {
            return Ok(());
        };
        if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            return Ok(());
        }

        let rest = rest.trim();
        let path = match rest.chars().next() {
            Some('"') => rest[1..].split_once('"').map(|(path, _)| path),
            Some('<') => rest[1..].split_once('>').map(|(path, _)| path),
            _ => None,
        };

        match path {
            Some(path) if !path.trim().is_empty() => {
                self.unit.includes.push(Include {
                    path: path.trim().to_owned(),
                    location: self.location(token),
                });
                Ok(())
            }
            _ => Err(self.error(
                token,
                "malformed `#include`, expected `#include \"path\"` or `#include <path>`",
            )),
        }
    }

    fn statement(&mut self) -> Result<(), ErrorKind> {
        let Some(start) = self.peek() else {
            return Ok(());
        };

        let mut qualifier: Option<(Qualifier, Token)> = None;
        let mut layout = false;

        while let Some(token) = self.peek() {
            if token.kind != TokenKind::Keyword {
                break;
            }

            if token.text == "layout" {
                self.advance();
                if self.next_is('(') {
                    self.skip_group(&start)?;
                }
                layout = true;
            } else if let Some(found) = self.qualifier(&token) {
                match qualifier {
                    Some((existing, existing_token)) if existing != found => {
                        return Err(self.error(
                            &token,
                            format!(
                                "conflicting qualifiers `{}` and `{}`",
                                existing_token.text, token.text
                            ),
                        ));
                    }
                    Some(_) => {}
                    None => qualifier = Some((found, token)),
                }
                self.advance();
            } else if IGNORED_QUALIFIERS.contains(&token.text) {
                self.advance();
            } else {
                break;
            }
        }

        if self.peek().map_or(false, |token| token.is_keyword("struct")) {
            self.advance();
            return self.struct_definition(qualifier.map(|(qualifier, _)| qualifier), &start);
        }

        match qualifier {
            Some((qualifier, token)) => self.qualified(qualifier, &token, layout, &start),
            None => {
                self.skip_statement();
                Ok(())
            }
        }
    }

    /// `qualifier type([N])* declarator (, declarator)* ;` or an interface block.
    fn qualified(
        &mut self,
        qualifier: Qualifier,
        qualifier_token: &Token,
        layout: bool,
        start: &Token,
    ) -> Result<(), ErrorKind> {
        let Some(ty) = self.peek() else {
            return Err(self.unterminated(start));
        };

        // `layout(std140) uniform;` only changes defaults
        if layout && ty.is_punct(';') {
            self.advance();
            return Ok(());
        }

        if !matches!(ty.kind, TokenKind::Identifier | TokenKind::TypeName) {
            return Err(self.error(
                &ty,
                format!(
                    "expected a type after `{}`, found `{}`",
                    qualifier_token.text, ty.text
                ),
            ));
        }
        self.advance();

        if ty.kind == TokenKind::Identifier && self.next_is('{') {
            self.advance();
            return self.interface_block(qualifier, &ty, start);
        }

        let type_dims = self.array_dims(start)?;
        let list = match self.declarators(start, true)? {
            Declarators::List(list) => list,
            Declarators::Function => return Ok(()),
        };

        for (name, dims) in list {
            let type_ref = self.type_ref(&ty, &type_dims, &name, dims);
            self.declare(qualifier, type_ref, &name);
        }

        Ok(())
    }

    fn interface_block(
        &mut self,
        qualifier: Qualifier,
        block: &Token,
        start: &Token,
    ) -> Result<(), ErrorKind> {
        let fields = self.struct_fields(start)?;
        let reserved = block.text.starts_with(RESERVED_PREFIX);

        if self.eat(';') {
            // members of an unnamed block are globals of their own
            if !reserved {
                for field in fields {
                    let location = field.location.clone();
                    self.declare_at(qualifier, field.ty, field.name, location);
                }
            }
            return Ok(());
        }

        let list = match self.declarators(start, false)? {
            Declarators::List(list) => list,
            Declarators::Function => return Ok(()),
        };
        if reserved {
            return Ok(());
        }

        self.unit.structs.push(RawStruct {
            name: block.text.to_owned(),
            fields,
            location: self.location(block),
        });
        for (name, dims) in list {
            let ty = self.type_ref(block, &[], &name, dims);
            self.declare(qualifier, ty, &name);
        }

        Ok(())
    }

    /// `struct Name { fields } declarators? ;` with the `struct` keyword already consumed.
    fn struct_definition(
        &mut self,
        qualifier: Option<Qualifier>,
        start: &Token,
    ) -> Result<(), ErrorKind> {
        let name = match self.advance() {
            Some(token) if token.kind == TokenKind::Identifier => token,
            Some(token) if token.is_punct('{') => {
                return Err(self.error(&token, "anonymous structs are not supported"))
            }
            Some(token) => {
                return Err(self.error(
                    &token,
                    format!("expected a struct name, found `{}`", token.text),
                ))
            }
            None => return Err(self.unterminated(start)),
        };

        match self.advance() {
            Some(token) if token.is_punct('{') => {}
            Some(token) => {
                return Err(self.error(
                    &token,
                    format!("expected `{{` after `struct {}`", name.text),
                ))
            }
            None => return Err(self.unterminated(start)),
        }

        let fields = self.struct_fields(start)?;
        if !name.text.starts_with(RESERVED_PREFIX) {
            self.unit.structs.push(RawStruct {
                name: name.text.to_owned(),
                fields,
                location: self.location(&name),
            });
        }

        if self.eat(';') {
            return Ok(());
        }

        let list = match self.declarators(start, false)? {
            Declarators::List(list) => list,
            Declarators::Function => return Ok(()),
        };

        // unqualified struct globals are not part of the interface
        if let Some(qualifier) = qualifier {
            for (declared, dims) in list {
                let ty = self.type_ref(&name, &[], &declared, dims);
                self.declare(qualifier, ty, &declared);
            }
        }

        Ok(())
    }

    /// Fields up to and including the closing `}`.
    fn struct_fields(&mut self, start: &Token) -> Result<Vec<RawField>, ErrorKind> {
        let mut fields = Vec::new();

        loop {
            let Some(token) = self.peek() else {
                return Err(self.error(
                    start,
                    format!("unterminated struct starting on line {}: missing `}}`", start.line),
                ));
            };

            if token.is_punct('}') {
                self.advance();
                return Ok(fields);
            }

            if token.is_keyword("layout") {
                self.advance();
                if self.next_is('(') {
                    self.skip_group(start)?;
                }
                continue;
            }

            if token.kind == TokenKind::Keyword && IGNORED_QUALIFIERS.contains(&token.text) {
                self.advance();
                continue;
            }

            if !matches!(token.kind, TokenKind::Identifier | TokenKind::TypeName) {
                return Err(self.error(
                    &token,
                    format!("expected a field type, found `{}`", token.text),
                ));
            }
            self.advance();

            let type_dims = self.array_dims(start)?;
            if let Declarators::List(list) = self.declarators(&token, false)? {
                for (name, dims) in list {
                    fields.push(RawField {
                        name: name.text.to_owned(),
                        ty: self.type_ref(&token, &type_dims, &name, dims),
                        location: self.location(&name),
                    });
                }
            }
        }
    }

    /// `name ([N])* (= initializer)?` separated by commas, up to and including the `;`.
    fn declarators(
        &mut self,
        start: &Token,
        allow_function: bool,
    ) -> Result<Declarators<'src>, ErrorKind> {
        let mut list = Vec::new();

        loop {
            let name = match self.peek() {
                Some(token) if token.kind == TokenKind::Identifier => token,
                Some(token) if token.is_punct('}') => return Err(self.unterminated(start)),
                Some(token) => {
                    return Err(self.error(
                        &token,
                        format!("expected a name, found `{}`", token.text),
                    ))
                }
                None => return Err(self.unterminated(start)),
            };
            self.advance();

            if self.next_is('(') {
                if allow_function && list.is_empty() {
                    self.skip_statement();
                    return Ok(Declarators::Function);
                }
                return Err(self.error(&name, format!("unexpected `(` after `{}`", name.text)));
            }

            let dims = self.array_dims(start)?;
            if self.eat('=') {
                self.skip_initializer(start)?;
            }
            list.push((name, dims));

            match self.advance() {
                Some(token) if token.is_punct(',') => continue,
                Some(token) if token.is_punct(';') => return Ok(Declarators::List(list)),
                Some(token) if token.is_punct('}') => return Err(self.unterminated(start)),
                Some(token) => {
                    return Err(self.error(
                        &token,
                        format!(
                            "expected `;` after `{}`, found `{}`",
                            name.text, token.text
                        ),
                    ))
                }
                None => return Err(self.unterminated(start)),
            }
        }
    }

    fn array_dims(&mut self, start: &Token) -> Result<Vec<ArraySize>, ErrorKind> {
        let mut dims = Vec::new();

        while self.eat('[') {
            let mut inner = Vec::new();
            let mut depth = 0usize;

            loop {
                let Some(token) = self.advance() else {
                    return Err(self.unterminated(start));
                };
                if token.is_punct('[') {
                    depth += 1;
                } else if token.is_punct(']') {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                } else if token.is_punct(';') || token.is_punct('}') {
                    return Err(self.error(&token, format!("expected `]`, found `{}`", token.text)));
                }
                inner.push(token);
            }

            dims.push(match inner.as_slice() {
                [length] if length.kind == TokenKind::Number => {
                    int_literal(length.text).map_or(ArraySize::Unknown, ArraySize::Fixed)
                }
                _ => ArraySize::Unknown,
            });
        }

        Ok(dims)
    }

    /// Skips an initializer, stopping before the `,` or `;` that ends it.
    fn skip_initializer(&mut self, start: &Token) -> Result<(), ErrorKind> {
        let mut depth = 0usize;

        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Punct {
                match token.text {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" if depth > 0 => depth -= 1,
                    "}" => return Err(self.unterminated(start)),
                    ")" | "]" => {
                        return Err(self.error(&token, format!("unexpected `{}`", token.text)))
                    }
                    "," | ";" if depth == 0 => return Ok(()),
                    _ => {}
                }
            }
            self.advance();
        }

        Err(self.unterminated(start))
    }

    /// Skips a parenthesized group such as the arguments of `layout(...)`.
    fn skip_group(&mut self, start: &Token) -> Result<(), ErrorKind> {
        let mut depth = 0usize;

        while let Some(token) = self.advance() {
            if token.is_punct('(') {
                depth += 1;
            } else if token.is_punct(')') {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }

        Err(self.unterminated(start))
    }

    /// Skips a statement that is not part of the interface: up to a top-level `;`, or to the `}`
    /// closing the first block it opens.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;

        while let Some(token) = self.advance() {
            if token.is_punct('{') {
                depth += 1;
            } else if token.is_punct('}') {
                if depth <= 1 {
                    return;
                }
                depth -= 1;
            } else if token.is_punct(';') && depth == 0 {
                return;
            }
        }
    }

    fn type_ref(
        &mut self,
        ty: &Token,
        type_dims: &[ArraySize],
        name: &Token,
        name_dims: Vec<ArraySize>,
    ) -> TypeRef {
        let mut dims = name_dims;
        dims.extend_from_slice(type_dims);

        if dims.contains(&ArraySize::Unknown) {
            self.unit.warnings.push(Warning::UnresolvedArrayLength {
                name: name.text.to_owned(),
                location: self.location(name),
            });
        }

        TypeRef {
            name: ty.text.to_owned(),
            dims,
            location: self.location(ty),
        }
    }

    fn declare(&mut self, qualifier: Qualifier, ty: TypeRef, name: &Token) {
        let location = self.location(name);
        self.declare_at(qualifier, ty, name.text.to_owned(), location);
    }

    fn declare_at(&mut self, qualifier: Qualifier, ty: TypeRef, name: String, location: Location) {
        if name.starts_with(RESERVED_PREFIX) {
            return;
        }
        self.unit.declarations.push(RawDeclaration {
            qualifier,
            ty,
            name,
            location,
        });
    }
}

/// Parses a GLSL integer literal: decimal, `0x` hexadecimal or `0` octal, with an optional `u`.
fn int_literal(text: &str) -> Option<u32> {
    let digits = text.trim_end_matches(['u', 'U']);
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        u32::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}
