use std::ops::Range;

use super::types;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    /// Qualifiers and other reserved words.
    Keyword,
    /// Built-in type names such as `vec3` or `sampler2D`.
    TypeName,
    Punct,
    Number,
    String,
    /// A whole preprocessor line, including the leading `#`.
    Directive,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub line: u32,
    pub column: u32,
    /// Byte offset of the first character.
    pub offset: usize,
}

impl<'src> Token<'src> {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.text.len()
    }

    pub fn is_punct(&self, punct: char) -> bool {
        self.kind == TokenKind::Punct && self.text.starts_with(punct)
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == keyword
    }
}

const KEYWORDS: &[&str] = &[
    "attribute",
    "break",
    "buffer",
    "case",
    "centroid",
    "coherent",
    "const",
    "continue",
    "default",
    "discard",
    "do",
    "else",
    "false",
    "flat",
    "for",
    "highp",
    "if",
    "in",
    "inout",
    "invariant",
    "layout",
    "lowp",
    "mediump",
    "noperspective",
    "out",
    "patch",
    "precise",
    "precision",
    "readonly",
    "restrict",
    "return",
    "sample",
    "shared",
    "smooth",
    "struct",
    "subroutine",
    "switch",
    "true",
    "uniform",
    "varying",
    "volatile",
    "while",
    "writeonly",
];

const PUNCTUATION: &str = "{}()[];,.=+-*/%<>!&|^~?:";

/// Splits GLSL source into tokens, skipping whitespace and comments.
///
/// The lexer never fails: characters it does not understand are returned as
/// [`TokenKind::Unknown`] tokens so that callers can step over them.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer {
        source,
        offset: 0,
        line: 1,
        column: 1,
    }
}

#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    source: &'src str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    fn peek(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn bump_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.bump();
        }
    }

    fn bump_n(&mut self, count: usize) {
        for _ in 0..count {
            self.bump();
        }
    }

    /// Length of a `\` line continuation at the current position, or 0.
    fn continuation(&self) -> usize {
        let rest = &self.source[self.offset..];
        if rest.starts_with("\\\n") {
            2
        } else if rest.starts_with("\\\r\n") {
            3
        } else {
            0
        }
    }

    /// Skips a `/* */` comment starting at the current position.
    fn block_comment(&mut self) {
        self.bump_n(2);
        while let Some(c) = self.bump() {
            if c == '*' && self.peek() == Some('/') {
                self.bump();
                break;
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let continued = self.continuation();
            if continued > 0 {
                self.bump_n(continued);
                continue;
            }

            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => self.bump_while(|c| c != '\n'),
                (Some('/'), Some('*')) => self.block_comment(),
                _ => break,
            }
        }
    }

    /// Consumes a preprocessor line up to its (unescaped) line break or trailing line comment.
    /// Block comments are part of the directive, even when they span lines.
    fn directive(&mut self) {
        loop {
            let continued = self.continuation();
            if continued > 0 {
                self.bump_n(continued);
                continue;
            }

            let rest = &self.source[self.offset..];
            if rest.is_empty()
                || rest.starts_with('\n')
                || rest.starts_with("\r\n")
                || rest.starts_with("//")
            {
                break;
            }

            if rest.starts_with("/*") {
                self.block_comment();
            } else {
                self.bump();
            }
        }
    }

    fn number(&mut self) {
        let rest = &self.source[self.offset..];
        let hex = rest.starts_with("0x") || rest.starts_with("0X");

        let mut previous = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = !hex && matches!(previous, 'e' | 'E') && matches!(c, '+' | '-');
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || exponent_sign {
                previous = c;
                self.bump();
            } else {
                break;
            }
        }
    }
}

fn classify(word: &str) -> TokenKind {
    if KEYWORDS.contains(&word) {
        TokenKind::Keyword
    } else if word == "void" || types::builtin(word).is_some() {
        TokenKind::TypeName
    } else {
        TokenKind::Identifier
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        self.skip_trivia();

        let (offset, line, column) = (self.offset, self.line, self.column);
        let first = self.peek()?;

        let kind = match first {
            '#' => {
                self.directive();
                TokenKind::Directive
            }
            '"' => {
                self.bump();
                self.bump_while(|c| c != '"' && c != '\n');
                if self.peek() == Some('"') {
                    self.bump();
                }
                TokenKind::String
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_');
                classify(&self.source[offset..self.offset])
            }
            c if c.is_ascii_digit() => {
                self.number();
                TokenKind::Number
            }
            '.' if matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) => {
                self.number();
                TokenKind::Number
            }
            c if PUNCTUATION.contains(c) => {
                self.bump();
                TokenKind::Punct
            }
            _ => {
                self.bump();
                TokenKind::Unknown
            }
        };

        Some(Token {
            kind,
            text: &self.source[offset..self.offset],
            line,
            column,
            offset,
        })
    }
}
