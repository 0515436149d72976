//! Human readable reports of errors and warnings, with the offending source lines.

use std::{
    collections::HashMap,
    ops::Range,
    path::{Path, PathBuf},
};

use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::{self, SimpleFiles},
    term::{self, termcolor::WriteColor},
};

use crate::{
    error::{ErrorKind, GenerationError, Warning},
    shader::Location,
    source::SourceProvider,
};

/// Writes diagnostics to a terminal (or any other [`WriteColor`]).
pub struct Reporter<W> {
    writer: W,
    config: term::Config,
}

impl<W: WriteColor> Reporter<W> {
    pub fn new(writer: W) -> Self {
        Reporter {
            writer,
            config: term::Config::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Reports every cause of a failed generation.
    pub fn error(
        &mut self,
        provider: &impl SourceProvider,
        error: &GenerationError,
    ) -> Result<(), files::Error> {
        let mut files = Files::new(provider);
        let note = format!(
            "while generating bindings for {} ({})",
            error.file.display(),
            error.stage
        );

        for cause in &error.errors {
            let diagnostic = describe(cause, &mut files).with_notes(vec![note.clone()]);
            term::emit(&mut self.writer, &self.config, &files.files, &diagnostic)?;
        }
        Ok(())
    }

    pub fn warning(
        &mut self,
        provider: &impl SourceProvider,
        warning: &Warning,
    ) -> Result<(), files::Error> {
        let mut files = Files::new(provider);

        let (message, label) = match warning {
            Warning::CyclicInclude { path, .. } => (
                format!("{} is included recursively", path.display()),
                "this include is skipped",
            ),
            Warning::UnresolvedArrayLength { name, .. } => (
                format!("array length of `{name}` is not an integer literal"),
                "treated as dynamically sized",
            ),
        };

        let diagnostic = Diagnostic::warning()
            .with_message(message)
            .with_labels(files.label(warning.location(), label, true).into_iter().collect());
        term::emit(&mut self.writer, &self.config, &files.files, &diagnostic)
    }
}

fn describe<P: SourceProvider>(error: &ErrorKind, files: &mut Files<P>) -> Diagnostic<usize> {
    let mut labels = Vec::new();
    let mut notes = Vec::new();

    let message = match error {
        ErrorKind::Read { path, source } => {
            notes.push(source.to_string());
            format!("could not read {}", path.display())
        }
        ErrorKind::Parse { message, location } => {
            labels.extend(files.label(location, "", true));
            message.clone()
        }
        ErrorKind::UnknownType { name, location } => {
            labels.extend(files.label(location, "not a builtin type or known struct", true));
            format!("unknown type `{name}`")
        }
        ErrorKind::TypeConflict {
            qualifier,
            name,
            first,
            second,
            location,
            previous,
        } => {
            labels.extend(files.label(location, &format!("declared as `{second}` here"), true));
            labels.extend(files.label(previous, &format!("first declared as `{first}`"), false));
            format!("conflicting types for {qualifier} `{name}`")
        }
        ErrorKind::StructConflict {
            name,
            location,
            previous,
        } => {
            labels.extend(files.label(location, "redefined here", true));
            labels.extend(files.label(previous, "previous definition", false));
            format!("struct `{name}` is redefined with different fields")
        }
        ErrorKind::IncludeNotFound { path, location } => {
            labels.extend(files.label(location, "included here", true));
            format!("could not find include \"{path}\"")
        }
        ErrorKind::UnmatchedVarying {
            name,
            stage,
            location,
        } => {
            labels.extend(files.label(location, "not declared by the other stage", true));
            format!("`{name}` is only declared in the {stage}")
        }
    };

    // locations without a readable source still end up in the report
    if labels.is_empty() {
        if let Some(location) = error.location() {
            notes.push(format!("at {location}"));
        }
    }

    Diagnostic::error()
        .with_message(message)
        .with_labels(labels)
        .with_notes(notes)
}

/// Sources of the files mentioned by one diagnostic, loaded on demand.
struct Files<'p, P> {
    provider: &'p P,
    files: SimpleFiles<String, String>,
    ids: HashMap<PathBuf, Option<usize>>,
}

impl<'p, P: SourceProvider> Files<'p, P> {
    fn new(provider: &'p P) -> Self {
        Files {
            provider,
            files: SimpleFiles::new(),
            ids: HashMap::new(),
        }
    }

    fn id(&mut self, path: &Path) -> Option<usize> {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }

        let id = self
            .provider
            .read_text(path)
            .ok()
            .map(|source| self.files.add(path.display().to_string(), source));
        self.ids.insert(path.to_owned(), id);
        id
    }

    fn label(&mut self, location: &Location, message: &str, primary: bool) -> Option<Label<usize>> {
        let id = self.id(&location.file)?;
        let source = self.files.get(id).ok()?.source();
        let range = clamp(location.range.clone(), source.len());

        let label = if primary {
            Label::primary(id, range)
        } else {
            Label::secondary(id, range)
        };
        Some(label.with_message(message))
    }
}

/// Keeps a stale range (the file changed since it was parsed) inside the source.
fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Stage,
        shader::{
            types::{GlslType, Scalar},
            Qualifier, ShaderStage,
        },
        source::InMemory,
    };
    use codespan_reporting::term::termcolor::NoColor;

    fn location(file: &str, line: u32, column: u32, range: Range<usize>) -> Location {
        Location {
            file: PathBuf::from(file),
            line,
            column,
            range,
        }
    }

    fn render(report: impl FnOnce(&mut Reporter<NoColor<Vec<u8>>>)) -> String {
        let mut reporter = Reporter::new(NoColor::new(Vec::new()));
        report(&mut reporter);
        String::from_utf8(reporter.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn unknown_type_shows_source() {
        let sources = InMemory::new().with("bad.frag", "uniform foo x;\n");
        let error = GenerationError::single(
            "bad.frag",
            Stage::TypeResolution,
            ErrorKind::UnknownType {
                name: "foo".into(),
                location: location("bad.frag", 1, 9, 8..11),
            },
        );

        let output = render(|reporter| reporter.error(&sources, &error).unwrap());
        assert!(output.contains("error: unknown type `foo`"), "{output}");
        assert!(output.contains("bad.frag:1:9"), "{output}");
        assert!(output.contains("uniform foo x;"), "{output}");
        assert!(output.contains("type resolution"), "{output}");
    }

    #[test]
    fn conflict_points_at_both_declarations() {
        let sources = InMemory::new()
            .with("a.frag", "#include \"b.glsl\"\nuniform vec3 x;\n")
            .with("b.glsl", "uniform float x;\n");
        let error = GenerationError::single(
            "a.frag",
            Stage::Building,
            ErrorKind::TypeConflict {
                qualifier: Qualifier::Uniform,
                name: "x".into(),
                first: GlslType::Scalar(Scalar::Float),
                second: GlslType::Vector(Scalar::Float, 3),
                location: location("a.frag", 2, 14, 31..32),
                previous: location("b.glsl", 1, 15, 14..15),
            },
        );

        let output = render(|reporter| reporter.error(&sources, &error).unwrap());
        assert!(output.contains("conflicting types for uniform `x`"), "{output}");
        assert!(output.contains("a.frag:2:14"), "{output}");
        assert!(output.contains("b.glsl"), "{output}");
        assert!(output.contains("first declared as `float`"), "{output}");
    }

    #[test]
    fn unmatched_varying_names_its_stage() {
        let sources = InMemory::new().with("quad.frag", "in float fog;\n");
        let error = GenerationError::single(
            "quad.vert",
            Stage::Linking,
            ErrorKind::UnmatchedVarying {
                name: "fog".into(),
                stage: ShaderStage::Fragment,
                location: location("quad.frag", 1, 10, 9..12),
            },
        );

        let output = render(|reporter| reporter.error(&sources, &error).unwrap());
        assert!(
            output.contains("`fog` is only declared in the fragment shader"),
            "{output}"
        );
        assert!(output.contains("quad.frag:1:10"), "{output}");
        assert!(output.contains("linking"), "{output}");
    }

    #[test]
    fn missing_source_falls_back_to_note() {
        let error = GenerationError::single(
            "gone.frag",
            Stage::Parsing,
            ErrorKind::Parse {
                message: "expected `;`".into(),
                location: location("gone.frag", 3, 1, 40..41),
            },
        );

        let output = render(|reporter| reporter.error(&InMemory::new(), &error).unwrap());
        assert!(output.contains("expected `;`"), "{output}");
        assert!(output.contains("at gone.frag:3:1"), "{output}");
    }

    #[test]
    fn warnings() {
        let sources = InMemory::new().with("a.glsl", "#include \"a.glsl\"\n");
        let warning = Warning::CyclicInclude {
            path: PathBuf::from("a.glsl"),
            location: location("a.glsl", 1, 1, 0..17),
        };

        let output = render(|reporter| reporter.warning(&sources, &warning).unwrap());
        assert!(output.contains("warning: a.glsl is included recursively"), "{output}");
        assert!(output.contains("this include is skipped"), "{output}");
    }

    #[test]
    fn stale_ranges_are_clamped() {
        assert_eq!(clamp(2..8, 5), 2..5);
        assert_eq!(clamp(7..9, 5), 5..5);
        assert_eq!(clamp(1..3, 5), 1..3);
    }
}
