mod watch;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use glsl_types::{
    diagnostic::Reporter, FileSystem, Generation, GenerationError, Generator, Language, Warning,
};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[macro_use]
extern crate tracing;

/// Generates typed bindings for the uniforms, inputs, outputs and constants of GLSL shaders.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Arguments {
    /// Directory containing the shaders.
    #[arg(long, default_value = "shaders")]
    input: PathBuf,

    /// Directory the bindings are written to, mirroring the layout of `--input`.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Shader to generate bindings for. Required unless `--watch` is given.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Generate bindings for every shader in `--input` and keep them up to date.
    #[arg(long)]
    watch: bool,

    /// Language of the generated bindings.
    #[arg(long, value_enum, default_value = "ts")]
    language: Language,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let arguments = Arguments::parse();
    debug!(?arguments);

    let mut app = App {
        generator: Generator::new(
            FileSystem,
            &arguments.input,
            &arguments.output,
            arguments.language,
        ),
        reporter: Reporter::new(StandardStream::stderr(ColorChoice::Auto)),
    };

    if arguments.watch {
        return watch::watch(&mut app, &arguments.input);
    }

    let file = match arguments.file {
        Some(file) => file,
        None => anyhow::bail!("no shader given: pass `--file <path>` or `--watch`"),
    };
    if !file.is_file() {
        anyhow::bail!("shader not found: {}", file.display());
    }

    // failures are reported, not turned into an exit status
    let _ = app.run(&file);
    Ok(())
}

struct App {
    generator: Generator<FileSystem>,
    reporter: Reporter<StandardStream>,
}

impl App {
    /// Generates and writes the bindings of one shader, reporting any problems.
    fn run(&mut self, file: &Path) -> Result<Generation, GenerationError> {
        let generation = match self.generator.generate(file) {
            Ok(generation) => generation,
            Err(error) => {
                error!(
                    file = %file.display(),
                    stage = %error.stage,
                    "could not generate bindings"
                );
                if let Err(report_error) = self.reporter.error(self.generator.provider(), &error) {
                    warn!("could not render diagnostic: {report_error}");
                    error!("{error}");
                }
                return Err(error);
            }
        };

        for warning in &generation.warnings {
            self.warn(warning);
        }

        match write_artifact(&generation.output_path, &generation.artifact.contents) {
            Ok(true) => info!(
                file = %file.display(),
                output = %generation.output_path.display(),
                "generated bindings"
            ),
            Ok(false) => debug!(file = %file.display(), "bindings are up to date"),
            Err(error) => error!("{error:#}"),
        }

        Ok(generation)
    }

    fn warn(&mut self, warning: &Warning) {
        if let Err(report_error) = self.reporter.warning(self.generator.provider(), warning) {
            warn!("could not render diagnostic: {report_error}");
            warn!("{warning}");
        }
    }
}

/// Writes `contents` to `path` unless it already holds them. Returns whether the file was written.
fn write_artifact(path: &Path, contents: &str) -> anyhow::Result<bool> {
    if let Ok(existing) = std::fs::read_to_string(path) {
        if existing == contents {
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("could not create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents)
        .with_context(|| format!("could not write {}", path.display()))?;

    Ok(true)
}
