use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::mpsc,
    time::Duration,
};

use anyhow::Context;
use glsl_types::{is_shader, paired_stage, Generation, GenerationError};
use notify::Watcher;

use crate::App;

/// Generates bindings for every shader below `input`, then regenerates them whenever a shader or
/// one of the files it includes changes. Only returns if the watcher fails.
pub fn watch(app: &mut App, input: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        info!(input = %input.display(), "creating input directory");
        std::fs::create_dir_all(input)
            .with_context(|| format!("could not create {}", input.display()))?;
    }

    let mut state = State::default();

    let shaders = walkdir::WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_shader(entry.path()))
        .map(|entry| app.generator.entry_point(entry.path()))
        .collect::<BTreeSet<_>>();
    info!(count = shaders.len(), "generating bindings");
    state.regenerate(shaders, |file| app.run(file));

    let (sender, receiver) = mpsc::channel();
    let debounce = Duration::from_millis(200);

    // dropping the watcher closes the channel
    let mut watcher =
        notify::PollWatcher::new(sender, debounce).context("could not start file watcher")?;
    watcher
        .watch(input, notify::RecursiveMode::Recursive)
        .with_context(|| format!("could not watch {}", input.display()))?;
    info!(input = %input.display(), "watching for changes");

    while let Ok(event) = receiver.recv() {
        let mut changed = BTreeSet::new();
        collect_paths(event, &mut changed);

        // sleep a bit so that related events end up in the same batch
        std::thread::sleep(Duration::from_millis(10));
        while let Ok(event) = receiver.try_recv() {
            collect_paths(event, &mut changed);
        }

        let files = state.affected(&changed, |path| app.generator.entry_point(path));
        if !files.is_empty() {
            state.regenerate(files, |file| app.run(file));
        }
    }

    anyhow::bail!("file watcher stopped")
}

fn collect_paths(event: notify::DebouncedEvent, changed: &mut BTreeSet<PathBuf>) {
    match event {
        notify::DebouncedEvent::Rescan
        | notify::DebouncedEvent::NoticeWrite(_)
        | notify::DebouncedEvent::NoticeRemove(_) => {}
        notify::DebouncedEvent::Error(error, path) => {
            warn!(?path, "file watcher error: {error}")
        }
        notify::DebouncedEvent::Create(path)
        | notify::DebouncedEvent::Write(path)
        | notify::DebouncedEvent::Chmod(path)
        | notify::DebouncedEvent::Remove(path) => {
            changed.insert(path);
        }
        notify::DebouncedEvent::Rename(from, to) => {
            changed.insert(from);
            changed.insert(to);
        }
    }
}

/// What the last generation of every shader found out.
#[derive(Default)]
struct State {
    /// Shaders that included a file, by the canonical path of that file.
    dependents: HashMap<PathBuf, BTreeSet<PathBuf>>,
    /// Shader each output file was generated from.
    outputs: HashMap<PathBuf, PathBuf>,
}

impl State {
    /// Shaders to regenerate after `changed` were modified, as named by `entry_point`.
    fn affected(
        &self,
        changed: &BTreeSet<PathBuf>,
        entry_point: impl Fn(&Path) -> PathBuf,
    ) -> BTreeSet<PathBuf> {
        let mut files = BTreeSet::new();
        for path in changed {
            if is_shader(path) {
                if !path.is_file() {
                    debug!(path = %path.display(), "shader removed");
                }
                // the other stage of a program is generated alone once this one is gone
                let program = std::iter::once(path.clone()).chain(paired_stage(path));
                files.extend(
                    program
                        .filter(|file| file.is_file())
                        .map(|file| entry_point(&file)),
                );
            }

            if let Some(dependents) = self.dependents.get(&canonical(path)) {
                files.extend(
                    dependents
                        .iter()
                        .filter(|file| file.is_file())
                        .map(|file| entry_point(file)),
                );
            }
        }
        files
    }

    fn regenerate(
        &mut self,
        files: BTreeSet<PathBuf>,
        mut generate: impl FnMut(&Path) -> Result<Generation, GenerationError>,
    ) {
        for file in files {
            let generation = match generate(&file) {
                Ok(generation) => generation,
                // old dependencies are kept too, so that undoing a breaking change retries
                Err(error) => {
                    self.depend(&file, error.dependencies);
                    continue;
                }
            };

            if let Some(previous) = self.outputs.get(&generation.output_path) {
                if *previous != file {
                    warn!(
                        output = %generation.output_path.display(),
                        "bindings of {} are overwritten by {}",
                        previous.display(),
                        file.display(),
                    );
                }
            }
            self.outputs
                .insert(generation.output_path.clone(), file.clone());

            for dependents in self.dependents.values_mut() {
                dependents.remove(&file);
            }
            self.depend(&file, generation.dependencies);
        }
    }

    fn depend(&mut self, file: &Path, dependencies: Vec<PathBuf>) {
        for dependency in dependencies {
            self.dependents
                .entry(canonical(&dependency))
                .or_default()
                .insert(file.to_owned());
        }
    }
}

/// Canonical form of `path`, also for files that no longer exist.
fn canonical(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let parent = path.parent().and_then(|parent| {
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        std::fs::canonicalize(parent).ok()
    });
    match (parent, path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path.to_owned(),
    }
}
