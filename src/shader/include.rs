use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use super::parser::{self, Include, ParsedUnit, RawDeclaration, RawStruct};
use crate::{
    error::{ErrorKind, Warning},
    source::SourceProvider,
};

/// Declarations and structs of a file merged with everything it includes, includes first.
#[derive(Debug, Default)]
pub struct Resolved {
    pub declarations: Vec<RawDeclaration>,
    pub structs: Vec<RawStruct>,
    /// Canonical paths of the included files, in first-include order.
    pub dependencies: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

/// A failed expansion, with the files the outcome depended on.
#[derive(Debug)]
pub struct Unresolved {
    pub error: ErrorKind,
    /// Canonical paths of the files read so far, followed by the paths that were tried for an
    /// include that could not be found.
    pub dependencies: Vec<PathBuf>,
}

/// Expands the `#include` directives of an already parsed file.
///
/// Includes are looked up relative to the including file, then relative to `input_root`. A file
/// that is already being expanded further up the include chain is skipped with a
/// [`Warning::CyclicInclude`].
pub fn resolve<P: SourceProvider>(
    provider: &P,
    input_root: &Path,
    file: &Path,
    unit: ParsedUnit,
) -> Result<Resolved, Unresolved> {
    let canonical = provider
        .canonicalize(file)
        .map_err(|source| Unresolved {
            error: ErrorKind::Read {
                path: file.to_owned(),
                source,
            },
            dependencies: Vec::new(),
        })?;

    let mut resolver = Resolver {
        provider,
        input_root,
        chain: vec![canonical],
        struct_index: HashMap::new(),
        resolved: Resolved::default(),
    };
    match resolver.merge(file, unit) {
        Ok(()) => Ok(resolver.resolved),
        Err(error) => Err(Unresolved {
            error,
            dependencies: resolver.resolved.dependencies,
        }),
    }
}

struct Resolver<'a, P> {
    provider: &'a P,
    input_root: &'a Path,
    /// Canonical paths of the files currently being expanded.
    chain: Vec<PathBuf>,
    struct_index: HashMap<String, usize>,
    resolved: Resolved,
}

impl<'a, P: SourceProvider> Resolver<'a, P> {
    fn merge(&mut self, file: &Path, unit: ParsedUnit) -> Result<(), ErrorKind> {
        self.resolved.warnings.extend(unit.warnings);

        for include in &unit.includes {
            self.include(file, include)?;
        }

        for definition in unit.structs {
            self.add_struct(definition)?;
        }
        self.resolved.declarations.extend(unit.declarations);

        Ok(())
    }

    fn include(&mut self, from: &Path, include: &Include) -> Result<(), ErrorKind> {
        let target = self.locate(from, include)?;
        let read_error = |source| ErrorKind::Read {
            path: target.clone(),
            source,
        };

        let canonical = self.provider.canonicalize(&target).map_err(read_error)?;
        if self.chain.contains(&canonical) {
            self.resolved.warnings.push(Warning::CyclicInclude {
                path: target,
                location: include.location.clone(),
            });
            return Ok(());
        }

        self.depend_on(&canonical);
        let source = self.provider.read_text(&canonical).map_err(read_error)?;
        let unit = parser::parse(&source, &target)?;

        self.chain.push(canonical);
        let result = self.merge(&target, unit);
        self.chain.pop();
        result
    }

    fn depend_on(&mut self, path: &Path) {
        if !self.resolved.dependencies.iter().any(|known| known == path) {
            self.resolved.dependencies.push(path.to_owned());
        }
    }

    fn locate(&mut self, from: &Path, include: &Include) -> Result<PathBuf, ErrorKind> {
        let relative = Path::new(&include.path);
        let candidates = [
            from.parent().map(|directory| directory.join(relative)),
            Some(self.input_root.join(relative)),
        ];
        let candidates: Vec<PathBuf> = candidates.into_iter().flatten().collect();

        if let Some(found) = candidates
            .iter()
            .find(|candidate| self.provider.exists(candidate))
        {
            return Ok(found.clone());
        }

        // creating any of them would make the include resolve
        for candidate in &candidates {
            self.depend_on(candidate);
        }
        Err(ErrorKind::IncludeNotFound {
            path: include.path.clone(),
            location: include.location.clone(),
        })
    }

    fn add_struct(&mut self, definition: RawStruct) -> Result<(), ErrorKind> {
        if let Some(&index) = self.struct_index.get(&definition.name) {
            let existing = &self.resolved.structs[index];
            if existing.same_fields(&definition) {
                return Ok(());
            }
            return Err(ErrorKind::StructConflict {
                name: definition.name,
                location: definition.location,
                previous: existing.location.clone(),
            });
        }

        self.struct_index
            .insert(definition.name.clone(), self.resolved.structs.len());
        self.resolved.structs.push(definition);
        Ok(())
    }
}
