//! Code units and the loader seam.
//!
//! A [`ModuleLoader`] turns the `library` reference of a descriptor into a
//! [`CodeUnit`], which can be asked for the registration entry point.
//! [`NativeLoader`] serves `builtin:<name>` references from a table of
//! statically linked entry points and everything else through
//! `libloading`.

use std::collections::HashMap;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

use libloading::Library;

use crate::api::{REGISTER_SYMBOL, RegisterFn};

/// Prefix selecting a statically linked plugin.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// A loaded unit of plugin code.
///
/// Dropping the unit may unmap its code, so everything that came out of it
/// (the plugin instance and its commands) must be dropped first.
pub trait CodeUnit {
    /// The registration entry point, if the unit exports one.
    fn entry_point(&self) -> Option<RegisterFn>;

    /// Where the unit came from, for diagnostics.
    fn origin(&self) -> String;
}

/// Opens code units by reference.
pub trait ModuleLoader {
    /// Open `reference`. `base_dir` is the directory of the descriptor that
    /// named it, used to resolve relative paths.
    fn open(&self, reference: &str, base_dir: Option<&Path>) -> Result<Box<dyn CodeUnit>, String>;
}

/// A statically linked plugin.
struct StaticUnit {
    name: String,
    entry: RegisterFn,
}

impl CodeUnit for StaticUnit {
    fn entry_point(&self) -> Option<RegisterFn> {
        Some(self.entry)
    }

    fn origin(&self) -> String {
        format!("{BUILTIN_PREFIX}{}", self.name)
    }
}

/// A dynamic library opened with `libloading`.
struct DylibUnit {
    library: Library,
    path: PathBuf,
}

impl CodeUnit for DylibUnit {
    fn entry_point(&self) -> Option<RegisterFn> {
        // SAFETY: the symbol is declared by `declare_plugin!` with exactly
        // the `RegisterFn` signature. The copied fn pointer is only called
        // while `self.library` is alive.
        let symbol = unsafe { self.library.get::<RegisterFn>(REGISTER_SYMBOL.as_bytes()) };
        match symbol {
            Ok(f) => Some(*f),
            Err(e) => {
                log::debug!("{}: {e}", self.path.display());
                None
            },
        }
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// The default loader: builtin table first, then dynamic libraries.
#[derive(Default)]
pub struct NativeLoader {
    builtins: HashMap<String, RegisterFn>,
    search_dir: Option<PathBuf>,
}

impl NativeLoader {
    /// A loader that searches `search_dir` for bare library names.
    pub fn new(search_dir: Option<PathBuf>) -> Self {
        Self {
            builtins: HashMap::new(),
            search_dir,
        }
    }

    /// Offer a statically linked plugin as `builtin:<name>`.
    pub fn with_builtin(mut self, name: &str, entry: RegisterFn) -> Self {
        self.builtins.insert(name.to_string(), entry);
        self
    }

    pub fn builtin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.builtins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Paths tried for a non-builtin reference, in order.
    ///
    /// 1. the reference itself if it is an explicit path;
    /// 2. relative to the descriptor's directory;
    /// 3. `<search_dir>/<reference>` and the platform library name
    ///    (`lib<name>.so`, `<name>.dll`, ...) in the search directory;
    /// 4. the bare platform library name, left to the OS search path.
    pub fn candidates(&self, reference: &str, base_dir: Option<&Path>) -> Vec<PathBuf> {
        let given = Path::new(reference);
        let mut out = Vec::new();

        if is_explicit_path(reference) {
            push_unique(&mut out, given.to_path_buf());
            if given.is_absolute() {
                return out;
            }
        }
        let platform_name = format!("{DLL_PREFIX}{reference}{DLL_SUFFIX}");
        if let Some(dir) = base_dir {
            push_unique(&mut out, dir.join(reference));
        }
        if let Some(dir) = &self.search_dir {
            push_unique(&mut out, dir.join(reference));
            if given.extension().is_none() {
                push_unique(&mut out, dir.join(&platform_name));
            }
        }
        if given.extension().is_none() {
            push_unique(&mut out, PathBuf::from(platform_name));
        }
        out
    }
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

fn is_explicit_path(reference: &str) -> bool {
    Path::new(reference).is_absolute()
        || reference.starts_with("./")
        || reference.starts_with("../")
        || reference.contains(std::path::MAIN_SEPARATOR)
}

impl ModuleLoader for NativeLoader {
    fn open(&self, reference: &str, base_dir: Option<&Path>) -> Result<Box<dyn CodeUnit>, String> {
        if let Some(name) = reference.strip_prefix(BUILTIN_PREFIX) {
            let entry = self
                .builtins
                .get(name)
                .ok_or_else(|| format!("no builtin plugin named '{name}'"))?;
            return Ok(Box::new(StaticUnit {
                name: name.to_string(),
                entry: *entry,
            }));
        }

        let mut last_error = None;
        for path in self.candidates(reference, base_dir) {
            // Bare names (no directory) go to the OS search path; anything
            // else must exist before we hand it to the dynamic loader.
            if path.parent().is_some_and(|p| !p.as_os_str().is_empty()) && !path.exists() {
                continue;
            }
            // SAFETY: loading a library runs its initializers. Plugin
            // libraries are trusted code chosen by the operator.
            match unsafe { Library::new(&path) } {
                Ok(library) => {
                    log::debug!("Opened plugin library {}", path.display());
                    return Ok(Box::new(DylibUnit { library, path }));
                },
                Err(e) => {
                    log::debug!("Could not open {}: {e}", path.display());
                    last_error = Some(e.to_string());
                },
            }
        }
        Err(last_error.unwrap_or_else(|| "library not found".to_string()))
    }
}
