//! Installed libraries: `<root>/<machineName>-<major>.<minor>/library.json`.

use std::fs;
use std::path::PathBuf;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::read_json;
use crate::debug;
use crate::engine::{EngineError, EngineResult, LibraryRef};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryFile {
    pub path: String,
}

/// Parsed `library.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryMetadata {
    #[serde(default)]
    pub title: String,
    pub machine_name: String,
    pub major_version: u32,
    pub minor_version: u32,
    #[serde(default)]
    pub patch_version: u32,
    #[serde(default, deserialize_with = "flag")]
    pub runnable: bool,
    #[serde(default)]
    pub preloaded_js: Vec<LibraryFile>,
    #[serde(default)]
    pub preloaded_css: Vec<LibraryFile>,
    #[serde(default)]
    pub preloaded_dependencies: Vec<LibraryRef>,
    #[serde(default)]
    pub editor_dependencies: Vec<LibraryRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LibraryMetadata {
    pub fn library_ref(&self) -> LibraryRef {
        LibraryRef::new(&self.machine_name, self.major_version, self.minor_version)
    }
}

/// `library.json` writes flags as `0`/`1`; accept booleans too.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        _ => false,
    })
}

#[derive(Debug, Clone)]
pub struct LibraryStorage {
    root: PathBuf,
}

impl LibraryStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, library: &LibraryRef) -> PathBuf {
        self.root.join(library.dir_name())
    }

    pub fn is_installed(&self, library: &LibraryRef) -> bool {
        self.dir(library).join("library.json").is_file()
    }

    pub fn load(&self, library: &LibraryRef) -> EngineResult<LibraryMetadata> {
        if !self.is_installed(library) {
            return Err(EngineError::LibraryNotFound(library.ubername()));
        }
        read_json(&self.dir(library).join("library.json"))
    }

    /// Every installed library, sorted by name then version.
    pub fn list(&self) -> EngineResult<Vec<LibraryMetadata>> {
        let entries = fs::read_dir(&self.root).map_err(EngineError::io(&self.root))?;

        let mut libraries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path().join("library.json");
            if !path.is_file() {
                continue;
            }
            match read_json::<LibraryMetadata>(&path) {
                Ok(library) => libraries.push(library),
                Err(e) => debug!("h5p"; "skipping library: {}", e),
            }
        }

        libraries.sort_by(|a, b| {
            (&a.machine_name, a.major_version, a.minor_version).cmp(&(
                &b.machine_name,
                b.major_version,
                b.minor_version,
            ))
        });
        Ok(libraries)
    }

    /// `semantics.json`, or an empty list when the library has none.
    pub fn semantics(&self, library: &LibraryRef) -> EngineResult<Value> {
        let path = self.dir(library).join("semantics.json");
        if path.is_file() {
            read_json(&path)
        } else {
            Ok(Value::Array(Vec::new()))
        }
    }

    /// Raw `language/<language>.json`, if present.
    pub fn language(&self, library: &LibraryRef, language: &str) -> EngineResult<Option<String>> {
        if !crate::utils::path::is_plain_file_name(language) {
            return Ok(None);
        }
        let path = self.dir(library).join("language").join(format!("{language}.json"));
        if !path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(EngineError::io(path))
    }

    /// Language codes with a translation file, sorted.
    pub fn languages(&self, library: &LibraryRef) -> EngineResult<Vec<String>> {
        let dir = self.dir(library).join("language");
        let Ok(entries) = fs::read_dir(&dir) else {
            return Ok(Vec::new());
        };

        let mut languages: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                (path.extension()? == "json")
                    .then(|| path.file_stem()?.to_str().map(str::to_string))
                    .flatten()
            })
            .collect();
        languages.sort();
        Ok(languages)
    }

    /// `roots` and everything they preload, dependencies before dependents.
    ///
    /// Each library appears once; cycles are cut at the first repeat.
    pub fn resolve_dependencies(&self, roots: &[LibraryRef]) -> EngineResult<Vec<LibraryMetadata>> {
        let mut visited = FxHashSet::default();
        let mut ordered = Vec::new();
        for root in roots {
            self.visit(root, &mut visited, &mut ordered)?;
        }
        Ok(ordered)
    }

    fn visit(
        &self,
        library: &LibraryRef,
        visited: &mut FxHashSet<LibraryRef>,
        ordered: &mut Vec<LibraryMetadata>,
    ) -> EngineResult<()> {
        if !visited.insert(library.clone()) {
            return Ok(());
        }

        let metadata = self.load(library)?;
        for dependency in &metadata.preloaded_dependencies {
            self.visit(dependency, visited, ordered)?;
        }
        ordered.push(metadata);
        Ok(())
    }
}

/// URL of a file inside a library directory.
pub fn library_file_url(libraries_url: &str, library: &LibraryRef, file: &str) -> String {
    format!(
        "{}/{}/{}",
        libraries_url.trim_end_matches('/'),
        library.dir_name(),
        file.trim_start_matches('/')
    )
}

/// Preloaded script and stylesheet URLs of `libraries`, in order.
pub fn preloaded_assets(
    libraries_url: &str,
    libraries: &[LibraryMetadata],
) -> (Vec<String>, Vec<String>) {
    let mut scripts = Vec::new();
    let mut styles = Vec::new();
    for library in libraries {
        let lib = library.library_ref();
        scripts.extend(
            library
                .preloaded_js
                .iter()
                .map(|f| library_file_url(libraries_url, &lib, &f.path)),
        );
        styles.extend(
            library
                .preloaded_css
                .iter()
                .map(|f| library_file_url(libraries_url, &lib, &f.path)),
        );
    }
    (scripts, styles)
}
