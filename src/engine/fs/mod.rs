//! Filesystem engine.
//!
//! Implements [`Editor`] and [`Player`] over the standard H5P layout:
//!
//! ```text
//! config/h5p.json                         # EngineSettings
//! libraries/<Name>-<major>.<minor>/       # library.json, semantics.json, language/
//! temporary-storage/<kind>/<file>         # editor uploads, referenced as `…#tmp`
//! content/<id>/                           # h5p.json, content.json, media
//! ```
//!
//! Installing libraries from packages is not provided.

mod ajax;
mod content;
mod library;
mod render;
mod settings;

pub use content::ContentStorage;
pub use library::{LibraryMetadata, LibraryStorage};
pub use settings::EngineSettings;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    AjaxGet, AjaxPost, ContentMetadata, Editor, EngineError, EngineFactory, EngineResult,
    LibraryRef, Player, SavedContent,
};
use crate::config::RelayConfig;
use crate::identity::User;

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let text = fs::read_to_string(path).map_err(EngineError::io(path))?;
    serde_json::from_str(&text).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> EngineResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|source| EngineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(EngineError::io(path))
}

// ============================================================================
// factory
// ============================================================================

/// Where the engine finds its settings and storage.
#[derive(Debug, Clone)]
pub struct FsEngineFactory {
    pub settings: PathBuf,
    pub libraries: PathBuf,
    pub temporary: PathBuf,
    pub content: PathBuf,
    pub default_language: String,
}

impl FsEngineFactory {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            settings: config.storage.engine_config.clone(),
            libraries: config.storage.libraries.clone(),
            temporary: config.storage.temporary.clone(),
            content: config.storage.content.clone(),
            default_language: config.engine.default_language.clone(),
        }
    }

    /// Load settings and create missing storage roots.
    pub fn build(&self) -> EngineResult<FsEngine> {
        let settings = EngineSettings::load(&self.settings)?;
        for root in [&self.libraries, &self.temporary, &self.content] {
            fs::create_dir_all(root).map_err(EngineError::io(root))?;
        }

        crate::log!("h5p"; "engine ready ({})", self.settings.display());
        Ok(FsEngine {
            settings,
            libraries: LibraryStorage::new(&self.libraries),
            content: ContentStorage::new(&self.content),
            temporary: self.temporary.clone(),
            default_language: self.default_language.clone(),
        })
    }
}

impl EngineFactory for FsEngineFactory {
    fn editor(&self) -> EngineResult<Arc<dyn Editor>> {
        Ok(Arc::new(self.build()?))
    }

    fn player(&self) -> EngineResult<Arc<dyn Player>> {
        Ok(Arc::new(self.build()?))
    }
}

// ============================================================================
// engine
// ============================================================================

#[derive(Debug)]
pub struct FsEngine {
    settings: EngineSettings,
    libraries: LibraryStorage,
    content: ContentStorage,
    temporary: PathBuf,
    default_language: String,
}

impl FsEngine {
    fn language<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .filter(|l| !l.is_empty())
            .unwrap_or(&self.default_language)
    }

    /// Main library of stored content, pinned to the version it was saved with.
    fn main_library(&self, id: &str, metadata: &ContentMetadata) -> EngineResult<LibraryRef> {
        metadata
            .preloaded_dependencies
            .iter()
            .find(|dep| dep.machine_name == metadata.main_library)
            .cloned()
            .ok_or_else(|| {
                EngineError::InvalidMetadata(format!(
                    "content {id} does not list its main library {:?}",
                    metadata.main_library
                ))
            })
    }
}

impl Editor for FsEngine {
    fn render(&self, content_id: Option<&str>, language: &str, user: &User) -> EngineResult<Value> {
        self.render_editor(content_id, self.language(Some(language)), user)
    }

    fn get_content(&self, content_id: &str, _user: &User) -> EngineResult<Value> {
        let metadata = self.content.metadata(content_id)?;
        let params = self.content.parameters(content_id)?;
        let library = self.main_library(content_id, &metadata)?;

        let h5p = serde_json::to_value(&metadata).map_err(|source| EngineError::Json {
            path: PathBuf::from(content_id),
            source,
        })?;
        Ok(serde_json::json!({
            "h5p": h5p.clone(),
            "library": library.ubername(),
            "params": {
                "params": params,
                "metadata": h5p,
            },
        }))
    }

    fn save_or_update_content(
        &self,
        content_id: Option<&str>,
        params: &Value,
        metadata: &Value,
        library: &str,
        _user: &User,
    ) -> EngineResult<SavedContent> {
        let main: LibraryRef = library.parse()?;
        let dependencies = self.libraries.resolve_dependencies(std::slice::from_ref(&main))?;

        let mut stored: ContentMetadata = serde_json::from_value(metadata.clone())
            .map_err(|e| EngineError::InvalidMetadata(e.to_string()))?;
        stored.main_library = main.machine_name.clone();
        stored.preloaded_dependencies = dependencies.iter().map(LibraryMetadata::library_ref).collect();

        let (id, reserved) = match content_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                if !self.content.exists(id)? {
                    return Err(EngineError::ContentNotFound(id.to_string()));
                }
                (id.to_string(), false)
            }
            None => (self.content.reserve_id()?, true),
        };

        // Files leave temporary storage only once the content that references them is written
        let mut params = params.clone();
        let staged = ContentStorage::stage_temporary_files(&mut params);
        if let Err(e) = self.content.save(&id, &stored, &params) {
            if reserved {
                self.content.release(&id);
            }
            return Err(e);
        }
        self.content
            .commit_temporary_files(&id, &staged, &self.temporary)?;
        crate::debug!("h5p"; "saved content {} ({})", id, main);

        let metadata = serde_json::to_value(&stored).map_err(|source| EngineError::Json {
            path: PathBuf::from(&id),
            source,
        })?;
        Ok(SavedContent { id, metadata })
    }

    fn get_ajax(&self, query: &AjaxGet<'_>, user: &User) -> EngineResult<Value> {
        match query.action {
            "content-type-cache" => self.content_type_cache(user),
            "libraries" => self.library_data(query),
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }

    fn post_ajax(&self, request: &AjaxPost<'_>, user: &User) -> EngineResult<Value> {
        match request.action {
            "libraries" => self.library_overview(request.body),
            "translations" => self.translations(request.body, self.language(request.language)),
            "files" => self.store_temporary_file(request),
            "filter" => self.filter_parameters(request.body),
            "library-install" | "library-upload" => {
                if !user.can_update_and_install_libraries {
                    return Err(EngineError::Forbidden(
                        "user may not install or update libraries",
                    ));
                }
                if request.action == "library-upload" && request.library_file.is_none() {
                    return Err(EngineError::MissingParameter("h5p"));
                }
                Err(EngineError::Unsupported("installing libraries"))
            }
            other => Err(EngineError::UnknownAction(other.to_string())),
        }
    }

    fn list_content(&self, _user: &User) -> EngineResult<Vec<String>> {
        self.content.list()
    }

    fn content_metadata(&self, content_id: &str, _user: &User) -> EngineResult<ContentMetadata> {
        self.content.metadata(content_id)
    }
}

impl Player for FsEngine {
    fn render(&self, content_id: &str, user: &User) -> EngineResult<Value> {
        self.render_player(content_id, user)
    }
}
