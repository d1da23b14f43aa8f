//! Editor ajax actions.

use std::fs;

use serde_json::{Map, Value, json};
use tempfile::Builder as TempFileBuilder;

use super::FsEngine;
use super::content::TMP_SUFFIX;
use super::library::preloaded_assets;
use crate::debug;
use crate::engine::{AjaxGet, AjaxPost, EngineError, EngineResult, LibraryRef};
use crate::identity::User;

impl FsEngine {
    /// `GET action=content-type-cache`: runnable installed libraries.
    pub(super) fn content_type_cache(&self, user: &User) -> EngineResult<Value> {
        let libraries: Vec<Value> = self
            .libraries
            .list()?
            .into_iter()
            .filter(|library| library.runnable)
            .map(|library| {
                json!({
                    "id": library.machine_name,
                    "machineName": library.machine_name,
                    "majorVersion": library.major_version,
                    "minorVersion": library.minor_version,
                    "patchVersion": library.patch_version,
                    "title": library.title,
                    "installed": true,
                    "isUpToDate": true,
                    "restricted": false,
                    "canInstall": user.can_install_recommended,
                    "localMajorVersion": library.major_version,
                    "localMinorVersion": library.minor_version,
                    "localPatchVersion": library.patch_version,
                })
            })
            .collect();

        Ok(json!({
            "apiVersion": self.settings.core_api_version,
            "details": null,
            "libraries": libraries,
            "outdated": false,
            "recentlyUsed": [],
            "user": user.kind,
        }))
    }

    /// `GET action=libraries`: everything the editor needs for one library.
    pub(super) fn library_data(&self, query: &AjaxGet<'_>) -> EngineResult<Value> {
        let name = query
            .machine_name
            .ok_or(EngineError::MissingParameter("machineName"))?;
        let major = query
            .major_version
            .ok_or(EngineError::MissingParameter("majorVersion"))?;
        let minor = query
            .minor_version
            .ok_or(EngineError::MissingParameter("minorVersion"))?;
        let library: LibraryRef = format!("{name} {major}.{minor}").parse()?;
        let language = self.language(query.language);

        let metadata = self.libraries.load(&library)?;
        let mut roots = vec![library.clone()];
        roots.extend(metadata.editor_dependencies.iter().cloned());
        let dependencies = self.libraries.resolve_dependencies(&roots)?;
        let libraries_url = self.settings.url(&self.settings.libraries_url);
        let (javascript, css) = preloaded_assets(&libraries_url, &dependencies);

        Ok(json!({
            "name": library.machine_name,
            "version": {
                "major": library.major_version,
                "minor": library.minor_version,
            },
            "title": metadata.title,
            "semantics": self.libraries.semantics(&library)?,
            "language": self.libraries.language(&library, language)?,
            "defaultLanguage": self.libraries.language(&library, &self.default_language)?,
            "languages": self.libraries.languages(&library)?,
            "javascript": javascript,
            "css": css,
            "translations": {},
        }))
    }

    /// `POST action=libraries`: overview of the requested ubernames.
    pub(super) fn library_overview(&self, body: &Value) -> EngineResult<Value> {
        let mut overview = Vec::new();
        for library in requested_libraries(body)? {
            let metadata = match self.libraries.load(&library) {
                Ok(metadata) => metadata,
                Err(EngineError::LibraryNotFound(name)) => {
                    debug!("h5p"; "overview skips {}", name);
                    continue;
                }
                Err(e) => return Err(e),
            };
            overview.push(json!({
                "uberName": library.ubername(),
                "name": metadata.machine_name,
                "majorVersion": metadata.major_version,
                "minorVersion": metadata.minor_version,
                "title": metadata.title,
                "runnable": metadata.runnable,
                "restricted": false,
                "tutorialUrl": "",
                "metadataSettings": metadata.extra.get("metadataSettings"),
            }));
        }
        Ok(Value::Array(overview))
    }

    /// `POST action=translations`: language files keyed by ubername.
    pub(super) fn translations(&self, body: &Value, language: &str) -> EngineResult<Value> {
        let mut translations = Map::new();
        for library in requested_libraries(body)? {
            if let Some(text) = self.libraries.language(&library, language)? {
                translations.insert(library.ubername(), Value::String(text));
            }
        }
        Ok(Value::Object(translations))
    }

    /// `POST action=files`: park an editor upload in temporary storage.
    pub(super) fn store_temporary_file(&self, request: &AjaxPost<'_>) -> EngineResult<Value> {
        let upload = request.file.ok_or(EngineError::MissingParameter("file"))?;

        let kind = media_dir(&upload.mimetype);
        let dir = self.temporary.join(kind);
        fs::create_dir_all(&dir).map_err(EngineError::io(&dir))?;

        let (stem, extension) = split_file_name(&upload.name);
        let file = TempFileBuilder::new()
            .prefix(&format!("{stem}-"))
            .suffix(&extension)
            .tempfile_in(&dir)
            .map_err(EngineError::io(&dir))?;
        upload
            .copy_to(file.path())
            .map_err(EngineError::io(file.path()))?;
        let (_, path) = file.keep().map_err(|e| EngineError::io(&dir)(e.error))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        debug!(
            "h5p";
            "stored {}/{} ({} bytes) for content {}",
            kind,
            file_name,
            upload.size,
            request.content_id.unwrap_or("new")
        );
        Ok(json!({
            "mime": upload.mimetype,
            "path": format!("{kind}/{file_name}{TMP_SUFFIX}"),
        }))
    }

    /// `POST action=filter`: parameters as the editor would store them.
    pub(super) fn filter_parameters(&self, body: &Value) -> EngineResult<Value> {
        match body.get("libraryParameters") {
            Some(Value::String(text)) => serde_json::from_str(text)
                .map_err(|e| EngineError::InvalidMetadata(format!("libraryParameters: {e}"))),
            Some(value) => Ok(value.clone()),
            None => Err(EngineError::MissingParameter("libraryParameters")),
        }
    }
}

/// `libraries` of a POST body as parsed refs.
fn requested_libraries(body: &Value) -> EngineResult<Vec<LibraryRef>> {
    let names = body
        .get("libraries")
        .ok_or(EngineError::MissingParameter("libraries"))?;
    match names {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => name.parse(),
                other => Err(EngineError::InvalidLibraryName(other.to_string())),
            })
            .collect(),
        Value::String(name) => Ok(vec![name.parse()?]),
        other => Err(EngineError::InvalidLibraryName(other.to_string())),
    }
}

fn media_dir(mimetype: &str) -> &'static str {
    match mimetype.split('/').next().unwrap_or_default() {
        "image" => "images",
        "video" => "videos",
        "audio" => "audios",
        _ => "files",
    }
}

/// Sanitized stem and dotted extension of a client file name.
fn split_file_name(name: &str) -> (String, String) {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext),
        _ => (base, ""),
    };

    let clean = |s: &str| -> String {
        s.chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
            .collect()
    };

    let stem = clean(stem);
    let stem = if stem.is_empty() { "file".to_string() } else { stem };
    let extension = clean(extension).to_ascii_lowercase();
    let extension = if extension.is_empty() {
        String::new()
    } else {
        format!(".{extension}")
    };
    (stem, extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Editor;
    use crate::engine::fs::fixtures::{engine, user};
    use crate::upload::UploadedFile;

    fn post<'a>(action: &'a str, body: &'a Value) -> AjaxPost<'a> {
        AjaxPost {
            action,
            body,
            language: None,
            content_id: None,
            file: None,
            library_file: None,
        }
    }

    #[test]
    fn test_content_type_cache_lists_runnable() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let query = AjaxGet {
            action: "content-type-cache",
            ..AjaxGet::default()
        };

        let cache = engine.get_ajax(&query, &user()).unwrap();
        let libraries = cache["libraries"].as_array().unwrap();
        assert_eq!(libraries.len(), 1);
        assert_eq!(libraries[0]["machineName"], "H5P.Column");
        assert_eq!(cache["apiVersion"]["major"], 1);
    }

    #[test]
    fn test_library_data() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let query = AjaxGet {
            action: "libraries",
            machine_name: Some("H5P.Column"),
            major_version: Some("1"),
            minor_version: Some("16"),
            language: Some("de"),
        };

        let data = engine.get_ajax(&query, &user()).unwrap();
        assert_eq!(data["name"], "H5P.Column");
        assert_eq!(data["semantics"][0]["type"], "text");
        assert_eq!(data["languages"], json!(["de"]));
        assert!(data["language"].is_string());
        assert!(data["defaultLanguage"].is_null());
        assert_eq!(
            data["javascript"],
            json!([
                "/h5p/libraries/H5P.Text-1.1/h5p.text.js",
                "/h5p/libraries/H5P.Column-1.16/h5p.column.js"
            ])
        );
    }

    #[test]
    fn test_library_data_requires_version() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let query = AjaxGet {
            action: "libraries",
            machine_name: Some("H5P.Column"),
            ..AjaxGet::default()
        };
        assert!(matches!(
            engine.get_ajax(&query, &user()),
            Err(EngineError::MissingParameter("majorVersion"))
        ));
    }

    #[test]
    fn test_library_overview_skips_missing() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let body = json!({"libraries": ["H5P.Text 1.1", "H5P.Gone 2.0"]});

        let overview = engine.post_ajax(&post("libraries", &body), &user()).unwrap();
        assert_eq!(overview.as_array().unwrap().len(), 1);
        assert_eq!(overview[0]["uberName"], "H5P.Text 1.1");
    }

    #[test]
    fn test_translations() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let body = json!({"libraries": ["H5P.Text 1.1", "H5P.Column 1.16"]});
        let mut request = post("translations", &body);
        request.language = Some("de");

        let translations = engine.post_ajax(&request, &user()).unwrap();
        assert_eq!(translations.as_object().unwrap().len(), 2);

        request.language = Some("fr");
        let none = engine.post_ajax(&request, &user()).unwrap();
        assert!(none.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_files_copies_into_temporary_storage() {
        let (temp, factory) = engine();
        let engine = factory.build().unwrap();
        let upload = UploadedFile::in_memory("file", "My Cat!.PNG", "image/png", b"meow".to_vec());
        let body = json!({});
        let mut request = post("files", &body);
        request.file = Some(&upload);

        let answer = engine.post_ajax(&request, &user()).unwrap();
        let path = answer["path"].as_str().unwrap();
        assert_eq!(answer["mime"], "image/png");
        assert!(path.starts_with("images/MyCat-"));
        assert!(path.ends_with(".png#tmp"));

        let stored = temp
            .path()
            .join("tmp")
            .join(path.trim_end_matches(TMP_SUFFIX));
        assert_eq!(fs::read(stored).unwrap(), b"meow");
    }

    #[test]
    fn test_files_requires_upload() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let body = json!({});
        assert!(matches!(
            engine.post_ajax(&post("files", &body), &user()),
            Err(EngineError::MissingParameter("file"))
        ));
    }

    #[test]
    fn test_filter_parses_parameters() {
        let (_temp, factory) = engine();
        let engine = factory.build().unwrap();
        let body = json!({"libraryParameters": "{\"params\":{\"text\":\"hi\"}}"});

        let filtered = engine.post_ajax(&post("filter", &body), &user()).unwrap();
        assert_eq!(filtered["params"]["text"], "hi");
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(split_file_name("photo.JPG"), ("photo".into(), ".jpg".into()));
        assert_eq!(split_file_name("../../etc/passwd"), ("passwd".into(), String::new()));
        assert_eq!(split_file_name(".bashrc"), ("bashrc".into(), String::new()));
        assert_eq!(split_file_name("???.mp3"), ("file".into(), ".mp3".into()));
    }

    #[test]
    fn test_media_dir() {
        assert_eq!(media_dir("image/png"), "images");
        assert_eq!(media_dir("audio/mpeg"), "audios");
        assert_eq!(media_dir("application/pdf"), "files");
    }
}
