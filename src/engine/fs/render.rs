//! Editor and player page models.

use serde_json::{Map, Value, json};

use super::FsEngine;
use super::library::preloaded_assets;
use crate::engine::{EngineError, EngineResult};
use crate::identity::User;

const CORE_SCRIPTS: &[&str] = &[
    "js/jquery.js",
    "js/h5p.js",
    "js/h5p-event-dispatcher.js",
    "js/h5p-x-api-event.js",
    "js/h5p-x-api.js",
    "js/h5p-content-type.js",
    "js/h5p-confirmation-dialog.js",
    "js/h5p-action-bar.js",
    "js/request-queue.js",
];

const CORE_STYLES: &[&str] = &[
    "styles/h5p.css",
    "styles/h5p-confirmation-dialog.css",
    "styles/h5p-core-button.css",
];

const EDITOR_SCRIPTS: &[&str] = &[
    "scripts/h5p-hub-client.js",
    "scripts/h5peditor.js",
    "scripts/h5peditor-semantic-structure.js",
    "scripts/h5peditor-library-selector.js",
    "scripts/h5peditor-form.js",
    "scripts/h5peditor-text.js",
    "scripts/h5peditor-html.js",
    "scripts/h5peditor-number.js",
    "scripts/h5peditor-textarea.js",
    "scripts/h5peditor-file-uploader.js",
    "scripts/h5peditor-file.js",
    "scripts/h5peditor-image.js",
    "scripts/h5peditor-av.js",
    "scripts/h5peditor-group.js",
    "scripts/h5peditor-boolean.js",
    "scripts/h5peditor-list.js",
    "scripts/h5peditor-list-editor.js",
    "scripts/h5peditor-library.js",
    "scripts/h5peditor-library-list-cache.js",
    "scripts/h5peditor-select.js",
    "scripts/h5peditor-metadata.js",
    "scripts/h5peditor-metadata-author-widget.js",
    "scripts/h5peditor-metadata-changelog-widget.js",
    "scripts/h5peditor-pre-save.js",
    "scripts/h5peditor-editor.js",
    "language/en.js",
];

const EDITOR_STYLES: &[&str] = &[
    "libs/darkroom.css",
    "styles/css/h5p-hub-client.css",
    "styles/css/fonts.css",
    "styles/css/application.css",
    "styles/css/libs/zebra_datepicker.min.css",
];

fn prefixed(base: &str, files: &[&str]) -> Vec<String> {
    let base = base.trim_end_matches('/');
    files.iter().map(|file| format!("{base}/{file}")).collect()
}

impl FsEngine {
    /// Shared `integration` keys of both page models.
    fn integration(&self, user: &User) -> Map<String, Value> {
        let settings = &self.settings;
        let core_url = settings.url(&settings.core_url);

        let mut integration = Map::new();
        integration.insert("baseUrl".into(), json!(settings.base_url));
        integration.insert("url".into(), json!(settings.base_url));
        integration.insert("urlLibraries".into(), json!(settings.url(&settings.libraries_url)));
        integration.insert("postUserStatistics".into(), json!(false));
        integration.insert("saveFreq".into(), json!(false));
        integration.insert("ajaxPath".into(), json!(settings.ajax_path()));
        integration.insert("l10n".into(), json!({}));
        integration.insert("user".into(), json!({"name": user.name, "mail": ""}));
        integration.insert(
            "core".into(),
            json!({
                "scripts": prefixed(&core_url, CORE_SCRIPTS),
                "styles": prefixed(&core_url, CORE_STYLES),
            }),
        );
        integration
    }

    pub(super) fn render_editor(
        &self,
        content_id: Option<&str>,
        language: &str,
        user: &User,
    ) -> EngineResult<Value> {
        if let Some(id) = content_id
            && !self.content.exists(id)?
        {
            return Err(EngineError::ContentNotFound(id.to_string()));
        }

        let settings = &self.settings;
        let core_url = settings.url(&settings.core_url);
        let editor_url = settings.url(&settings.editor_library_url);

        let mut scripts = prefixed(&core_url, CORE_SCRIPTS);
        scripts.extend(prefixed(&editor_url, EDITOR_SCRIPTS));
        let mut styles = prefixed(&core_url, CORE_STYLES);
        styles.extend(prefixed(&editor_url, EDITOR_STYLES));

        let mut integration = self.integration(user);
        integration.insert(
            "editor".into(),
            json!({
                "ajaxPath": settings.ajax_path(),
                "filesPath": settings.url(&settings.temporary_files_url),
                "libraryUrl": editor_url,
                "language": language,
                "defaultLanguage": self.default_language,
                "nodeVersionId": content_id,
                "assets": {
                    "css": styles,
                    "js": scripts,
                },
                "apiVersion": settings.core_api_version,
                "copyrightSemantics": {},
                "metadataSemantics": [],
            }),
        );

        Ok(json!({
            "integration": integration,
            "scripts": scripts,
            "styles": styles,
            "contentId": content_id,
            "urlGenerator": {
                "ajax": settings.ajax_path(),
                "contentFiles": settings.url(&settings.content_files_url),
                "libraries": settings.url(&settings.libraries_url),
            },
        }))
    }

    pub(super) fn render_player(&self, content_id: &str, user: &User) -> EngineResult<Value> {
        let metadata = self.content.metadata(content_id)?;
        let params = self.content.parameters(content_id)?;
        let main = self.main_library(content_id, &metadata)?;
        let dependencies = self
            .libraries
            .resolve_dependencies(std::slice::from_ref(&main))?;

        let settings = &self.settings;
        let core_url = settings.url(&settings.core_url);
        let (library_scripts, library_styles) =
            preloaded_assets(&settings.url(&settings.libraries_url), &dependencies);

        let mut scripts = prefixed(&core_url, CORE_SCRIPTS);
        scripts.extend(library_scripts);
        let mut styles = prefixed(&core_url, CORE_STYLES);
        styles.extend(library_styles);

        let content = json!({
            "library": main.ubername(),
            "jsonContent": params.to_string(),
            "fullScreen": false,
            "contentUrl": format!(
                "{}/{}",
                settings.url(&settings.content_files_url),
                content_id
            ),
            "metadata": metadata,
            "title": metadata.title,
            "displayOptions": {
                "frame": false,
                "export": false,
                "embed": false,
                "copyright": false,
                "icon": false,
            },
            "scripts": scripts,
            "styles": styles,
        });

        let mut contents = Map::new();
        contents.insert(format!("cid-{content_id}"), content);
        let mut integration = self.integration(user);
        integration.insert("contents".into(), Value::Object(contents));

        let ubernames: Vec<String> = dependencies
            .iter()
            .map(|library| library.library_ref().ubername())
            .collect();

        Ok(json!({
            "contentId": content_id,
            "integration": integration,
            "scripts": scripts,
            "styles": styles,
            "dependencies": ubernames,
        }))
    }
}
