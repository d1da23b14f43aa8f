//! Route table tests against a recording engine.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::{Value, json};
use tiny_http::Method;

use super::response::Body;
use super::routes::{Route, dispatch};
use super::*;
use crate::config::RelayConfig;
use crate::engine::{
    AjaxGet, AjaxPost, ContentMetadata, Editor, EngineError, EngineFactory, EngineResult, Player,
    SavedContent,
};
use crate::identity::{StaticIdentity, User};
use crate::upload::{SpoolOptions, UploadSet, UploadedFile};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Render(Option<String>, String),
    GetContent(String),
    Save {
        id: Option<String>,
        params: Value,
        metadata: Value,
        library: String,
    },
    GetAjax(String),
    PostAjax {
        action: String,
        file: Option<PathBuf>,
    },
    List,
    Metadata(String),
    Play(String),
}

#[derive(Default)]
struct MockEngine {
    calls: Mutex<Vec<Call>>,
    listed: Vec<String>,
    fail_ajax: bool,
}

impl MockEngine {
    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl Editor for MockEngine {
    fn render(&self, content_id: Option<&str>, language: &str, _user: &User) -> EngineResult<Value> {
        self.record(Call::Render(content_id.map(str::to_string), language.to_string()));
        Ok(json!({ "integration": { "l10n": language }, "contentId": content_id }))
    }

    fn get_content(&self, content_id: &str, _user: &User) -> EngineResult<Value> {
        self.record(Call::GetContent(content_id.to_string()));
        Ok(json!({
            "library": "H5P.Text 1.1",
            "params": { "params": { "text": "hi" }, "metadata": { "title": "T" } },
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
        self.record(Call::Save {
            id: content_id.map(str::to_string),
            params: params.clone(),
            metadata: metadata.clone(),
            library: library.to_string(),
        });
        Ok(SavedContent {
            id: content_id.unwrap_or("7").to_string(),
            metadata: metadata.clone(),
        })
    }

    fn get_ajax(&self, query: &AjaxGet<'_>, _user: &User) -> EngineResult<Value> {
        self.record(Call::GetAjax(query.action.to_string()));
        if self.fail_ajax {
            return Err(EngineError::UnknownAction(query.action.to_string()));
        }
        Ok(json!({ "action": query.action, "machineName": query.machine_name }))
    }

    fn post_ajax(&self, request: &AjaxPost<'_>, _user: &User) -> EngineResult<Value> {
        let file = request.file.and_then(|f| f.temp_file_path()).map(PathBuf::from);
        if let Some(path) = &file {
            assert!(path.is_file(), "upload must exist while the engine runs");
        }
        self.record(Call::PostAjax {
            action: request.action.to_string(),
            file,
        });
        Ok(json!({ "ok": true }))
    }

    fn list_content(&self, _user: &User) -> EngineResult<Vec<String>> {
        self.record(Call::List);
        Ok(self.listed.clone())
    }

    fn content_metadata(&self, content_id: &str, _user: &User) -> EngineResult<ContentMetadata> {
        self.record(Call::Metadata(content_id.to_string()));
        Ok(serde_json::from_value(json!({
            "title": format!("Content {content_id}"),
            "mainLibrary": "H5P.Text",
        }))
        .unwrap())
    }
}

impl Player for MockEngine {
    fn render(&self, content_id: &str, _user: &User) -> EngineResult<Value> {
        self.record(Call::Play(content_id.to_string()));
        Ok(json!({ "contentId": content_id }))
    }
}

struct MockFactory {
    engine: Arc<MockEngine>,
    builds: AtomicUsize,
    broken: bool,
}

impl MockFactory {
    fn new(engine: MockEngine) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(engine),
            builds: AtomicUsize::new(0),
            broken: false,
        })
    }
}

impl EngineFactory for MockFactory {
    fn editor(&self) -> EngineResult<Arc<dyn Editor>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(EngineError::Io {
                path: PathBuf::from("config/h5p.json"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        Ok(Arc::clone(&self.engine) as Arc<dyn Editor>)
    }

    fn player(&self) -> EngineResult<Arc<dyn Player>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.engine) as Arc<dyn Player>)
    }
}

fn context(factory: Arc<dyn EngineFactory>) -> AppContext {
    let config = RelayConfig::default();
    let identity = Arc::new(StaticIdentity::from_config(&config.user));
    let limits = RequestLimits {
        max_body_size: 1024,
        spool: SpoolOptions {
            dir: None,
            max_file_size: 1024,
            max_field_size: 1024,
        },
    };
    AppContext::new(Arc::new(config), factory, identity, limits)
}

fn get(url: &str) -> ApiRequest {
    ApiRequest::new(Method::Get, url)
}

fn post(url: &str, body: Value) -> ApiRequest {
    ApiRequest::new(Method::Post, url).with_body(body)
}

#[test]
fn test_route_resolution() {
    assert_eq!(Route::resolve(&Method::Get, "/h5p-editor"), Route::EditorNew);
    assert_eq!(Route::resolve(&Method::Get, "/h5p-editor/"), Route::EditorNew);
    assert_eq!(
        Route::resolve(&Method::Get, "/h5p-editor/12"),
        Route::EditorEdit("12".into())
    );
    assert_eq!(
        Route::resolve(&Method::Get, "/h5p-player/a%20b"),
        Route::Player("a b".into())
    );
    assert_eq!(
        Route::resolve(&Method::Get, "/h5p/content/3"),
        Route::ContentMetadata("3".into())
    );
    assert_eq!(Route::resolve(&Method::Get, "/h5p/content"), Route::ContentList);
    assert_eq!(Route::resolve(&Method::Post, "/h5p/ajax"), Route::AjaxPost);
    assert_eq!(Route::resolve(&Method::Put, "/h5p/ajax"), Route::Fallback);
    assert_eq!(Route::resolve(&Method::Get, "/h5p/new"), Route::Fallback);
    assert_eq!(Route::resolve(&Method::Get, "/h5p-editor/1/2"), Route::Fallback);
}

#[test]
fn test_fallback_answers_ok_without_engine() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    for request in [
        get("/"),
        get("/anything/else?x=1"),
        ApiRequest::new(Method::Delete, "/h5p/content/1"),
        post("/h5p/unknown", json!({})),
    ] {
        let response = dispatch(&ctx, &request);
        assert_eq!(response.status, 200);
        assert_eq!(response.json(), Some(&json!({ "status": "ok" })));
    }
    assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_editor_new_uses_default_language() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    let response = dispatch(&ctx, &get("/h5p-editor"));
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["model"]["integration"]["l10n"], "en");

    dispatch(&ctx, &get("/h5p-editor?language=de"));
    assert_eq!(
        factory.engine.calls(),
        [
            Call::Render(None, "en".into()),
            Call::Render(None, "de".into())
        ]
    );
}

#[test]
fn test_editor_edit_merges_content_into_model() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    let response = dispatch(&ctx, &get("/h5p-editor/5"));
    let model = &response.json().unwrap()["model"];
    assert_eq!(model["contentId"], "5");
    assert_eq!(model["library"], "H5P.Text 1.1");
    assert_eq!(model["params"]["params"]["text"], "hi");
    assert_eq!(model["integration"]["l10n"], "en");
    assert_eq!(
        factory.engine.calls(),
        [
            Call::Render(Some("5".into()), "en".into()),
            Call::GetContent("5".into())
        ]
    );
}

#[test]
fn test_malformed_new_content_skips_engine() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    for body in [
        json!({}),
        json!({ "library": "H5P.Text 1.1", "params": { "metadata": {} } }),
        json!({ "library": "H5P.Text 1.1", "params": { "params": {} } }),
        json!({ "params": { "params": {}, "metadata": {} } }),
        json!({ "library": "", "params": { "params": {}, "metadata": {} } }),
        json!({ "library": "H5P.Text 1.1", "params": { "params": null, "metadata": {} } }),
    ] {
        let response = dispatch(&ctx, &post("/h5p/new", body));
        assert_eq!(response.status, 400);
        assert_eq!(response.body, Body::Text("Malformed request"));
    }
    assert!(factory.engine.calls().is_empty());
}

#[test]
fn test_new_content_saves_once() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    let body = json!({
        "contentId": "42",
        "library": "H5P.Text 1.1",
        "params": { "params": { "text": "x" }, "metadata": { "title": "Hello" } },
    });
    let response = dispatch(&ctx, &post("/h5p/new", body));

    assert_eq!(response.status, 200);
    assert_eq!(
        response.json(),
        Some(&json!({ "contentId": "42", "metadata": { "title": "Hello" } }))
    );
    assert_eq!(
        factory.engine.calls(),
        [Call::Save {
            id: Some("42".into()),
            params: json!({ "text": "x" }),
            metadata: json!({ "title": "Hello" }),
            library: "H5P.Text 1.1".into(),
        }]
    );
}

#[test]
fn test_new_content_without_id_creates() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    let body = json!({
        "library": "H5P.Text 1.1",
        "params": { "params": { "text": "x" }, "metadata": { "title": "Hello" } },
    });
    let response = dispatch(&ctx, &post("/h5p/new", body));

    assert_eq!(response.json().unwrap()["contentId"], "7");
    let calls = factory.engine.calls();
    assert!(matches!(&calls[..], [Call::Save { id: None, .. }]));
}

#[test]
fn test_content_list_keeps_listing_order() {
    let engine = MockEngine {
        listed: vec!["3".into(), "1".into(), "2".into()],
        ..MockEngine::default()
    };
    let ctx = context(MockFactory::new(engine));

    let response = dispatch(&ctx, &get("/h5p/content"));
    let data = response.json().unwrap()["data"].as_array().unwrap().clone();

    let ids: Vec<_> = data.iter().map(|d| d["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["3", "1", "2"]);
    assert_eq!(data[0]["title"], "Content 3");
    assert_eq!(data[0]["language"], "U");
    assert_eq!(data[0]["license"], "U");
}

#[test]
fn test_content_metadata() {
    let ctx = context(MockFactory::new(MockEngine::default()));
    let response = dispatch(&ctx, &get("/h5p/content/9"));
    assert_eq!(
        response.json(),
        Some(&json!({ "contentId": "9", "title": "Content 9", "language": "U", "license": "U" }))
    );
}

#[test]
fn test_ajax_error_is_400() {
    let engine = MockEngine {
        fail_ajax: true,
        ..MockEngine::default()
    };
    let ctx = context(MockFactory::new(engine));

    let response = dispatch(&ctx, &get("/h5p/ajax?action=bogus"));
    assert_eq!(response.status, 400);
    assert_eq!(
        response.json(),
        Some(&json!({ "error": "unknown ajax action `bogus`" }))
    );
}

#[test]
fn test_ajax_get_forwards_query() {
    let ctx = context(MockFactory::new(MockEngine::default()));
    let response = dispatch(
        &ctx,
        &get("/h5p/ajax?action=libraries&machineName=H5P.Text&majorVersion=1&minorVersion=1"),
    );
    assert_eq!(
        response.json(),
        Some(&json!({ "action": "libraries", "machineName": "H5P.Text" }))
    );
}

#[test]
fn test_content_user_data_always_empty_object() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    for body in [json!({}), json!({ "data": "x", "preload": 1 }), json!(null)] {
        let response = dispatch(&ctx, &post("/h5p/contentUserData", body));
        assert_eq!(response.status, 200);
        assert_eq!(response.json(), Some(&json!({})));
    }
    assert_eq!(factory.builds.load(Ordering::SeqCst), 0);
}

#[test]
fn test_uploads_released_after_request() {
    let temp = tempfile::TempDir::new().unwrap();
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    let options = SpoolOptions {
        dir: Some(temp.path().to_path_buf()),
        max_file_size: 1024,
        max_field_size: 1024,
    };
    let mut files = UploadSet::new();
    files.push(UploadedFile::spool("file", "a.png", "image/png", &b"png"[..], &options).unwrap());
    let request = ApiRequest::new(Method::Post, "/h5p/ajax?action=files")
        .with_body(json!({ "contentId": "0", "field": "{}" }))
        .with_files(files);

    let response = dispatch(&ctx, &request);
    assert_eq!(response.status, 200);

    let calls = factory.engine.calls();
    let [Call::PostAjax { action, file: Some(path) }] = &calls[..] else {
        panic!("unexpected calls {calls:?}");
    };
    assert_eq!(action, "files");
    assert!(path.is_file());

    drop(request);
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_handle_failure_is_400_and_retried() {
    let factory = Arc::new(MockFactory {
        engine: Arc::new(MockEngine::default()),
        builds: AtomicUsize::new(0),
        broken: true,
    });
    let ctx = context(factory.clone());

    for _ in 0..2 {
        let response = dispatch(&ctx, &get("/h5p-editor"));
        assert_eq!(response.status, 400);
        assert!(response.json().unwrap()["error"].is_string());
    }
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);

    // The player handle is independent of the broken editor.
    let response = dispatch(&ctx, &get("/h5p-player/1"));
    assert_eq!(response.status, 200);
}

#[test]
fn test_handles_built_once_under_concurrency() {
    let factory = MockFactory::new(MockEngine::default());
    let ctx = context(factory.clone());

    std::thread::scope(|s| {
        for i in 0..8 {
            let ctx = &ctx;
            s.spawn(move || {
                let url = if i % 2 == 0 { "/h5p-editor" } else { "/h5p-player/1" };
                assert_eq!(dispatch(ctx, &get(url)).status, 200);
            });
        }
    });
    assert_eq!(factory.builds.load(Ordering::SeqCst), 2);
}

#[test]
fn test_fs_engine_save_then_list() {
    let (_temp, factory) = crate::engine::fs::fixtures::engine();
    let ctx = context(Arc::new(factory));

    let body = json!({
        "library": "H5P.Text 1.1",
        "params": { "params": { "text": "hello" }, "metadata": { "title": "First" } },
    });
    let saved = dispatch(&ctx, &post("/h5p/new", body));
    assert_eq!(saved.status, 200);
    let id = saved.json().unwrap()["contentId"].as_str().unwrap().to_string();

    let listed = dispatch(&ctx, &get("/h5p/content"));
    assert_eq!(
        listed.json().unwrap()["data"],
        json!([{ "id": id, "title": "First", "language": "U", "license": "U" }])
    );

    let player = dispatch(&ctx, &get(&format!("/h5p-player/{id}")));
    assert_eq!(player.status, 200);
}

#[test]
fn test_fs_engine_parallel_saves_get_distinct_ids() {
    let (_temp, factory) = crate::engine::fs::fixtures::engine();
    let ctx = context(Arc::new(factory));

    let ids: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let ctx = &ctx;
                s.spawn(move || {
                    let body = json!({
                        "library": "H5P.Text 1.1",
                        "params": { "params": { "text": i }, "metadata": { "title": format!("T{i}") } },
                    });
                    let response = dispatch(ctx, &post("/h5p/new", body));
                    assert_eq!(response.status, 200);
                    response.json().unwrap()["contentId"].as_str().unwrap().to_string()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut distinct = ids.clone();
    distinct.sort();
    distinct.dedup();
    assert_eq!(distinct.len(), 16);

    let listed = dispatch(&ctx, &get("/h5p/content"));
    assert_eq!(listed.json().unwrap()["data"].as_array().unwrap().len(), 16);
}
