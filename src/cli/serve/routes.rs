//! API route table.
//!
//! | Method | Path                      | Collaborator call                  |
//! |--------|---------------------------|------------------------------------|
//! | GET    | `/h5p-editor`             | editor `render(None)`              |
//! | GET    | `/h5p-editor/:contentId`  | editor `render` + `get_content`    |
//! | GET    | `/h5p/ajax`               | editor `get_ajax`                  |
//! | POST   | `/h5p/ajax`               | editor `post_ajax`                 |
//! | POST   | `/h5p/contentUserData`    | none, always `{}`                  |
//! | POST   | `/h5p/new`                | editor `save_or_update_content`    |
//! | GET    | `/h5p-player/:contentId`  | player `render`                    |
//! | GET    | `/h5p/content/:contentId` | editor `content_metadata`          |
//! | GET    | `/h5p/content`            | editor `list_content` + metadata   |
//! | *      | *                         | none, `{status: "ok"}`             |

use percent_encoding::percent_decode_str;
use rayon::prelude::*;
use serde_json::{Value, json};
use tiny_http::Method;

use super::context::AppContext;
use super::request::ApiRequest;
use super::response::ApiResponse;
use crate::engine::{AjaxGet, AjaxPost, EngineError};
use crate::identity::User;
use crate::{debug, log};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    EditorNew,
    EditorEdit(String),
    AjaxGet,
    AjaxPost,
    ContentUserData,
    NewContent,
    Player(String),
    ContentMetadata(String),
    ContentList,
    Fallback,
}

impl Route {
    pub fn resolve(method: &Method, path: &str) -> Self {
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        match (method, segments.as_slice()) {
            (Method::Get, ["h5p-editor"]) => Self::EditorNew,
            (Method::Get, ["h5p-editor", id]) => route_param(id).map_or(Self::Fallback, Self::EditorEdit),
            (Method::Get, ["h5p", "ajax"]) => Self::AjaxGet,
            (Method::Post, ["h5p", "ajax"]) => Self::AjaxPost,
            (Method::Post, ["h5p", "contentUserData"]) => Self::ContentUserData,
            (Method::Post, ["h5p", "new"]) => Self::NewContent,
            (Method::Get, ["h5p-player", id]) => route_param(id).map_or(Self::Fallback, Self::Player),
            (Method::Get, ["h5p", "content"]) => Self::ContentList,
            (Method::Get, ["h5p", "content", id]) => {
                route_param(id).map_or(Self::Fallback, Self::ContentMetadata)
            }
            _ => Self::Fallback,
        }
    }
}

/// Percent-decoded, non-empty path parameter.
fn route_param(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    (!decoded.is_empty()).then(|| decoded.into_owned())
}

/// Route a decoded request to its handler.
pub fn dispatch(ctx: &AppContext, request: &ApiRequest) -> ApiResponse {
    let route = Route::resolve(&request.method, &request.path);
    debug!("serve"; "{} {} -> {:?}", request.method, request.path, route);

    let result = match route {
        Route::EditorNew => editor_new(ctx, request),
        Route::EditorEdit(id) => editor_edit(ctx, request, &id),
        Route::AjaxGet => ajax_get(ctx, request),
        Route::AjaxPost => ajax_post(ctx, request),
        Route::ContentUserData => Ok(ApiResponse::ok(json!({}))),
        Route::NewContent => new_content(ctx, request),
        Route::Player(id) => player(ctx, request, &id),
        Route::ContentMetadata(id) => content_metadata(ctx, request, &id),
        Route::ContentList => content_list(ctx, request),
        Route::Fallback => Ok(ApiResponse::ok(json!({ "status": "ok" }))),
    };

    result.unwrap_or_else(|err| {
        log!("h5p"; "{} {}: {}", request.method, request.path, err);
        ApiResponse::error(err.to_string())
    })
}

type HandlerResult = Result<ApiResponse, EngineError>;

fn principal(ctx: &AppContext, request: &ApiRequest) -> User {
    ctx.identity.principal(request)
}

fn editor_new(ctx: &AppContext, request: &ApiRequest) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let language = ctx.language(request.query("language"));
    let model = editor.render(None, language, &principal(ctx, request))?;
    Ok(ApiResponse::ok(json!({ "model": model })))
}

fn editor_edit(ctx: &AppContext, request: &ApiRequest, id: &str) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let user = principal(ctx, request);
    let language = ctx.language(request.query("language"));

    let mut model = editor.render(Some(id), language, &user)?;
    let content = editor.get_content(id, &user)?;
    if let (Value::Object(model), Value::Object(content)) = (&mut model, content) {
        model.extend(content);
    }
    Ok(ApiResponse::ok(json!({ "model": model })))
}

fn ajax_get(ctx: &AppContext, request: &ApiRequest) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let query = AjaxGet {
        action: request.query("action").unwrap_or_default(),
        machine_name: request.query("machineName"),
        major_version: request.query("majorVersion"),
        minor_version: request.query("minorVersion"),
        language: request.query("language"),
    };
    let result = editor.get_ajax(&query, &principal(ctx, request))?;
    Ok(ApiResponse::ok(result))
}

fn ajax_post(ctx: &AppContext, request: &ApiRequest) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let ajax = AjaxPost {
        action: request.query("action").unwrap_or_default(),
        body: &request.body,
        language: request.query("language"),
        content_id: request.query("id"),
        file: request.files.get("file"),
        library_file: request.files.get("h5p"),
    };
    let result = editor.post_ajax(&ajax, &principal(ctx, request))?;
    Ok(ApiResponse::ok(result))
}

fn new_content(ctx: &AppContext, request: &ApiRequest) -> HandlerResult {
    let body = &request.body;
    let (Some(params), Some(metadata), Some(library)) = (
        body.pointer("/params/params").filter(|v| is_truthy(v)),
        body.pointer("/params/metadata").filter(|v| is_truthy(v)),
        body.get("library").filter(|v| is_truthy(v)),
    ) else {
        return Ok(ApiResponse::malformed());
    };

    let content_id = match body.get("contentId") {
        Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };
    let library = match library {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    };

    let editor = ctx.engines.editor()?;
    let saved = editor.save_or_update_content(
        content_id.as_deref(),
        params,
        metadata,
        &library,
        &principal(ctx, request),
    )?;
    Ok(ApiResponse::ok(json!({
        "contentId": saved.id,
        "metadata": saved.metadata,
    })))
}

fn player(ctx: &AppContext, request: &ApiRequest, id: &str) -> HandlerResult {
    let player = ctx.engines.player()?;
    let model = player.render(id, &principal(ctx, request))?;
    Ok(ApiResponse::ok(json!({ "model": model })))
}

fn content_metadata(ctx: &AppContext, request: &ApiRequest, id: &str) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let metadata = editor.content_metadata(id, &principal(ctx, request))?;
    Ok(ApiResponse::ok(json!({
        "contentId": id,
        "title": metadata.title,
        "language": metadata.language,
        "license": metadata.license,
    })))
}

fn content_list(ctx: &AppContext, request: &ApiRequest) -> HandlerResult {
    let editor = ctx.engines.editor()?;
    let user = principal(ctx, request);
    let ids = editor.list_content(&user)?;

    let data = ids
        .par_iter()
        .map(|id| {
            editor.content_metadata(id, &user).map(|metadata| {
                json!({
                    "id": id,
                    "title": metadata.title,
                    "language": metadata.language,
                    "license": metadata.license,
                })
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ApiResponse::ok(json!({ "data": data })))
}

/// Presence check for required body fields: null, false, 0 and "" count as missing.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
