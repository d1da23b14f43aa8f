//! HTTP relay server.
//!
//! Static files under `serve.public_dir` are answered first; every other
//! request is decoded into an [`ApiRequest`] and routed to the editor or
//! player engine.

mod assets;
mod context;
mod lifecycle;
mod path;
mod request;
mod response;
mod routes;

#[cfg(test)]
mod tests;

pub use context::AppContext;
pub use request::{ApiRequest, RequestError, RequestLimits};
pub use response::ApiResponse;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tiny_http::{Method, Request, Server};

use crate::config::{RelayConfig, cfg};
use crate::engine::EngineFactory;
use crate::identity::IdentityProvider;
use crate::upload::SpoolOptions;
use crate::{debug, log};
use lifecycle::SpoolDir;
use routes::Route;

/// Bound server ready to accept requests
pub struct BoundServer {
    server: Arc<Server>,
    addr: SocketAddr,
    context: Arc<AppContext>,
    // Dropped after the request loop, removing a private spool dir.
    spool: SpoolDir,
}

/// Bind the HTTP server without starting the request loop.
pub fn bind_server(
    factory: Arc<dyn EngineFactory>,
    identity: Arc<dyn IdentityProvider>,
) -> Result<BoundServer> {
    let config = cfg();
    let (server, addr) = lifecycle::bind(config.serve.interface, config.serve.port)?;
    let server = Arc::new(server);
    crate::core::register_server(Arc::clone(&server));

    let spool = SpoolDir::prepare(&config.upload)?;
    let limits = request_limits(&config, &spool);
    let context = Arc::new(AppContext::new(config, factory, identity, limits));

    log!("serve"; "http://{}", addr);

    Ok(BoundServer {
        server,
        addr,
        context,
        spool,
    })
}

fn request_limits(config: &RelayConfig, spool: &SpoolDir) -> RequestLimits {
    RequestLimits {
        max_body_size: config.upload.max_body_size,
        spool: SpoolOptions {
            dir: spool.path().map(Into::into),
            max_file_size: config.upload.max_file_size,
            max_field_size: config.upload.max_body_size,
        },
    }
}

impl BoundServer {
    /// Get the bound address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the request loop until the server is unblocked (blocking).
    pub fn run(self) -> Result<()> {
        let workers = self.context.config.serve.workers;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("h5p-relay-worker-{i}"))
            .build()
            .context("Failed to create request thread pool")?;

        // Scoped so in-flight requests finish before the spool dir goes away
        pool.scope(|scope| {
            for request in self.server.incoming_requests() {
                let context = &self.context;
                scope.spawn(move |_| {
                    if let Err(e) = handle_request(request, context) {
                        log!("serve"; "request error: {e}");
                    }
                });
            }
        });

        debug!("serve"; "request loop stopped");
        drop(self.spool);
        Ok(())
    }
}

/// Handle a single HTTP request
fn handle_request(mut request: Request, ctx: &AppContext) -> Result<()> {
    if crate::core::is_shutdown() {
        return response::respond_unavailable(request);
    }

    if matches!(request.method(), Method::Get | Method::Head)
        && let Some(path) = path::resolve_path(request.url(), &ctx.config.serve.public_dir)
    {
        return assets::respond_asset(request, &path, &ctx.config.serve);
    }

    let api = match ApiRequest::read(&mut request, &ctx.limits) {
        Ok(api) => api,
        Err(err) => return reject_body(request, err),
    };

    let response = routes::dispatch(ctx, &api);
    let sent = response.send(request);
    // Uploads are released once the response is out
    drop(api);
    sent
}

/// Answer a request whose body could not be decoded.
fn reject_body(request: Request, err: RequestError) -> Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or_default();

    // contentUserData is acknowledged whatever it carries
    let response = if Route::resolve(request.method(), path) == Route::ContentUserData {
        debug!("serve"; "ignoring undecodable contentUserData body: {err}");
        ApiResponse::ok(serde_json::json!({}))
    } else {
        log!("h5p"; "{} {}: {}", request.method(), path, err);
        ApiResponse::error(err.to_string())
    };
    response.send(request)
}
