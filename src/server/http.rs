//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling; one task per
//! connection, shared state behind an Arc.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::routes::{self, BoxBody};
use crate::store::MongoContentStore;
use crate::types::ForgeError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: Option<MongoClient>,
    /// Content store used by the lifecycle operations (fan-out, tag
    /// resolution); present whenever MongoDB is connected
    pub store: Option<Arc<MongoContentStore>>,
}

impl AppState {
    /// Create AppState; the store is derived from the Mongo connection.
    pub fn new(args: Args, mongo: Option<MongoClient>) -> Self {
        let store = mongo
            .as_ref()
            .map(|m| Arc::new(MongoContentStore::new(m.clone())));
        Self { args, mongo, store }
    }
}

/// Run the HTTP server until the process is stopped.
pub async fn run(state: Arc<AppState>) -> Result<(), ForgeError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "SkillForge listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - MongoDB optional, insecure JWT default allowed");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|q| q.to_string());
    let query = query.as_deref();

    info!("[{}] {} {}", addr, method, path);

    // Auth routes (/api/auth/*) consume the request
    if path.starts_with("/api/auth") {
        if let Some(response) = routes::handle_auth_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(routes::not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        // Version info for deployment verification
        (Method::GET, "/version") => to_boxed(routes::version_info()),

        // CORS preflight
        (Method::OPTIONS, _) => routes::preflight_response(),

        // ====================================================================
        // Content API
        // ====================================================================
        (Method::GET, "/api/challenges") => {
            routes::handle_list_challenges(Arc::clone(&state), query).await
        }
        (Method::POST, "/api/challenges") => {
            return Ok(routes::handle_create_challenge(req, Arc::clone(&state)).await);
        }
        (Method::GET, p) if p.starts_with("/api/challenges/") => {
            let id = p.strip_prefix("/api/challenges/").unwrap_or("");
            routes::handle_get_challenge(Arc::clone(&state), id, query).await
        }

        (Method::GET, "/api/responses") => {
            routes::handle_list_responses(Arc::clone(&state), query).await
        }
        (Method::POST, "/api/responses") => {
            return Ok(routes::handle_create_response(req, Arc::clone(&state)).await);
        }

        (Method::GET, "/api/activities") => {
            routes::handle_list_activities(Arc::clone(&state), query).await
        }

        (Method::GET, "/api/users") => {
            routes::handle_list_users(Arc::clone(&state), query).await
        }
        (Method::GET, "/api/users/me") => {
            return Ok(routes::handle_me(req, Arc::clone(&state)).await);
        }
        (Method::GET, p) if p.starts_with("/api/users/") => {
            let id = p.strip_prefix("/api/users/").unwrap_or("");
            routes::handle_get_user(Arc::clone(&state), id, query).await
        }

        (Method::GET, "/api/tags") => routes::handle_list_tags(Arc::clone(&state), query).await,
        (Method::POST, "/api/tags") => {
            return Ok(routes::handle_create_tag(req, Arc::clone(&state)).await);
        }

        (Method::GET, "/api/badges") => {
            routes::handle_list_badges(Arc::clone(&state), query).await
        }

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}

/// Convert a Full<Bytes> response into the boxed body type
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}
