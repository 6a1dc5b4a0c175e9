//! HTTP routes for SkillForge

pub mod activities;
pub mod auth_routes;
pub mod badges;
pub mod challenges;
pub mod health;
pub mod relations;
pub mod responses;
pub mod tags_routes;
pub mod users;

pub use activities::handle_list_activities;
pub use auth_routes::handle_auth_request;
pub use badges::handle_list_badges;
pub use challenges::{handle_create_challenge, handle_get_challenge, handle_list_challenges};
pub use health::{health_check, version_info};
pub use responses::{handle_create_response, handle_list_responses};
pub use tags_routes::{handle_create_tag, handle_list_tags};
pub use users::{handle_get_user, handle_list_users, handle_me};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::{extract_token_from_header, Claims, JwtValidator};
use crate::envelope;
use crate::server::AppState;
use crate::types::ForgeError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Maximum accepted request body (rich text descriptions included)
const MAX_BODY_BYTES: usize = 65536;

// =============================================================================
// Response helpers
// =============================================================================

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .body(full_body(json))
        .unwrap()
}

/// Error response in the CMS body shape (`{data: null, error: {...}}`)
pub(crate) fn error_response(status: StatusCode, name: &str, message: &str) -> Response<BoxBody> {
    json_response(status, &envelope::error_body(status.as_u16(), name, message))
}

pub(crate) fn not_found_response(path: &str) -> Response<BoxBody> {
    error_response(
        StatusCode::NOT_FOUND,
        "NotFoundError",
        &format!("Not found: {}", path),
    )
}

pub(crate) fn preflight_response() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub(crate) fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

pub(crate) fn empty_body() -> BoxBody {
    Full::new(Bytes::new()).map_err(|never| match never {}).boxed()
}

/// Map an operation error to the CMS error body
pub(crate) fn forge_error_response(err: &ForgeError) -> Response<BoxBody> {
    match err {
        ForgeError::Validation(msg) => {
            error_response(StatusCode::BAD_REQUEST, "ValidationError", msg)
        }
        ForgeError::NotFound(msg) => error_response(StatusCode::NOT_FOUND, "NotFoundError", msg),
        ForgeError::Auth(msg) => error_response(StatusCode::UNAUTHORIZED, "UnauthorizedError", msg),
        ForgeError::Http(msg) => error_response(StatusCode::BAD_REQUEST, "BadRequestError", msg),
        _ => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            "An internal server error occurred",
        ),
    }
}

// =============================================================================
// Request helpers
// =============================================================================

pub(crate) async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, ForgeError> {
    let body = req
        .collect()
        .await
        .map_err(|e| ForgeError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_BODY_BYTES {
        return Err(ForgeError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| ForgeError::Http(format!("Invalid JSON: {}", e)))
}

pub(crate) fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<String> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub(crate) fn get_jwt_validator(state: &AppState) -> JwtValidator {
    JwtValidator::new(state.args.jwt_secret(), state.args.jwt_expiry_seconds)
}

/// Verify the Bearer token; on failure the caller returns the response as-is.
pub(crate) fn authenticate(
    state: &AppState,
    auth_header: Option<&str>,
) -> Result<Claims, Response<BoxBody>> {
    let token = extract_token_from_header(auth_header).ok_or_else(|| {
        error_response(StatusCode::UNAUTHORIZED, "UnauthorizedError", "No token provided")
    })?;

    let jwt = get_jwt_validator(state);
    let result = jwt.verify_token(token);
    if !result.valid {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "UnauthorizedError",
            &result.error.unwrap_or_else(|| "Invalid or expired token".into()),
        ));
    }

    Ok(result.claims.expect("valid token carries claims"))
}
