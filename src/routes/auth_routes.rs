//! HTTP routes for authentication
//!
//! Provides the auth endpoints the web client calls:
//! - POST /api/auth/local          - authenticate, returns `{jwt, user}`
//! - POST /api/auth/local/register - create an account, returns `{jwt, user}`
//! - POST /api/auth/forgot-password - always `{ok: true}`
//!
//! Auth responses carry the user flat (no envelope), and auth request bodies
//! are NOT wrapped in `{data}` - both match the upstream CMS convention.

use bson::doc;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{UserDoc, USER_COLLECTION};
use crate::db::sequence;
use crate::routes::{
    error_response, get_jwt_validator, json_response, parse_json_body, preflight_response, BoxBody,
};
use crate::server::AppState;
use crate::validate;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email or username
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Dispatch /api/auth/* requests. Returns None for unknown auth paths.
pub async fn handle_auth_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match (method, path.as_str()) {
        (Method::POST, "/api/auth/local") => Some(handle_login(req, state).await),
        (Method::POST, "/api/auth/local/register") => Some(handle_register(req, state).await),
        (Method::POST, "/api/auth/forgot-password") => {
            Some(handle_forgot_password(req, state).await)
        }
        (Method::OPTIONS, _) => Some(preflight_response()),
        _ => None,
    }
}

/// POST /api/auth/local
///
/// Flow:
/// 1. Look up user by email or username
/// 2. Verify password hash with argon2
/// 3. Generate and return JWT token with the flat user
async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BadRequestError",
                &format!("Invalid JSON body: {}", e),
            )
        }
    };

    if body.identifier.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "ValidationError",
            "Missing required fields: identifier, password",
        );
    }

    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailableError",
                "Database not available",
            )
        }
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Database error: {}", e),
            )
        }
    };

    // Identifier matches either email or username
    let filter = doc! {
        "$or": [
            { "email": &body.identifier },
            { "username": &body.identifier },
        ],
        "is_active": true,
    };

    let user = match collection.find_one(filter).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!("Login failed - user not found: {}", body.identifier);
            // Generic error to prevent user enumeration
            return error_response(
                StatusCode::BAD_REQUEST,
                "ValidationError",
                "Invalid identifier or password",
            );
        }
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Database error: {}", e),
            )
        }
    };

    let password_valid = match verify_password(&body.password, &user.password_hash) {
        Ok(valid) => valid,
        Err(e) => {
            warn!("Password verification error: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Authentication error",
            );
        }
    };

    if !password_valid {
        warn!("Login failed - invalid password: {}", body.identifier);
        return error_response(
            StatusCode::BAD_REQUEST,
            "ValidationError",
            "Invalid identifier or password",
        );
    }

    info!("Login successful: {}", body.identifier);

    auth_success_response(&state, &user, StatusCode::OK)
}

/// POST /api/auth/local/register
///
/// Flow:
/// 1. Validate username/email/password shape
/// 2. Check for an existing account
/// 3. Hash password with argon2, allocate an id, insert
/// 4. Generate and return JWT token
async fn handle_register(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BadRequestError",
                &format!("Invalid JSON body: {}", e),
            )
        }
    };

    if let Err(e) = validate::registration(&body.username, &body.email, &body.password) {
        return error_response(StatusCode::BAD_REQUEST, "ValidationError", &e.to_string());
    }

    let mongo = match &state.mongo {
        Some(m) => m,
        None => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailableError",
                "Database not available",
            )
        }
    };

    let collection = match mongo.collection::<UserDoc>(USER_COLLECTION).await {
        Ok(c) => c,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Database error: {}", e),
            )
        }
    };

    // Check if the email or username is taken
    let existing = collection
        .find_one(doc! {
            "$or": [
                { "email": &body.email },
                { "username": &body.username },
            ]
        })
        .await;

    match existing {
        Ok(Some(_)) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "ApplicationError",
                "Email or Username are already taken",
            )
        }
        Ok(None) => {}
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Database error: {}", e),
            )
        }
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Failed to hash password: {}", e),
            )
        }
    };

    let id = match sequence::next_id(mongo, USER_COLLECTION).await {
        Ok(id) => id,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                &format!("Database error: {}", e),
            )
        }
    };

    let user = UserDoc::new(id, body.username.clone(), body.email.clone(), password_hash);

    if let Err(e) = collection.insert_one(user.clone()).await {
        // The unique index catches a lost registration race
        let error_str = e.to_string();
        if error_str.contains("duplicate key") || error_str.contains("E11000") {
            return error_response(
                StatusCode::BAD_REQUEST,
                "ApplicationError",
                "Email or Username are already taken",
            );
        }
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalServerError",
            &format!("Failed to create user: {}", e),
        );
    }

    info!("Registered new user: {} ({})", body.username, body.email);

    auth_success_response(&state, &user, StatusCode::OK)
}

/// POST /api/auth/forgot-password
///
/// Acknowledges with `{ok: true}` whether or not the account exists, so the
/// endpoint cannot be used to enumerate users. Reset delivery is handled by
/// an external mailer fed from the log.
async fn handle_forgot_password(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let body: ForgotPasswordRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BadRequestError",
                &format!("Invalid JSON body: {}", e),
            )
        }
    };

    if let Some(mongo) = &state.mongo {
        if let Ok(collection) = mongo.collection::<UserDoc>(USER_COLLECTION).await {
            match collection.find_one(doc! { "email": &body.email }).await {
                Ok(Some(user)) => {
                    info!("Password reset requested for user {}", user.id);
                }
                Ok(None) => {
                    warn!("Password reset requested for unknown email");
                }
                Err(e) => {
                    warn!("Password reset lookup failed: {}", e);
                }
            }
        }
    }

    json_response(StatusCode::OK, &json!({ "ok": true }))
}

/// Issue a token and return the `{jwt, user}` body
fn auth_success_response(
    state: &AppState,
    user: &UserDoc,
    status: StatusCode,
) -> Response<BoxBody> {
    let jwt = get_jwt_validator(state);

    let (token, _expires_at) = match jwt.generate_token(user.id, &user.email) {
        Ok(t) => t,
        Err(e) => {
            warn!("Token generation failed: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Failed to issue token",
            );
        }
    };

    json_response(
        status,
        &json!({
            "jwt": token,
            "user": user.to_json(),
        }),
    )
}
