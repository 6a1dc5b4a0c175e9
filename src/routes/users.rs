//! HTTP routes for users
//!
//! - GET /api/users      - flat user list; leaderboard sorts on rank
//! - GET /api/users/me   - current user from the Bearer token
//! - GET /api/users/{id} - single flat user
//!
//! Users are serialized flat (no envelope), matching the upstream users
//! plugin. `populate=*` embeds the badge relation into the flat objects.

use bson::doc;
use hyper::{Request, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::schemas::{BadgeDoc, UserDoc, USER_COLLECTION};
use crate::query::{self, Populate};
use crate::routes::relations::{badges_by_ids, unique_ids};
use crate::routes::{
    authenticate, error_response, forge_error_response, get_auth_header, json_response,
    not_found_response, BoxBody,
};
use crate::server::AppState;
use crate::types::Result;

/// Storage fields reachable from user filters and sort
fn user_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["username"] => Some("username"),
        ["email"] => Some("email"),
        ["type"] => Some("user_type"),
        ["rank"] => Some("rank"),
        ["weeklyRank"] => Some("weekly_rank"),
        ["skillCoins"] => Some("skill_coins"),
        ["createdAt"] => Some("metadata.created_at"),
        _ => None,
    }
}

/// GET /api/users
pub async fn handle_list_users(state: Arc<AppState>, raw_query: Option<&str>) -> Response<BoxBody> {
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

    let query = match query::parse_query(raw_query, state.args.max_page_size) {
        Ok(q) => q,
        Err(e) => return forge_error_response(&e),
    };

    let result = async {
        let filter = match &query.filters {
            Some(tree) => query::filters_to_bson(tree, &user_fields)?,
            None => bson::Document::new(),
        };
        let sort = query::sort_to_bson(&query.sort, &user_fields)?;

        let collection = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let page = collection
            .find_page(
                filter,
                sort,
                Some(query.pagination.limit),
                Some(query.pagination.start),
            )
            .await?;

        flat_users(mongo, page, &query.populate).await
    }
    .await;

    match result {
        Ok(users) => json_response(StatusCode::OK, &users),
        Err(e) => forge_error_response(&e),
    }
}

/// GET /api/users/me
pub async fn handle_me(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    fetch_user(state, claims.sub, req.uri().query()).await
}

/// GET /api/users/{id}
pub async fn handle_get_user(
    state: Arc<AppState>,
    id_str: &str,
    raw_query: Option<&str>,
) -> Response<BoxBody> {
    let Ok(id) = id_str.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "BadRequestError", "Invalid id");
    };

    fetch_user(state, id, raw_query).await
}

async fn fetch_user(state: Arc<AppState>, id: i64, raw_query: Option<&str>) -> Response<BoxBody> {
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

    let query = match query::parse_query(raw_query, state.args.max_page_size) {
        Ok(q) => q,
        Err(e) => return forge_error_response(&e),
    };

    let result = async {
        let collection = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let Some(user) = collection.find_one(doc! { "id": id }).await? else {
            return Ok(None);
        };
        let mut users = flat_users(mongo, vec![user], &query.populate).await?;
        Ok(users.pop())
    }
    .await;

    match result {
        Ok(Some(user)) => json_response(StatusCode::OK, &user),
        Ok(None) => not_found_response(&format!("/api/users/{}", id)),
        Err(e) => forge_error_response(&e),
    }
}

/// Flat user JSON for a page of users, embedding badges when requested.
async fn flat_users(
    mongo: &crate::db::MongoClient,
    page: Vec<UserDoc>,
    populate: &Populate,
) -> Result<Vec<Value>> {
    let want_badges = populate.wants("badges");

    let badges: HashMap<i64, BadgeDoc> = if want_badges {
        badges_by_ids(
            mongo,
            &unique_ids(page.iter().flat_map(|u| u.badge_ids.iter().copied())),
        )
        .await?
    } else {
        HashMap::new()
    };

    Ok(page
        .into_iter()
        .map(|user| {
            let mut flat = user.to_json();
            if want_badges {
                let earned: Vec<Value> = user
                    .badge_ids
                    .iter()
                    .filter_map(|id| badges.get(id))
                    .map(BadgeDoc::to_json)
                    .collect();
                if let Value::Object(map) = &mut flat {
                    map.insert("badges".to_string(), Value::Array(earned));
                }
            }
            flat
        })
        .collect())
}
