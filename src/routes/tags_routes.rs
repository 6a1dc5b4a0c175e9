//! HTTP routes for tags
//!
//! - GET  /api/tags - enveloped collection; the client looks tags up with
//!   `filters[name][$eq]=<name>`
//! - POST /api/tags - authenticated atomic get-or-create; concurrent creates
//!   of the same name yield the same row

use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{TagDoc, TAG_COLLECTION};
use crate::envelope;
use crate::query::{self, ListQuery};
use crate::routes::{
    authenticate, error_response, forge_error_response, get_auth_header, json_response,
    parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::store::ContentStore;
use crate::types::Result;

/// Storage fields reachable from tag filters and sort
fn tag_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["name"] => Some("name"),
        ["createdAt"] => Some("metadata.created_at"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CreateTagBody {
    data: CreateTagData,
}

#[derive(Debug, Deserialize)]
struct CreateTagData {
    name: String,
}

/// GET /api/tags
pub async fn handle_list_tags(state: Arc<AppState>, raw_query: Option<&str>) -> Response<BoxBody> {
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

    match list_tags(mongo, &query).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => forge_error_response(&e),
    }
}

/// POST /api/tags
pub async fn handle_create_tag(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    if let Err(resp) = authenticate(&state, auth_header.as_deref()) {
        return resp;
    }

    let body: CreateTagBody = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BadRequestError",
                &format!("Invalid JSON body: {}", e),
            )
        }
    };

    let name = body.data.name.trim().to_string();
    if name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "ValidationError", "Name is required");
    }

    let store = match &state.store {
        Some(s) => s,
        None => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailableError",
                "Database not available",
            )
        }
    };

    let existed = match store.tag_by_name(&name).await {
        Ok(found) => found.is_some(),
        Err(e) => return forge_error_response(&e),
    };

    match store.get_or_create_tag(&name).await {
        Ok(tag) => {
            if !existed {
                info!("Tag '{}' created with id {}", tag.name, tag.id);
            }
            let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
            json_response(
                status,
                &envelope::data(envelope::entity(tag.id, tag.attributes())),
            )
        }
        Err(e) => forge_error_response(&e),
    }
}

async fn list_tags(mongo: &crate::db::MongoClient, query: &ListQuery) -> Result<Value> {
    let filter = match &query.filters {
        Some(tree) => query::filters_to_bson(tree, &tag_fields)?,
        None => bson::Document::new(),
    };
    let sort = query::sort_to_bson(&query.sort, &tag_fields)?;

    let collection = mongo.collection::<TagDoc>(TAG_COLLECTION).await?;
    let total = collection.count(filter.clone()).await?;
    let page = collection
        .find_page(
            filter,
            sort,
            Some(query.pagination.limit),
            Some(query.pagination.start),
        )
        .await?;

    let entities: Vec<Value> = page
        .into_iter()
        .map(|t| envelope::entity(t.id, t.attributes()))
        .collect();

    Ok(envelope::collection(
        entities,
        query.pagination.start,
        query.pagination.limit,
        total,
    ))
}
