//! HTTP route for the badge catalog
//!
//! GET /api/badges - enveloped collection of the static reward metadata.

use hyper::{Response, StatusCode};
use serde_json::Value;
use std::sync::Arc;

use crate::db::schemas::{BadgeDoc, BADGE_COLLECTION};
use crate::envelope;
use crate::query::{self, ListQuery};
use crate::routes::{error_response, forge_error_response, json_response, BoxBody};
use crate::server::AppState;
use crate::types::Result;

fn badge_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["title"] => Some("title"),
        ["gradient"] => Some("gradient"),
        _ => None,
    }
}

/// GET /api/badges
pub async fn handle_list_badges(
    state: Arc<AppState>,
    raw_query: Option<&str>,
) -> Response<BoxBody> {
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

    match list_badges(mongo, &query).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => forge_error_response(&e),
    }
}

async fn list_badges(mongo: &crate::db::MongoClient, query: &ListQuery) -> Result<Value> {
    let filter = match &query.filters {
        Some(tree) => query::filters_to_bson(tree, &badge_fields)?,
        None => bson::Document::new(),
    };
    let sort = query::sort_to_bson(&query.sort, &badge_fields)?;

    let collection = mongo.collection::<BadgeDoc>(BADGE_COLLECTION).await?;
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
        .map(|b| envelope::entity(b.id, b.attributes()))
        .collect();

    Ok(envelope::collection(
        entities,
        query.pagination.start,
        query.pagination.limit,
        total,
    ))
}
