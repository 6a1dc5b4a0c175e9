//! HTTP routes for responses
//!
//! - GET  /api/responses - enveloped collection, usually filtered by challenge
//! - POST /api/responses - authenticated create; requires an existing parent
//!   challenge and fans out an "answer" activity

use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{ChallengeDoc, ResponseDoc, UserDoc, RESPONSE_COLLECTION};
use crate::db::sequence;
use crate::envelope;
use crate::hooks;
use crate::query::{self, ListQuery, Populate};
use crate::routes::relations::{challenges_by_ids, unique_ids, users_by_ids};
use crate::routes::{
    authenticate, error_response, forge_error_response, get_auth_header, json_response,
    parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::store::ContentStore;
use crate::types::{ForgeError, Result};
use crate::validate;

/// Storage fields reachable from response filters and sort
fn response_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["upvotes"] => Some("upvotes"),
        ["isAccepted"] => Some("is_accepted"),
        ["author"] | ["author", "id"] => Some("author_id"),
        ["challenge"] | ["challenge", "id"] => Some("challenge_id"),
        ["createdAt"] => Some("metadata.created_at"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponseBody {
    data: CreateResponseData,
}

#[derive(Debug, Deserialize)]
struct CreateResponseData {
    content: String,
    /// Parent challenge id (required)
    challenge: i64,
}

/// GET /api/responses
pub async fn handle_list_responses(
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

    match list_responses(mongo, &query).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => forge_error_response(&e),
    }
}

/// POST /api/responses
pub async fn handle_create_response(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let body: CreateResponseBody = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "BadRequestError",
                &format!("Invalid JSON body: {}", e),
            )
        }
    };
    let data = body.data;

    if let Err(e) = validate::response(&data.content) {
        return forge_error_response(&e);
    }

    let (mongo, store) = match (&state.mongo, &state.store) {
        (Some(m), Some(s)) => (m, s),
        _ => {
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "ServiceUnavailableError",
                "Database not available",
            )
        }
    };

    // A response without an existing parent challenge is invalid
    match store.challenge_by_id(data.challenge).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                "ValidationError",
                &format!("Challenge {} does not exist", data.challenge),
            )
        }
        Err(e) => return forge_error_response(&e),
    }

    let result = async {
        let id = sequence::next_id(mongo, RESPONSE_COLLECTION).await?;
        let response = ResponseDoc::new(id, data.content.clone(), claims.sub, data.challenge);

        let collection = mongo.collection::<ResponseDoc>(RESPONSE_COLLECTION).await?;
        collection.insert_one(response.clone()).await?;
        Ok::<_, ForgeError>(response)
    }
    .await;

    let response_doc = match result {
        Ok(r) => r,
        Err(e) => return forge_error_response(&e),
    };

    info!(
        "Response {} created by user {} on challenge {}",
        response_doc.id, claims.sub, response_doc.challenge_id
    );

    // Activity fan-out; a failure here never fails the create
    if let Err(e) = hooks::response_created(store.as_ref(), response_doc.id).await {
        warn!("Activity fan-out failed for response {}: {}", response_doc.id, e);
    }

    match populate_responses(mongo, vec![response_doc], &Populate::All).await {
        Ok(mut entities) => {
            let entity = entities.pop().unwrap_or(Value::Null);
            json_response(StatusCode::CREATED, &envelope::data(entity))
        }
        Err(e) => forge_error_response(&e),
    }
}

async fn list_responses(mongo: &crate::db::MongoClient, query: &ListQuery) -> Result<Value> {
    let filter = match &query.filters {
        Some(tree) => query::filters_to_bson(tree, &response_fields)?,
        None => bson::Document::new(),
    };
    let sort = query::sort_to_bson(&query.sort, &response_fields)?;

    let collection = mongo.collection::<ResponseDoc>(RESPONSE_COLLECTION).await?;
    let total = collection.count(filter.clone()).await?;
    let page = collection
        .find_page(
            filter,
            sort,
            Some(query.pagination.limit),
            Some(query.pagination.start),
        )
        .await?;

    let entities = populate_responses(mongo, page, &query.populate).await?;
    Ok(envelope::collection(
        entities,
        query.pagination.start,
        query.pagination.limit,
        total,
    ))
}

/// Build wire envelopes for responses, attaching author and parent challenge.
async fn populate_responses(
    mongo: &crate::db::MongoClient,
    page: Vec<ResponseDoc>,
    populate: &Populate,
) -> Result<Vec<Value>> {
    let want_author = populate.wants("author");
    let want_challenge = populate.wants("challenge");

    let authors: HashMap<i64, UserDoc> = if want_author {
        users_by_ids(mongo, &unique_ids(page.iter().map(|r| r.author_id))).await?
    } else {
        HashMap::new()
    };

    let challenges: HashMap<i64, ChallengeDoc> = if want_challenge {
        challenges_by_ids(mongo, &unique_ids(page.iter().map(|r| r.challenge_id))).await?
    } else {
        HashMap::new()
    };

    let mut entities = Vec::with_capacity(page.len());
    for response in page {
        let mut rels: Vec<(&str, Value)> = Vec::new();

        if want_author {
            let author = authors
                .get(&response.author_id)
                .map(|u| envelope::entity(u.id, u.attributes()));
            rels.push(("author", envelope::relation(author)));
        }

        if want_challenge {
            let challenge = challenges
                .get(&response.challenge_id)
                .map(|c| envelope::entity(c.id, c.attributes()));
            rels.push(("challenge", envelope::relation(challenge)));
        }

        let attrs = envelope::with_relations(response.attributes(), rels);
        entities.push(envelope::entity(response.id, attrs));
    }

    Ok(entities)
}
