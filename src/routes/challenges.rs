//! HTTP routes for challenges
//!
//! - GET  /api/challenges       - enveloped collection with filters/sort/populate
//! - GET  /api/challenges/{id}  - single envelope, relations populated
//! - POST /api/challenges       - authenticated create; resolves free-text tag
//!   names and fans out a "challenge" activity

use hyper::{Request, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{
    Category, ChallengeDoc, Difficulty, ResponseDoc, TagDoc, UserDoc, CHALLENGE_COLLECTION,
};
use crate::db::sequence;
use crate::envelope;
use crate::hooks;
use crate::query::{self, ListQuery, Populate};
use crate::routes::relations::{
    responses_for_challenges, tags_by_ids, unique_ids, users_by_ids,
};
use crate::routes::{
    authenticate, error_response, forge_error_response, get_auth_header, json_response,
    not_found_response, parse_json_body, BoxBody,
};
use crate::server::AppState;
use crate::tags;
use crate::types::{ForgeError, Result};
use crate::validate;

/// Storage fields reachable from challenge filters and sort
fn challenge_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["title"] => Some("title"),
        ["difficulty"] => Some("difficulty"),
        ["category"] => Some("category"),
        ["upvotes"] => Some("upvotes"),
        ["author"] | ["author", "id"] => Some("author_id"),
        ["tags"] | ["tags", "id"] => Some("tag_ids"),
        ["createdAt"] => Some("metadata.created_at"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct CreateChallengeBody {
    data: CreateChallengeData,
}

#[derive(Debug, Deserialize)]
struct CreateChallengeData {
    title: String,
    description: String,
    difficulty: Difficulty,
    category: Category,
    /// Free-text tag names; resolved to ids inside the request
    #[serde(default)]
    tags: Vec<String>,
}

/// GET /api/challenges
pub async fn handle_list_challenges(
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

    match list_challenges(mongo, &query).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => forge_error_response(&e),
    }
}

/// GET /api/challenges/{id}
pub async fn handle_get_challenge(
    state: Arc<AppState>,
    id_str: &str,
    raw_query: Option<&str>,
) -> Response<BoxBody> {
    let Ok(id) = id_str.parse::<i64>() else {
        return error_response(StatusCode::BAD_REQUEST, "BadRequestError", "Invalid id");
    };

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

    // The detail page renders author, tags and responses; populate them all
    // unless the caller narrowed the selection.
    let populate = match query.populate {
        Populate::None => Populate::All,
        other => other,
    };

    let result = async {
        let collection = mongo.collection::<ChallengeDoc>(CHALLENGE_COLLECTION).await?;
        let Some(challenge) = collection.find_one(bson::doc! { "id": id }).await? else {
            return Ok(None);
        };
        let entities = populate_challenges(mongo, vec![challenge], &populate).await?;
        Ok(entities.into_iter().next())
    }
    .await;

    match result {
        Ok(Some(entity)) => json_response(StatusCode::OK, &envelope::data(entity)),
        Ok(None) => not_found_response(&format!("/api/challenges/{}", id)),
        Err(e) => forge_error_response(&e),
    }
}

/// POST /api/challenges
pub async fn handle_create_challenge(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    // Take the auth header before the body parse consumes the request
    let auth_header = get_auth_header(&req);
    let claims = match authenticate(&state, auth_header.as_deref()) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let body: CreateChallengeBody = match parse_json_body(req).await {
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

    if let Err(e) = validate::challenge(&data.title, &data.description) {
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

    // Resolve free-text tag names to ids (atomic get-or-create per name)
    let tag_ids = match tags::resolve_tags(store.as_ref(), &data.tags).await {
        Ok(ids) => ids,
        Err(e) => return forge_error_response(&e),
    };

    let result = async {
        let id = sequence::next_id(mongo, CHALLENGE_COLLECTION).await?;
        let challenge = ChallengeDoc::new(
            id,
            data.title.clone(),
            data.description.clone(),
            claims.sub,
            tag_ids,
            data.difficulty,
            data.category,
        );

        let collection = mongo.collection::<ChallengeDoc>(CHALLENGE_COLLECTION).await?;
        collection.insert_one(challenge.clone()).await?;
        Ok::<_, ForgeError>(challenge)
    }
    .await;

    let challenge: ChallengeDoc = match result {
        Ok(c) => c,
        Err(e) => return forge_error_response(&e),
    };

    info!("Challenge {} created by user {}", challenge.id, claims.sub);

    // Activity fan-out; a failure here never fails the create
    if let Err(e) = hooks::challenge_created(store.as_ref(), challenge.id).await {
        warn!("Activity fan-out failed for challenge {}: {}", challenge.id, e);
    }

    match populate_challenges(mongo, vec![challenge], &Populate::All).await {
        Ok(mut entities) => {
            let entity = entities.pop().unwrap_or(Value::Null);
            json_response(StatusCode::CREATED, &envelope::data(entity))
        }
        Err(e) => forge_error_response(&e),
    }
}

async fn list_challenges(
    mongo: &crate::db::MongoClient,
    query: &ListQuery,
) -> Result<Value> {
    let filter = match &query.filters {
        Some(tree) => query::filters_to_bson(tree, &challenge_fields)?,
        None => bson::Document::new(),
    };
    let sort = query::sort_to_bson(&query.sort, &challenge_fields)?;

    let collection = mongo.collection::<ChallengeDoc>(CHALLENGE_COLLECTION).await?;
    let total = collection.count(filter.clone()).await?;
    let page = collection
        .find_page(
            filter,
            sort,
            Some(query.pagination.limit),
            Some(query.pagination.start),
        )
        .await?;

    let entities = populate_challenges(mongo, page, &query.populate).await?;
    Ok(envelope::collection(
        entities,
        query.pagination.start,
        query.pagination.limit,
        total,
    ))
}

/// Build wire envelopes for a page of challenges, attaching the requested
/// relations (author, tags, responses and, transitively, response authors).
async fn populate_challenges(
    mongo: &crate::db::MongoClient,
    page: Vec<ChallengeDoc>,
    populate: &Populate,
) -> Result<Vec<Value>> {
    let want_author = populate.wants("author");
    let want_tags = populate.wants("tags");
    let want_responses = populate.wants("responses");

    let authors: HashMap<i64, UserDoc> = if want_author {
        users_by_ids(mongo, &unique_ids(page.iter().map(|c| c.author_id))).await?
    } else {
        HashMap::new()
    };

    let tag_map: HashMap<i64, TagDoc> = if want_tags {
        tags_by_ids(
            mongo,
            &unique_ids(page.iter().flat_map(|c| c.tag_ids.iter().copied())),
        )
        .await?
    } else {
        HashMap::new()
    };

    let mut responses_by_challenge: HashMap<i64, Vec<ResponseDoc>> = HashMap::new();
    let mut response_authors: HashMap<i64, UserDoc> = HashMap::new();
    if want_responses {
        let challenge_ids: Vec<i64> = page.iter().map(|c| c.id).collect();
        let responses = responses_for_challenges(mongo, &challenge_ids).await?;
        response_authors =
            users_by_ids(mongo, &unique_ids(responses.iter().map(|r| r.author_id))).await?;
        for response in responses {
            responses_by_challenge
                .entry(response.challenge_id)
                .or_default()
                .push(response);
        }
    }

    let mut entities = Vec::with_capacity(page.len());
    for challenge in page {
        let mut rels: Vec<(&str, Value)> = Vec::new();

        if want_author {
            let author = authors
                .get(&challenge.author_id)
                .map(|u| envelope::entity(u.id, u.attributes()));
            rels.push(("author", envelope::relation(author)));
        }

        if want_tags {
            let tag_entities: Vec<Value> = challenge
                .tag_ids
                .iter()
                .filter_map(|id| tag_map.get(id))
                .map(|t| envelope::entity(t.id, t.attributes()))
                .collect();
            rels.push(("tags", envelope::relation_many(tag_entities)));
        }

        if want_responses {
            let response_entities: Vec<Value> = responses_by_challenge
                .remove(&challenge.id)
                .unwrap_or_default()
                .into_iter()
                .map(|r| {
                    let author = response_authors
                        .get(&r.author_id)
                        .map(|u| envelope::entity(u.id, u.attributes()));
                    let attrs = envelope::with_relations(
                        r.attributes(),
                        vec![("author", envelope::relation(author))],
                    );
                    envelope::entity(r.id, attrs)
                })
                .collect();
            rels.push(("responses", envelope::relation_many(response_entities)));
        }

        let attrs = envelope::with_relations(challenge.attributes(), rels);
        entities.push(envelope::entity(challenge.id, attrs));
    }

    Ok(entities)
}
