//! HTTP route for the activity feed
//!
//! GET /api/activities - enveloped collection; profile pages filter on the
//! acting user (`filters[user][id][$eq]=...`) and sort newest-first. With
//! `populate=*` the acting user, challenge, response (with its own parent
//! challenge) and badge relations are embedded.

use hyper::{Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::schemas::{ActivityDoc, BadgeDoc, ChallengeDoc, ResponseDoc, UserDoc, ACTIVITY_COLLECTION};
use crate::envelope;
use crate::query::{self, ListQuery, Populate};
use crate::routes::relations::{
    badges_by_ids, challenges_by_ids, responses_by_ids, unique_ids, users_by_ids,
};
use crate::routes::{error_response, forge_error_response, json_response, BoxBody};
use crate::server::AppState;
use crate::types::Result;

/// Storage fields reachable from activity filters and sort
fn activity_fields(path: &[&str]) -> Option<&'static str> {
    match path {
        ["id"] => Some("id"),
        ["type"] => Some("type"),
        ["user"] | ["user", "id"] => Some("user_id"),
        ["challenge"] | ["challenge", "id"] => Some("challenge_id"),
        ["response"] | ["response", "id"] => Some("response_id"),
        ["createdAt"] => Some("metadata.created_at"),
        _ => None,
    }
}

/// GET /api/activities
pub async fn handle_list_activities(
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

    match list_activities(mongo, &query).await {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => forge_error_response(&e),
    }
}

async fn list_activities(mongo: &crate::db::MongoClient, query: &ListQuery) -> Result<Value> {
    let filter = match &query.filters {
        Some(tree) => query::filters_to_bson(tree, &activity_fields)?,
        None => bson::Document::new(),
    };
    let sort = query::sort_to_bson(&query.sort, &activity_fields)?;

    let collection = mongo.collection::<ActivityDoc>(ACTIVITY_COLLECTION).await?;
    let total = collection.count(filter.clone()).await?;
    let page = collection
        .find_page(
            filter,
            sort,
            Some(query.pagination.limit),
            Some(query.pagination.start),
        )
        .await?;

    let entities = populate_activities(mongo, page, &query.populate).await?;
    Ok(envelope::collection(
        entities,
        query.pagination.start,
        query.pagination.limit,
        total,
    ))
}

/// Build wire envelopes for a page of activities with their relations.
///
/// The response relation nests its own parent challenge, so "answer"
/// activities can render `Responded to "<challenge title>"` without a second
/// round trip.
async fn populate_activities(
    mongo: &crate::db::MongoClient,
    page: Vec<ActivityDoc>,
    populate: &Populate,
) -> Result<Vec<Value>> {
    let want_user = populate.wants("user");
    let want_challenge = populate.wants("challenge");
    let want_response = populate.wants("response");
    let want_badge = populate.wants("badge");

    let users: HashMap<i64, UserDoc> = if want_user {
        users_by_ids(mongo, &unique_ids(page.iter().map(|a| a.user_id))).await?
    } else {
        HashMap::new()
    };

    let responses: HashMap<i64, ResponseDoc> = if want_response {
        responses_by_ids(mongo, &unique_ids(page.iter().filter_map(|a| a.response_id))).await?
    } else {
        HashMap::new()
    };

    // Challenges referenced directly by the activity or through its response
    let challenges: HashMap<i64, ChallengeDoc> = if want_challenge || want_response {
        let direct = page.iter().filter_map(|a| a.challenge_id);
        let via_response = responses.values().map(|r| r.challenge_id);
        challenges_by_ids(mongo, &unique_ids(direct.chain(via_response))).await?
    } else {
        HashMap::new()
    };

    let badges: HashMap<i64, BadgeDoc> = if want_badge {
        badges_by_ids(mongo, &unique_ids(page.iter().filter_map(|a| a.badge_id))).await?
    } else {
        HashMap::new()
    };

    let mut entities = Vec::with_capacity(page.len());
    for activity in page {
        let mut rels: Vec<(&str, Value)> = Vec::new();

        if want_user {
            let user = users
                .get(&activity.user_id)
                .map(|u| envelope::entity(u.id, u.attributes()));
            rels.push(("user", envelope::relation(user)));
        }

        if want_challenge {
            let challenge = activity
                .challenge_id
                .and_then(|id| challenges.get(&id))
                .map(|c| envelope::entity(c.id, c.attributes()));
            rels.push(("challenge", envelope::relation(challenge)));
        }

        if want_response {
            let response = activity.response_id.and_then(|id| responses.get(&id)).map(|r| {
                let parent = challenges
                    .get(&r.challenge_id)
                    .map(|c| envelope::entity(c.id, c.attributes()));
                let attrs = envelope::with_relations(
                    r.attributes(),
                    vec![("challenge", envelope::relation(parent))],
                );
                envelope::entity(r.id, attrs)
            });
            rels.push(("response", envelope::relation(response)));
        }

        if want_badge {
            let badge = activity
                .badge_id
                .and_then(|id| badges.get(&id))
                .map(|b| envelope::entity(b.id, b.attributes()));
            rels.push(("badge", envelope::relation(badge)));
        }

        let attrs = envelope::with_relations(activity.attributes(), rels);
        entities.push(envelope::entity(activity.id, attrs));
    }

    Ok(entities)
}
