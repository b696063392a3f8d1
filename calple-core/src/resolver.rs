//! Viewport resolution: which events render in a given month.
//!
//! Visibility cannot be expressed as one store query: the store serves at
//! most one access-path predicate (ownership equality or membership
//! array-contains) plus one single-field range per query. Resolution
//! therefore fans out into up to four queries whose merged union is
//! filtered in memory. The queries only bound fetched volume - inclusion
//! is always decided by the overlap and annual-recurrence rules here, so a
//! richer query engine could collapse the fan-out without changing results.

use tracing::warn;

use crate::date::Viewport;
use crate::dday::{DDAYS, DDay};
use crate::merge;
use crate::store::{DocumentStore, Query};

/// Build the access-path queries for one viewport resolution:
///
/// 1. owned, starting inside the month
/// 2. shared-with, starting inside the month
/// 3. owned, started before the month
/// 4. shared-with, started before the month
///
/// The reversed pair (3, 4) covers multi-day spans reaching into the
/// viewport, annual events from prior years, and unscheduled items, which
/// persist an empty date string that sorts below every real date.
fn plan(user_email: &str, viewport: Viewport) -> Vec<Query> {
    let first = viewport.first_day().compact();
    let last = viewport.last_day().compact();
    vec![
        Query::new()
            .field_eq("createdBy", user_email)
            .range_between("date", first.as_str(), last.as_str()),
        Query::new()
            .array_contains("connectedUsers", user_email)
            .range_between("date", first.as_str(), last.as_str()),
        Query::new()
            .field_eq("createdBy", user_email)
            .range_below("date", first.as_str()),
        Query::new()
            .array_contains("connectedUsers", user_email)
            .range_below("date", first.as_str()),
    ]
}

/// Should this event render in the viewport month?
fn matches_viewport(dday: &DDay, viewport: Viewport) -> bool {
    let Some(span) = dday.span() else {
        // Unscheduled items render regardless of the month shown.
        return true;
    };
    if dday.is_annual {
        // Year-agnostic: an anniversary renders every year in its month.
        return span.start.month() == viewport.month();
    }
    span.overlaps(&viewport.span())
}

/// Fill in the resolved span endpoints: end defaults to start.
fn annotate_span(mut dday: DDay) -> DDay {
    if dday.end_date.is_none() {
        dday.end_date = dday.date;
    }
    dday
}

/// Resolve the events visible to `user_email` in `viewport`.
///
/// Queries run sequentially; a failing access path contributes a logged,
/// empty result instead of aborting the resolution, so the caller loses at
/// most the events behind that one path. Result order is unspecified.
pub async fn resolve_viewport(
    store: &dyn DocumentStore,
    user_email: &str,
    viewport: Viewport,
) -> Vec<DDay> {
    let mut batches = Vec::new();
    for query in plan(user_email, viewport) {
        match store.query(DDAYS, &query).await {
            Ok(docs) => batches.push(docs),
            Err(err) => {
                warn!(
                    user = user_email,
                    view = %viewport,
                    error = %err,
                    "access-path query failed; serving partial results"
                );
                batches.push(Vec::new());
            }
        }
    }

    let mut visible = Vec::new();
    for doc in merge::dedup_documents(batches) {
        let id = doc.id.clone();
        let dday = match DDay::from_document(doc) {
            Ok(dday) => dday,
            Err(err) => {
                warn!(event = %id, error = %err, "skipping malformed event document");
                continue;
            }
        };
        if matches_viewport(&dday, viewport) {
            visible.push(annotate_span(dday));
        }
    }
    visible
}
