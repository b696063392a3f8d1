//! Shared calendar events ("d-days") and their CRUD operations.
//!
//! Event documents have been through several schema revisions: `group`,
//! `endDate` and even `isAnnual` are missing on older documents, and later
//! revisions made the start date optional to support unscheduled items.
//! Decoding therefore defaults every field the revision history allows to
//! be absent instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};

use crate::connection;
use crate::date::{CalDate, DaySpan};
use crate::error::{CalpleError, CalpleResult};
use crate::store::{Document, DocumentStore, Fields};

pub const DDAYS: &str = "ddays";

/// A calendar event shared between paired users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DDay {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Category label used for calendar grouping.
    #[serde(default)]
    pub group: String,
    /// Start date; `None` for unscheduled items placed without a day.
    #[serde(default, with = "optional_caldate")]
    pub date: Option<CalDate>,
    /// Inclusive end of the span; resolves to `date` when absent.
    #[serde(default, with = "optional_caldate")]
    pub end_date: Option<CalDate>,
    #[serde(default)]
    pub is_annual: bool,
    /// Owner email. Immutable, and never a member of `connectedUsers`.
    pub created_by: String,
    #[serde(default)]
    pub connected_users: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DDay {
    /// Decode a stored document, defaulting fields older schema revisions
    /// lack.
    pub fn from_document(doc: Document) -> CalpleResult<Self> {
        let id = doc.id;
        let mut dday: DDay = serde_json::from_value(Value::Object(doc.fields))
            .map_err(|e| {
                CalpleError::Validation(format!("Malformed event document {id}: {e}"))
            })?;
        dday.id = id;
        Ok(dday)
    }

    /// Effective day span: end defaults to start. `None` when unscheduled.
    pub fn span(&self) -> Option<DaySpan> {
        let start = self.date?;
        Some(DaySpan::new(start, self.end_date.unwrap_or(start)))
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), json!(self.title));
        fields.insert("description".into(), json!(self.description));
        fields.insert("group".into(), json!(self.group));
        fields.insert("date".into(), json!(compact_or_empty(self.date)));
        fields.insert("endDate".into(), json!(compact_or_empty(self.end_date)));
        fields.insert("isAnnual".into(), json!(self.is_annual));
        fields.insert("createdBy".into(), json!(self.created_by));
        fields.insert("connectedUsers".into(), json!(self.connected_users));
        fields.insert("createdAt".into(), json!(self.created_at));
        fields.insert("updatedAt".into(), json!(self.updated_at));
        fields
    }
}

/// Unscheduled items persist an empty date string so the store's range
/// queries still surface them (empty sorts below every `YYYYMMDD` value).
fn compact_or_empty(date: Option<CalDate>) -> String {
    date.map(|d| d.compact()).unwrap_or_default()
}

mod optional_caldate {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<CalDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&compact_or_empty(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<CalDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref() {
            None | Some("") => Ok(None),
            Some(s) => CalDate::parse(s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}

/// Distinguishes "field not sent" from "field cleared with an empty value".
fn patched_caldate<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Option<CalDate>>, D::Error> {
    optional_caldate::deserialize(deserializer).map(Some)
}

/// Fields accepted when creating an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDDay {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub group: String,
    #[serde(default, with = "optional_caldate")]
    pub date: Option<CalDate>,
    #[serde(default, with = "optional_caldate")]
    pub end_date: Option<CalDate>,
    #[serde(default)]
    pub is_annual: bool,
    #[serde(default)]
    pub connected_users: Vec<String>,
}

/// Partial update: only provided fields change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DDayPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    #[serde(default, deserialize_with = "patched_caldate")]
    pub date: Option<Option<CalDate>>,
    #[serde(default, deserialize_with = "patched_caldate")]
    pub end_date: Option<Option<CalDate>>,
    pub is_annual: Option<bool>,
    pub connected_users: Option<Vec<String>>,
}

fn validate_title(title: &str) -> CalpleResult<()> {
    if title.trim().is_empty() {
        return Err(CalpleError::Validation("Title is required".into()));
    }
    Ok(())
}

fn validate_span(date: Option<CalDate>, end_date: Option<CalDate>) -> CalpleResult<()> {
    match (date, end_date) {
        (Some(start), Some(end)) if end < start => Err(CalpleError::Validation(
            "End date cannot be before start date".into(),
        )),
        (None, Some(_)) => Err(CalpleError::Validation(
            "End date requires a start date".into(),
        )),
        _ => Ok(()),
    }
}

/// Drop duplicates and the owner from a member list, preserving order.
fn clean_members(members: Vec<String>, owner: &str) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(members.len());
    for email in members {
        if email != owner && !cleaned.contains(&email) {
            cleaned.push(email);
        }
    }
    cleaned
}

/// Create an event owned by `owner_email`.
///
/// The owner's active partner, if any, is connected automatically so new
/// events appear on both calendars without waiting for a re-pairing.
pub async fn create(
    store: &dyn DocumentStore,
    owner_email: &str,
    input: NewDDay,
) -> CalpleResult<DDay> {
    validate_title(&input.title)?;
    validate_span(input.date, input.end_date)?;

    let mut connected = clean_members(input.connected_users, owner_email);
    if let Some(conn) = connection::active_connection(store, owner_email).await? {
        let partner = conn.partner_of(owner_email).to_string();
        if partner != owner_email && !connected.contains(&partner) {
            connected.push(partner);
        }
    }

    let now = Utc::now();
    let mut dday = DDay {
        id: String::new(),
        title: input.title,
        description: input.description,
        group: input.group,
        date: input.date,
        end_date: input.end_date,
        is_annual: input.is_annual,
        created_by: owner_email.to_string(),
        connected_users: connected,
        created_at: Some(now),
        updated_at: Some(now),
    };
    dday.id = store.create(DDAYS, dday.to_fields()).await?;
    Ok(dday)
}

/// Update an event. Owners and connected members may both write; the
/// shared-write rule is intentional.
pub async fn update(
    store: &dyn DocumentStore,
    caller_email: &str,
    id: &str,
    patch: DDayPatch,
) -> CalpleResult<DDay> {
    let doc = store
        .get(DDAYS, id)
        .await?
        .ok_or_else(|| CalpleError::NotFound("D-Day not found".into()))?;

    let created_by = doc.str_field("createdBy").unwrap_or_default().to_string();
    let members = doc.string_array("connectedUsers");
    if created_by != caller_email && !members.iter().any(|m| m == caller_email) {
        return Err(CalpleError::Forbidden(
            "You don't have permission to update this D-Day".into(),
        ));
    }

    // Validate the post-patch span against what the document holds now;
    // unreadable legacy dates count as unset.
    let current_date = stored_date(&doc, "date");
    let current_end = stored_date(&doc, "endDate");
    let next_date = patch.date.unwrap_or(current_date);
    let next_end = patch.end_date.unwrap_or(current_end);
    validate_span(next_date, next_end)?;

    let mut fields = Fields::new();
    if let Some(title) = &patch.title {
        validate_title(title)?;
        fields.insert("title".into(), json!(title));
    }
    if let Some(description) = &patch.description {
        fields.insert("description".into(), json!(description));
    }
    if let Some(group) = &patch.group {
        fields.insert("group".into(), json!(group));
    }
    if let Some(date) = patch.date {
        fields.insert("date".into(), json!(compact_or_empty(date)));
    }
    if let Some(end_date) = patch.end_date {
        fields.insert("endDate".into(), json!(compact_or_empty(end_date)));
    }
    if let Some(is_annual) = patch.is_annual {
        fields.insert("isAnnual".into(), json!(is_annual));
    }
    if let Some(connected_users) = patch.connected_users {
        let cleaned = clean_members(connected_users, &created_by);
        fields.insert("connectedUsers".into(), json!(cleaned));
    }
    fields.insert("updatedAt".into(), json!(Utc::now()));

    store.merge(DDAYS, id, fields).await?;

    let updated = store
        .get(DDAYS, id)
        .await?
        .ok_or_else(|| CalpleError::NotFound("D-Day not found".into()))?;
    DDay::from_document(updated)
}

/// Delete an event. Only the owner may delete.
pub async fn delete(store: &dyn DocumentStore, caller_email: &str, id: &str) -> CalpleResult<()> {
    let doc = store
        .get(DDAYS, id)
        .await?
        .ok_or_else(|| CalpleError::NotFound("D-Day not found".into()))?;

    if doc.str_field("createdBy") != Some(caller_email) {
        return Err(CalpleError::Forbidden(
            "Only the creator can delete this D-Day".into(),
        ));
    }

    store.delete(DDAYS, id).await?;
    Ok(())
}

fn stored_date(doc: &Document, field: &str) -> Option<CalDate> {
    let raw = doc.str_field(field)?;
    CalDate::parse(raw).ok()
}
