// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use kindred_app::{
    Child, ContentType, DataService, Digest, DigestStatus, Draft, Entity, EntityId, EntityKind,
    EntitySummary, FetchError, FilterPredicate, Frequency, Group, Recipient, Update,
};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::{debug, warn};
use url::Url;

pub const REST_PREFIX: &str = "rest/v1";

const DAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Read-only client for the hosted backend's PostgREST endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url).with_context(|| format!("api.base_url {base_url:?} is not a URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn table_url(&self, kind: EntityKind) -> Result<Url> {
        let raw = format!("{}/{REST_PREFIX}/{}", self.base_url, table_name(kind));
        let mut url = Url::parse(&raw).with_context(|| format!("build URL {raw:?}"))?;
        url.query_pairs_mut().append_pair("select", "*");
        Ok(url)
    }

    pub fn entity_url(&self, kind: EntityKind, id: &EntityId) -> Result<Url> {
        let mut url = self.table_url(kind)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"))
            .append_pair("limit", "1");
        Ok(url)
    }

    /// Translates a predicate into PostgREST filters. Criteria that do not
    /// apply to `kind` are skipped, matching `FilterPredicate::matches`.
    pub fn query_url(&self, kind: EntityKind, predicate: &FilterPredicate) -> Result<Url> {
        let mut url = self.table_url(kind)?;
        {
            let mut query = url.query_pairs_mut();

            let needle = sanitize_search(&predicate.search_query);
            if !needle.is_empty() {
                let clauses: Vec<String> = search_columns(kind)
                    .iter()
                    .map(|column| format!("{column}.ilike.*{needle}*"))
                    .collect();
                query.append_pair("or", &format!("({})", clauses.join(",")));
            }

            if let Some(range) = predicate.date_range
                && let Some(column) = date_column(kind)
            {
                query.append_pair(column, &format!("gte.{}", format_day(range.start())?));
                let end = range.end().next_day().unwrap_or(range.end());
                query.append_pair(column, &format!("lt.{}", format_day(end)?));
            }

            if !predicate.entity_ids.is_empty() && kind.filters_by_child() {
                let ids: Vec<&str> = predicate.entity_ids.iter().map(EntityId::as_str).collect();
                if kind == EntityKind::Child {
                    query.append_pair("id", &format!("in.({})", ids.join(",")));
                } else {
                    query.append_pair("child_ids", &format!("ov.{{{}}}", ids.join(",")));
                }
            }

            if !predicate.content_types.is_empty() && kind.filters_by_content_type() {
                let types: Vec<&str> = predicate
                    .content_types
                    .iter()
                    .map(|content_type| content_type.as_str())
                    .collect();
                query.append_pair("content_type", &format!("in.({})", types.join(",")));
            }

            query.append_pair("order", order_clause(kind));
        }
        Ok(url)
    }

    /// `Ok(None)` means the endpoint answered 404.
    fn fetch_entities(
        &self,
        kind: EntityKind,
        url: Url,
    ) -> Result<Option<Vec<Entity>>, FetchError> {
        debug!(%url, "backend request");
        let mut request = self.http.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, &error))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|error| FetchError::transient(format!("read response body: {error}")))?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(clean_error_response(status, &body));
        }

        let entities = match kind {
            EntityKind::Update => decode_rows::<UpdateRow>(&body),
            EntityKind::Digest => decode_rows::<DigestRow>(&body),
            EntityKind::Child => decode_rows::<ChildRow>(&body),
            EntityKind::Recipient => decode_rows::<RecipientRow>(&body),
            EntityKind::Group => decode_rows::<GroupRow>(&body),
            EntityKind::Draft => decode_rows::<DraftRow>(&body),
        }?;
        Ok(Some(entities))
    }
}

impl DataService for Client {
    fn get_entity(&self, kind: EntityKind, id: &EntityId) -> Result<Entity, FetchError> {
        let url = self
            .entity_url(kind, id)
            .map_err(|error| FetchError::transient(format!("{error:#}")))?;
        let not_found = || FetchError::NotFound {
            kind,
            id: id.clone(),
        };

        match self.fetch_entities(kind, url) {
            Ok(entities) => entities
                .and_then(|entities| entities.into_iter().next())
                .ok_or_else(not_found),
            Err(error) => {
                warn!(%kind, %id, %error, "entity fetch failed");
                Err(error)
            }
        }
    }

    fn query_entities(
        &self,
        kind: EntityKind,
        predicate: &FilterPredicate,
    ) -> Result<Vec<EntitySummary>, FetchError> {
        let url = self
            .query_url(kind, predicate)
            .map_err(|error| FetchError::transient(format!("{error:#}")))?;
        let entities = self
            .fetch_entities(kind, url)
            .and_then(|entities| {
                entities.ok_or_else(|| {
                    FetchError::transient(format!("table {} not found", table_name(kind)))
                })
            })
            .inspect_err(|error| warn!(%kind, %error, "list query failed"))?;
        Ok(entities.iter().map(Entity::summary).collect())
    }
}

pub const fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Update => "updates",
        EntityKind::Digest => "digests",
        EntityKind::Child => "children",
        EntityKind::Recipient => "recipients",
        EntityKind::Group => "recipient_groups",
        EntityKind::Draft => "drafts",
    }
}

const fn search_columns(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Update => &["content"],
        EntityKind::Digest | EntityKind::Draft => &["title", "content"],
        EntityKind::Child | EntityKind::Group => &["name"],
        EntityKind::Recipient => &["name", "email", "relationship"],
    }
}

const fn date_column(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Update => Some("created_at"),
        EntityKind::Digest => Some("date_range_end"),
        EntityKind::Draft => Some("updated_at"),
        EntityKind::Child | EntityKind::Recipient | EntityKind::Group => None,
    }
}

const fn order_clause(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Update => "created_at.desc",
        EntityKind::Digest => "date_range_end.desc",
        EntityKind::Draft => "updated_at.desc",
        EntityKind::Child | EntityKind::Recipient | EntityKind::Group => "name.asc",
    }
}

/// PostgREST treats `,` `(` `)` as filter syntax and `*` as a wildcard.
fn sanitize_search(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|ch| if matches!(ch, ',' | '(' | ')' | '*') { ' ' } else { ch })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_day(date: Date) -> Result<String> {
    date.format(DAY_FORMAT).context("format date")
}

fn connection_error(base_url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        return FetchError::transient(format!("{base_url} timed out"));
    }
    FetchError::transient(format!("cannot reach {base_url} ({error})"))
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> FetchError {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return FetchError::transient(format!("server error ({}): {message}", status.as_u16()));
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return FetchError::transient(format!("server error ({}): {}", status.as_u16(), body.trim()));
    }

    FetchError::transient(format!("server returned {}", status.as_u16()))
}

fn decode_rows<R: WireRow>(body: &str) -> Result<Vec<Entity>, FetchError> {
    let rows: Vec<R> = serde_json::from_str(body)
        .map_err(|error| FetchError::transient(format!("decode response: {error}")))?;
    rows.into_iter().map(WireRow::into_entity).collect()
}

trait WireRow: DeserializeOwned {
    fn into_entity(self) -> Result<Entity, FetchError>;
}

fn wire_id(raw: &str) -> Result<EntityId, FetchError> {
    EntityId::parse(raw).ok_or_else(|| FetchError::transient(format!("invalid id {raw:?}")))
}

fn wire_ids(raw: &[String]) -> Result<Vec<EntityId>, FetchError> {
    raw.iter().map(|id| wire_id(id)).collect()
}

/// Accepts plain dates and timestamps; only the calendar day is kept.
fn wire_day(raw: &str) -> Result<Date, FetchError> {
    let day = raw.get(..10).unwrap_or(raw);
    Date::parse(day, DAY_FORMAT)
        .map_err(|error| FetchError::transient(format!("invalid date {raw:?}: {error}")))
}

#[derive(Debug, Deserialize)]
struct UpdateRow {
    id: String,
    content: String,
    content_type: ContentType,
    #[serde(default)]
    child_ids: Vec<String>,
    created_at: String,
}

impl WireRow for UpdateRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Update(Update {
            id: wire_id(&self.id)?,
            body: self.content,
            content_type: self.content_type,
            child_ids: wire_ids(&self.child_ids)?,
            created_on: wire_day(&self.created_at)?,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct DigestRow {
    id: String,
    title: String,
    status: DigestStatus,
    date_range_start: String,
    date_range_end: String,
    #[serde(default)]
    update_count: u32,
}

impl WireRow for DigestRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Digest(Digest {
            id: wire_id(&self.id)?,
            title: self.title,
            status: self.status,
            period_start: wire_day(&self.date_range_start)?,
            period_end: wire_day(&self.date_range_end)?,
            update_count: self.update_count,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct ChildRow {
    id: String,
    name: String,
    birth_date: Option<String>,
    #[serde(default)]
    update_count: u32,
}

impl WireRow for ChildRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Child(Child {
            id: wire_id(&self.id)?,
            name: self.name,
            birth_date: self.birth_date.as_deref().map(wire_day).transpose()?,
            update_count: self.update_count,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    id: String,
    name: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    relationship: Option<String>,
    group_id: Option<String>,
    frequency: Frequency,
}

impl WireRow for RecipientRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Recipient(Recipient {
            id: wire_id(&self.id)?,
            name: self.name,
            email: self.email.unwrap_or_default(),
            relationship: self.relationship.unwrap_or_default(),
            group_id: self.group_id.as_deref().map(wire_id).transpose()?,
            frequency: self.frequency,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct GroupRow {
    id: String,
    name: String,
    default_frequency: Frequency,
    #[serde(default)]
    member_count: u32,
}

impl WireRow for GroupRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Group(Group {
            id: wire_id(&self.id)?,
            name: self.name,
            frequency: self.default_frequency,
            member_count: self.member_count,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct DraftRow {
    id: String,
    #[serde(default)]
    title: String,
    content: String,
    content_type: ContentType,
    #[serde(default)]
    child_ids: Vec<String>,
    updated_at: String,
}

impl WireRow for DraftRow {
    fn into_entity(self) -> Result<Entity, FetchError> {
        Ok(Entity::Draft(Draft {
            id: wire_id(&self.id)?,
            title: self.title,
            body: self.content,
            content_type: self.content_type,
            child_ids: wire_ids(&self.child_ids)?,
            updated_on: wire_day(&self.updated_at)?,
        }))
    }
}
