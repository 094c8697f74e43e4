// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeSet;
use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use url::{Url, form_urlencoded};

use crate::filters::{DateRange, FilterPredicate};
use crate::ids::EntityId;
use crate::model::{ContentType, ViewId};

pub const DASHBOARD_PATH: &str = "/dashboard";

pub const SEARCH_KEY: &str = "q";
pub const FROM_KEY: &str = "from";
pub const TO_KEY: &str = "to";
pub const CHILDREN_KEY: &str = "children";
pub const TYPES_KEY: &str = "types";

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const LIST_SEPARATOR: char = EntityId::LIST_SEPARATOR;

/// Encodes the non-default fields of a predicate as a query string. Keys come
/// out in a fixed order and list values sorted, so equal predicates always
/// produce the same string. The default predicate encodes to "".
pub fn encode_query(predicate: &FilterPredicate) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());

    let search = predicate.search_query.trim();
    if !search.is_empty() {
        query.append_pair(SEARCH_KEY, search);
    }

    if let Some(range) = predicate.date_range
        && let (Some(from), Some(to)) = (format_date(range.start()), format_date(range.end()))
    {
        query.append_pair(FROM_KEY, &from);
        query.append_pair(TO_KEY, &to);
    }

    if !predicate.entity_ids.is_empty() {
        let ids: Vec<&str> = predicate.entity_ids.iter().map(EntityId::as_str).collect();
        query.append_pair(CHILDREN_KEY, &ids.join(","));
    }

    if !predicate.content_types.is_empty() {
        let types: Vec<&str> = predicate
            .content_types
            .iter()
            .map(|content_type| content_type.as_str())
            .collect();
        query.append_pair(TYPES_KEY, &types.join(","));
    }

    query.finish()
}

/// Decodes a query string into a predicate. Never fails: unknown keys are
/// ignored, malformed ids and unknown tags are dropped one by one, and a
/// date range missing a bound or with `from > to` falls back to no range.
/// A repeated scalar key keeps its last value; repeated list keys merge.
pub fn decode_query(query: &str) -> FilterPredicate {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut search = String::new();
    let mut from = None;
    let mut to = None;
    let mut entity_ids = BTreeSet::new();
    let mut content_types = BTreeSet::new();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            SEARCH_KEY => search = value.trim().to_owned(),
            FROM_KEY => from = parse_date(&value),
            TO_KEY => to = parse_date(&value),
            CHILDREN_KEY => entity_ids.extend(split_list(&value).filter_map(EntityId::parse)),
            TYPES_KEY => content_types.extend(split_list(&value).filter_map(ContentType::parse)),
            _ => {}
        }
    }

    let date_range = match (from, to) {
        (Some(from), Some(to)) => DateRange::new(from, to),
        _ => None,
    };

    FilterPredicate {
        search_query: search,
        date_range,
        entity_ids,
        content_types,
    }
}

/// A dashboard URL split into its view segment and filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLocation {
    pub segment: Option<String>,
    pub predicate: FilterPredicate,
}

impl DashboardLocation {
    /// Accepts absolute URLs (`https://host/dashboard/groups?q=x`) as well as
    /// bare paths (`/dashboard/groups?q=x`). Fragments are ignored.
    pub fn parse(raw: &str) -> Self {
        let (path, query) = split_url(raw.trim());
        Self {
            segment: view_segment(&path),
            predicate: decode_query(&query),
        }
    }

    pub fn view(&self) -> Option<ViewId> {
        self.segment.as_deref().and_then(ViewId::parse)
    }

    pub fn is_unknown_view(&self) -> bool {
        self.segment.is_some() && self.view().is_none()
    }
}

pub fn format_url(segment: &str, predicate: &FilterPredicate) -> String {
    let query = encode_query(predicate);
    if query.is_empty() {
        format!("{DASHBOARD_PATH}/{segment}")
    } else {
        format!("{DASHBOARD_PATH}/{segment}?{query}")
    }
}

fn split_url(raw: &str) -> (String, String) {
    if let Ok(parsed) = Url::parse(raw)
        && !parsed.cannot_be_a_base()
    {
        return (
            parsed.path().to_owned(),
            parsed.query().unwrap_or_default().to_owned(),
        );
    }

    let without_fragment = raw.split_once('#').map_or(raw, |(head, _)| head);
    match without_fragment.split_once('?') {
        Some((path, query)) => (path.to_owned(), query.to_owned()),
        None => (without_fragment.to_owned(), String::new()),
    }
}

fn view_segment(path: &str) -> Option<String> {
    let rest = path
        .find(DASHBOARD_PATH)
        .map_or(path, |start| &path[start + DASHBOARD_PATH.len()..]);
    rest.split('/')
        .map(str::trim)
        .find(|segment| !segment.is_empty())
        .map(str::to_owned)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_FORMAT).ok()
}

fn format_date(date: Date) -> Option<String> {
    date.format(DATE_FORMAT).ok()
}
