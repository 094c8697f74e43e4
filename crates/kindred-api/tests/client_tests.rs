// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use kindred_api::Client;
use kindred_app::{
    ContentType, DataService, DateRange, Entity, EntityId, EntityKind, FetchError,
    FilterPredicate, Frequency,
};
use std::collections::BTreeSet;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use time::{Date, Month};
use tiny_http::{Header, Response, Server};

#[derive(Debug)]
struct Recorded {
    url: String,
    api_key: Option<String>,
}

fn id(raw: &str) -> Result<EntityId> {
    EntityId::parse(raw).ok_or_else(|| anyhow!("invalid id {raw:?}"))
}

fn serve(responses: Vec<(u16, &'static str)>) -> Result<(String, JoinHandle<Vec<Recorded>>)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}", server.server_addr());

    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for (status, body) in responses {
            let request = server.recv().expect("request expected");
            recorded.push(Recorded {
                url: request.url().to_owned(),
                api_key: request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("apikey"))
                    .map(|header| header.value.as_str().to_owned()),
            });
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
            request.respond(response).expect("response should succeed");
        }
        recorded
    });
    Ok((addr, handle))
}

#[test]
fn new_rejects_blank_or_invalid_base_url() {
    assert!(Client::new("  ", None, Duration::from_secs(1)).is_err());
    assert!(Client::new("not a url", None, Duration::from_secs(1)).is_err());

    let client = Client::new("https://api.example.com///", Some(" ".to_owned()), Duration::from_secs(1))
        .expect("client should initialize");
    assert_eq!(client.base_url(), "https://api.example.com");
    assert!(!client.has_api_key());
}

#[test]
fn get_entity_decodes_a_recipient_row() -> Result<()> {
    let (addr, handle) = serve(vec![(
        200,
        r#"[{"id":"r1","name":"Sarah Johnson","email":"sarah@example.com","relationship":"Grandmother","group_id":"g1","frequency":"weekly","created_at":"2026-01-02T10:00:00+00:00"}]"#,
    )])?;

    let client = Client::new(&addr, Some("anon-key".to_owned()), Duration::from_secs(2))?;
    let entity = client.get_entity(EntityKind::Recipient, &id("r1")?)?;

    let Entity::Recipient(recipient) = entity else {
        return Err(anyhow!("expected a recipient, got {entity:?}"));
    };
    assert_eq!(recipient.name, "Sarah Johnson");
    assert_eq!(recipient.group_id, Some(id("g1")?));
    assert_eq!(recipient.frequency, Frequency::Weekly);

    let recorded = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(
        recorded[0].url,
        "/rest/v1/recipients?select=*&id=eq.r1&limit=1"
    );
    assert_eq!(recorded[0].api_key.as_deref(), Some("anon-key"));
    Ok(())
}

#[test]
fn empty_result_and_404_both_mean_not_found() -> Result<()> {
    let (addr, handle) = serve(vec![(200, "[]"), (404, r#"{"message":"missing"}"#)])?;
    let client = Client::new(&addr, None, Duration::from_secs(2))?;
    let expected = FetchError::NotFound {
        kind: EntityKind::Group,
        id: id("g9")?,
    };

    assert_eq!(client.get_entity(EntityKind::Group, &id("g9")?), Err(expected.clone()));
    assert_eq!(client.get_entity(EntityKind::Group, &id("g9")?), Err(expected));

    let recorded = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert!(recorded.iter().all(|request| request.api_key.is_none()));
    assert!(recorded[0].url.starts_with("/rest/v1/recipient_groups?"));
    Ok(())
}

#[test]
fn server_errors_are_transient_with_the_backend_message() -> Result<()> {
    let (addr, handle) = serve(vec![(500, r#"{"message":"statement timeout"}"#)])?;
    let client = Client::new(&addr, None, Duration::from_secs(2))?;

    let error = client
        .get_entity(EntityKind::Child, &id("c1")?)
        .expect_err("500 should fail");
    assert!(!error.is_not_found());
    assert!(error.to_string().contains("statement timeout"), "{error}");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn unreachable_backend_is_transient() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1", None, Duration::from_millis(200))?;
    let error = client
        .query_entities(EntityKind::Update, &FilterPredicate::default())
        .expect_err("connection should fail");
    assert!(matches!(error, FetchError::Transient { .. }));
    Ok(())
}

#[test]
fn query_entities_returns_summaries_in_server_order() -> Result<()> {
    let (addr, handle) = serve(vec![(
        200,
        r#"[
            {"id":"u4","content":"Park trip after nap time","content_type":"video","child_ids":["c1","c2"],"created_at":"2026-05-20T08:30:00Z"},
            {"id":"u2","content":"Beach day with both kids","content_type":"photo","child_ids":["c1"],"created_at":"2026-04-26T12:00:00Z"}
        ]"#,
    )])?;
    let client = Client::new(&addr, None, Duration::from_secs(2))?;

    let rows = client.query_entities(EntityKind::Update, &FilterPredicate::default())?;
    let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
    assert_eq!(ids, vec!["u4", "u2"]);
    assert_eq!(rows[0].content_type, Some(ContentType::Video));
    assert_eq!(
        rows[1].date,
        Some(Date::from_calendar_date(2026, Month::April, 26)?)
    );

    let recorded = handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    assert_eq!(
        recorded[0].url,
        "/rest/v1/updates?select=*&order=created_at.desc"
    );
    Ok(())
}

#[test]
fn malformed_rows_are_transient() -> Result<()> {
    let (addr, handle) = serve(vec![(200, r#"[{"id":"d1","title":"x"}]"#)])?;
    let client = Client::new(&addr, None, Duration::from_secs(2))?;

    let error = client
        .query_entities(EntityKind::Digest, &FilterPredicate::default())
        .expect_err("missing columns should fail");
    assert!(error.to_string().contains("decode response"), "{error}");

    handle.join().map_err(|_| anyhow!("server thread panicked"))?;
    Ok(())
}

#[test]
fn predicate_maps_to_postgrest_filters() -> Result<()> {
    let client = Client::new("https://api.example.com", None, Duration::from_secs(1))?;
    let predicate = FilterPredicate {
        search_query: "  park (trip) ".to_owned(),
        date_range: DateRange::new(
            Date::from_calendar_date(2026, Month::May, 1)?,
            Date::from_calendar_date(2026, Month::May, 31)?,
        ),
        entity_ids: BTreeSet::from([id("c2")?, id("c1")?]),
        content_types: BTreeSet::from([ContentType::Photo, ContentType::Video]),
    };

    let url = client.query_url(EntityKind::Update, &predicate)?;
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let expected: Vec<(String, String)> = [
        ("select", "*"),
        ("or", "(content.ilike.*park trip*)"),
        ("created_at", "gte.2026-05-01"),
        ("created_at", "lt.2026-06-01"),
        ("child_ids", "ov.{c1,c2}"),
        ("content_type", "in.(photo,video)"),
        ("order", "created_at.desc"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();
    assert_eq!(pairs, expected);
    Ok(())
}

#[test]
fn criteria_that_do_not_apply_are_left_out() -> Result<()> {
    let client = Client::new("https://api.example.com", None, Duration::from_secs(1))?;
    let predicate = FilterPredicate {
        search_query: "sarah".to_owned(),
        date_range: DateRange::new(
            Date::from_calendar_date(2026, Month::May, 1)?,
            Date::from_calendar_date(2026, Month::May, 2)?,
        ),
        entity_ids: BTreeSet::from([id("c1")?]),
        content_types: BTreeSet::from([ContentType::Audio]),
    };

    let recipients = client.query_url(EntityKind::Recipient, &predicate)?;
    let keys: Vec<String> = recipients
        .query_pairs()
        .map(|(key, _)| key.into_owned())
        .collect();
    assert_eq!(keys, vec!["select", "or", "order"]);

    let children = client.query_url(EntityKind::Child, &predicate)?;
    assert!(
        children
            .query_pairs()
            .any(|(key, value)| key == "id" && value == "in.(c1)")
    );
    Ok(())
}
