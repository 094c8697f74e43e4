// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use kindred_app::{Entity, EntitySummary, LoadState, Session, encode_query};
use std::fmt::Write;

/// Plain-text snapshot of the three panes once loads have settled.
pub fn render(session: &Session) -> String {
    let dashboard = session.dashboard();
    let view = dashboard.active_view();
    let props = dashboard.right_pane();

    let mut out = String::new();
    let _ = writeln!(out, "url: {}", dashboard.url());
    let _ = writeln!(out, "view: {} ({view})", view.label());
    let _ = writeln!(out, "active filters: {}", dashboard.active_filter_count());

    match session.list().state() {
        LoadState::Idle => {
            let _ = writeln!(out, "list: none");
        }
        LoadState::Loading { .. } => {
            let _ = writeln!(out, "list: loading");
        }
        LoadState::Loaded(rows) => {
            let _ = writeln!(out, "list: {} {}", rows.len(), plural(rows.len(), "row", "rows"));
            for row in rows {
                let _ = writeln!(out, "  {}", list_row(row));
            }
        }
        LoadState::Failed {
            error,
            retries_left,
        } => {
            let _ = writeln!(out, "list: failed: {error} ({retries_left} retries left)");
        }
        LoadState::ReloadRequired { error } => {
            let _ = writeln!(out, "list: failed: {error} (reload required)");
        }
    }

    let _ = writeln!(
        out,
        "right pane: {} (mount {})",
        props.pane.label(),
        props.mount.get()
    );

    if props.pane.shows_filters() {
        let query = props.filters.map(encode_query).unwrap_or_default();
        let shown = if query.is_empty() { "none" } else { query.as_str() };
        let _ = writeln!(out, "  filters: {shown}");
    }

    if props.pane.shows_selection() {
        match props.selection {
            Some(id) => {
                let _ = writeln!(out, "  selection: {id}");
            }
            None => {
                let _ = writeln!(out, "  selection: none");
            }
        }
        match session.detail().state() {
            LoadState::Idle => {
                let _ = writeln!(out, "  detail: select an item to see details");
            }
            LoadState::Loading { .. } => {
                let _ = writeln!(out, "  detail: loading");
            }
            LoadState::Loaded(entity) => {
                let _ = writeln!(out, "  detail: {}", entity.title());
                for (label, value) in entity_fields(entity) {
                    let _ = writeln!(out, "    {label}: {value}");
                }
            }
            LoadState::Failed {
                error,
                retries_left,
            } => {
                let _ = writeln!(out, "  detail: {error} ({retries_left} retries left)");
            }
            LoadState::ReloadRequired { error } => {
                let _ = writeln!(out, "  detail: {error} (reload required)");
            }
        }
    }

    out
}

fn list_row(row: &EntitySummary) -> String {
    let mut line = format!("{}  {}", row.id, row.title);
    if !row.subtitle.is_empty() {
        let _ = write!(line, "  {}", row.subtitle);
    }
    if let Some(date) = row.date {
        let _ = write!(line, "  {date}");
    }
    line
}

fn entity_fields(entity: &Entity) -> Vec<(&'static str, String)> {
    match entity {
        Entity::Update(update) => vec![
            ("type", update.content_type.as_str().to_owned()),
            ("children", join_ids(&update.child_ids)),
            ("created", update.created_on.to_string()),
        ],
        Entity::Digest(digest) => vec![
            ("status", digest.status.as_str().to_owned()),
            (
                "period",
                format!("{} to {}", digest.period_start, digest.period_end),
            ),
            ("updates", digest.update_count.to_string()),
        ],
        Entity::Child(child) => vec![
            (
                "born",
                child
                    .birth_date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "unknown".to_owned()),
            ),
            ("updates", child.update_count.to_string()),
        ],
        Entity::Recipient(recipient) => vec![
            ("email", recipient.email.clone()),
            ("relationship", recipient.relationship.clone()),
            ("frequency", recipient.frequency.as_str().to_owned()),
            (
                "group",
                recipient
                    .group_id
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "none".to_owned()),
            ),
        ],
        Entity::Group(group) => vec![
            ("frequency", group.frequency.as_str().to_owned()),
            ("members", group.member_count.to_string()),
        ],
        Entity::Draft(draft) => vec![
            ("type", draft.content_type.as_str().to_owned()),
            ("children", join_ids(&draft.child_ids)),
            ("updated", draft.updated_on.to_string()),
        ],
    }
}

fn join_ids(ids: &[kindred_app::EntityId]) -> String {
    if ids.is_empty() {
        return "none".to_owned();
    }
    ids.iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

#[cfg(test)]
mod tests {
    use super::render;
    use anyhow::Result;
    use kindred_app::{Dashboard, DashboardCommand, DashboardOptions, FetchError, Session};
    use kindred_testkit::{FakeService, entity_id};
    use std::sync::Arc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn renders_recipient_details_for_a_restored_link() -> Result<()> {
        let service = Arc::new(FakeService::seeded()?);
        let dashboard = Dashboard::from_url(
            "/dashboard/recipients?q=sarah",
            DashboardOptions::default(),
        );
        let mut session = Session::new(service, dashboard);
        assert!(session.wait_idle(TIMEOUT));
        session.apply(DashboardCommand::Select(entity_id("r1")?));
        assert!(session.wait_idle(TIMEOUT));

        let report = render(&session);
        assert!(report.contains("url: /dashboard/recipients?q=sarah\n"), "{report}");
        assert!(report.contains("active filters: 1\n"), "{report}");
        assert!(report.contains("list: 1 row\n"), "{report}");
        assert!(report.contains("  r1  Sarah Johnson  Grandmother\n"), "{report}");
        assert!(report.contains("right pane: recipient details"), "{report}");
        assert!(report.contains("  detail: Sarah Johnson\n"), "{report}");
        assert!(report.contains("    frequency: weekly\n"), "{report}");
        Ok(())
    }

    #[test]
    fn renders_filters_for_the_activity_pane() -> Result<()> {
        let service = Arc::new(FakeService::seeded()?);
        let dashboard = Dashboard::from_url(
            "/dashboard/activity?types=photo",
            DashboardOptions::default(),
        );
        let mut session = Session::new(service, dashboard);
        assert!(session.wait_idle(TIMEOUT));

        let report = render(&session);
        assert!(report.contains("right pane: activity filters"), "{report}");
        assert!(report.contains("  filters: types=photo\n"), "{report}");
        assert!(!report.contains("detail:"), "{report}");
        Ok(())
    }

    #[test]
    fn renders_the_placeholder_prompt_and_failures() -> Result<()> {
        let service = Arc::new(FakeService::seeded()?);
        service.fail_next(FetchError::transient("offline"));
        let dashboard = Dashboard::from_url("/dashboard/groups", DashboardOptions::default());
        let mut session = Session::new(service, dashboard);
        assert!(session.wait_idle(TIMEOUT));

        let report = render(&session);
        assert!(
            report.contains("list: failed: request failed: offline (3 retries left)"),
            "{report}"
        );
        assert!(report.contains("  selection: none\n"), "{report}");
        assert!(report.contains("  detail: select an item to see details\n"), "{report}");
        Ok(())
    }
}
