//! Data Reshaping
//!
//! Pure aggregation helpers: the avatar/worker-state join, category
//! de-duplication, best-effort datetime normalization for mission
//! statistics payloads, and chat shape normalization.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::types::{Avatar, Category, Chat, CombinedAvatar, NormalizedChat, ProfileWorkerView};

/// Datetime fields known to appear in mission exposure/statistics
/// payloads. Each is normalized in place; anything unparseable becomes
/// null rather than an error.
const DATETIME_FIELDS: &[&str] = &[
    "created_at",
    "updated_at",
    "started_at",
    "finished_at",
    "planned_at",
    "ran_at",
    "exposure_date",
    "first_message_at",
    "last_message_at",
];

/// Join avatar inventory records with live worker-state records by id.
///
/// Yields exactly one entry per avatar; `profile_worker_view` is set iff
/// a worker with a matching id exists. The operator service guarantees
/// at most one worker per avatar id.
pub fn combine_avatars(
    avatars: Vec<Avatar>,
    workers: Vec<ProfileWorkerView>,
) -> Vec<CombinedAvatar> {
    let mut by_id: HashMap<String, ProfileWorkerView> = workers
        .into_iter()
        .map(|w| (w.id.clone(), w))
        .collect();

    avatars
        .into_iter()
        .map(|avatar| {
            let profile_worker_view = by_id.remove(&avatar.id);
            CombinedAvatar {
                avatar,
                profile_worker_view,
            }
        })
        .collect()
}

/// Whether an avatar's profile counts as active: it has a worker and
/// that worker has not stopped.
pub fn is_active(combined: &CombinedAvatar) -> bool {
    combined
        .profile_worker_view
        .as_ref()
        .map(|w| w.state.is_running())
        .unwrap_or(false)
}

/// De-duplicate categories by id, root first, preserving first-seen
/// order among the descendants.
pub fn dedupe_categories(root: Category, descendants: Vec<Category>) -> Vec<Category> {
    let mut seen: Vec<String> = vec![root.id.clone()];
    let mut result = vec![root];

    for category in descendants {
        if !seen.contains(&category.id) {
            seen.push(category.id.clone());
            result.push(category);
        }
    }
    result
}

/// Best-effort datetime parse. Accepts RFC 3339 and the bare
/// `YYYY-MM-DD HH:MM:SS` form some upstream endpoints emit; anything
/// else (including absent input) yields `None`, never an error.
pub fn parse_datetime(raw: Option<&str>) -> Option<String> {
    let raw = raw?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(
            parsed
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(
            naive
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    None
}

/// Walk a statistics payload and normalize every known datetime field
/// in place. Objects and arrays are visited recursively.
pub fn normalize_datetimes(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if DATETIME_FIELDS.contains(&key.as_str()) {
                    *entry = match parse_datetime(entry.as_str()) {
                        Some(normalized) => Value::String(normalized),
                        None => Value::Null,
                    };
                } else {
                    normalize_datetimes(entry);
                }
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize_datetimes(item);
            }
        }
        _ => {}
    }
}

/// Produce the one canonical chat shape the view layer consumes. The
/// orchestrator populates whichever of `members` / `members_count` /
/// `subscribers_count` its own upstream happened to report.
pub fn normalize_chat(chat: &Chat) -> NormalizedChat {
    let member_count = chat
        .members
        .or(chat.members_count)
        .or(chat.subscribers_count);

    let title = chat
        .title
        .clone()
        .or_else(|| chat.username.clone())
        .unwrap_or_else(|| chat.id.clone());

    NormalizedChat {
        id: chat.id.clone(),
        title,
        username: chat.username.clone(),
        member_count,
        category_id: chat.category_id.clone(),
    }
}

/// Whole seconds between two RFC 3339 timestamps, if both parse and the
/// end is not before the start.
pub fn duration_between(start: &str, end: &str) -> Option<i64> {
    let start = DateTime::parse_from_rfc3339(start).ok()?;
    let end = DateTime::parse_from_rfc3339(end).ok()?;
    let seconds = (end - start).num_seconds();
    (seconds >= 0).then_some(seconds)
}

/// Coarse relative-time rendering for display ("3m ago", "2h ago").
pub fn relative_time(timestamp: &str, now: DateTime<Utc>) -> Option<String> {
    let then = DateTime::parse_from_rfc3339(timestamp).ok()?;
    let seconds = (now - then.with_timezone(&Utc)).num_seconds();

    let text = if seconds < 0 {
        "in the future".to_string()
    } else if seconds < 60 {
        format!("{}s ago", seconds)
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86_400)
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkerState;
    use serde_json::json;

    fn avatar(id: &str) -> Avatar {
        Avatar {
            id: id.to_string(),
            eliza_character: Value::Null,
            gender: None,
            date_of_birth: None,
            phone_number: None,
            addresses: Vec::new(),
            social_accounts: HashMap::new(),
            proxy: None,
        }
    }

    fn worker(id: &str, state: WorkerState) -> ProfileWorkerView {
        ProfileWorkerView {
            id: id.to_string(),
            state,
            current_scenario: None,
            current_scenario_result: None,
            pending_actions: 0,
            browser_port: None,
        }
    }

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: None,
            character_count: 0,
            chat_count: 0,
        }
    }

    #[test]
    fn test_combine_yields_one_entry_per_avatar() {
        let avatars = vec![avatar("a"), avatar("b"), avatar("c")];
        let workers = vec![worker("b", WorkerState::Working), worker("x", WorkerState::Idle)];

        let combined = combine_avatars(avatars, workers);
        assert_eq!(combined.len(), 3);
        assert!(combined[0].profile_worker_view.is_none());
        assert!(combined[1].profile_worker_view.is_some());
        assert!(combined[2].profile_worker_view.is_none());
        assert_eq!(
            combined[1].profile_worker_view.as_ref().unwrap().state,
            WorkerState::Working
        );
    }

    #[test]
    fn test_is_active_requires_a_live_worker() {
        let mut combined = combine_avatars(
            vec![avatar("a"), avatar("b")],
            vec![worker("a", WorkerState::Working), worker("b", WorkerState::Stopped)],
        );
        assert!(is_active(&combined[0]));
        assert!(!is_active(&combined[1]));

        combined[0].profile_worker_view = None;
        assert!(!is_active(&combined[0]));
    }

    #[test]
    fn test_dedupe_categories_exact_once() {
        let root = category("root", "All");
        let descendants = vec![
            category("a", "A"),
            category("root", "All again"),
            category("b", "B"),
            category("a", "A again"),
        ];

        let deduped = dedupe_categories(root, descendants);
        let ids: Vec<&str> = deduped.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["root", "a", "b"]);
        // First occurrence wins.
        assert_eq!(deduped[1].name, "A");
    }

    #[test]
    fn test_parse_datetime_total_behavior() {
        assert_eq!(parse_datetime(None), None);
        assert_eq!(parse_datetime(Some("not-a-date")), None);
        assert_eq!(
            parse_datetime(Some("2024-01-01T00:00:00Z")),
            Some("2024-01-01T00:00:00Z".to_string())
        );
        assert_eq!(
            parse_datetime(Some("2024-01-01T03:00:00+03:00")),
            Some("2024-01-01T00:00:00Z".to_string())
        );
        assert_eq!(
            parse_datetime(Some("2024-01-01 12:30:00")),
            Some("2024-01-01T12:30:00Z".to_string())
        );
    }

    #[test]
    fn test_normalize_datetimes_walks_nested_payloads() {
        let mut payload = json!({
            "missions": [
                {
                    "id": "m1",
                    "created_at": "2024-01-01T00:00:00Z",
                    "finished_at": "garbage",
                    "stats": { "last_message_at": null }
                }
            ]
        });

        normalize_datetimes(&mut payload);
        let mission = &payload["missions"][0];
        assert_eq!(mission["created_at"], "2024-01-01T00:00:00Z");
        assert_eq!(mission["finished_at"], Value::Null);
        assert_eq!(mission["stats"]["last_message_at"], Value::Null);
    }

    #[test]
    fn test_normalize_chat_picks_first_present_count() {
        let chat = Chat {
            id: "c1".to_string(),
            title: None,
            username: Some("some_chat".to_string()),
            members: None,
            members_count: Some(42),
            subscribers_count: Some(7),
            category_id: None,
        };

        let normalized = normalize_chat(&chat);
        assert_eq!(normalized.member_count, Some(42));
        assert_eq!(normalized.title, "some_chat");
    }

    #[test]
    fn test_duration_between() {
        assert_eq!(
            duration_between("2024-01-01T00:00:00Z", "2024-01-01T00:01:30Z"),
            Some(90)
        );
        assert_eq!(
            duration_between("2024-01-01T00:01:00Z", "2024-01-01T00:00:00Z"),
            None
        );
        assert_eq!(duration_between("nope", "2024-01-01T00:00:00Z"), None);
    }

    #[test]
    fn test_relative_time() {
        let now = DateTime::parse_from_rfc3339("2024-01-02T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            relative_time("2024-01-01T23:59:30Z", now).unwrap(),
            "30s ago"
        );
        assert_eq!(relative_time("2024-01-01T23:00:00Z", now).unwrap(), "1h ago");
        assert_eq!(relative_time("2023-12-30T00:00:00Z", now).unwrap(), "3d ago");
    }
}
