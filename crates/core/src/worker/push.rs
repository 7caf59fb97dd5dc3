//! Push payloads and notification clicks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::NotificationDefaults;

const EXPLORE_ACTION: &str = "explore";
const CLOSE_ACTION: &str = "close";

/// A notification the worker asks the platform to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// Arbitrary data carried to the click handler; `url` is the click target.
    pub data: Value,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

/// Result of a notification click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", content = "target", rename_all = "snake_case")]
pub enum ClickOutcome {
    Opened(String),
    Focused(String),
    Dismissed,
}

/// Which click path a notification action takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClickAction {
    Explore,
    Close,
    Default,
}

impl ClickAction {
    pub(crate) fn from_action(action: Option<&str>) -> Self {
        match action {
            Some(EXPLORE_ACTION) => ClickAction::Explore,
            Some(CLOSE_ACTION) => ClickAction::Close,
            _ => ClickAction::Default,
        }
    }
}

impl Notification {
    /// The URL the click handler navigates to, if the data carries a non-empty one.
    pub fn target_url(&self) -> Option<&str> {
        self.data.get("url").and_then(Value::as_str).filter(|url| !url.is_empty())
    }

    /// Build a notification from defaults and an optional push payload.
    ///
    /// A JSON object payload overrides `title` and `body` and is merged into
    /// `data`. Anything else is logged and the defaults are used.
    pub fn from_push(defaults: &NotificationDefaults, home_url: &str, payload: Option<&[u8]>) -> Self {
        let mut notification = Self {
            title: defaults.title.clone(),
            body: defaults.body.clone(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            vibrate: vec![200, 100, 200],
            data: json!({
                "url": home_url,
                "dateOfArrival": chrono::Utc::now().timestamp_millis(),
                "primaryKey": 1,
            }),
            actions: default_actions(&defaults.icon),
        };

        let Some(bytes) = payload else {
            return notification;
        };

        let fields = match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                tracing::warn!(payload = %other, "push payload is not an object; using defaults");
                return notification;
            }
            Err(e) => {
                tracing::warn!(error = %e, "push payload is not JSON; using defaults");
                return notification;
            }
        };

        if let Some(title) = non_empty_str(&fields, "title") {
            notification.title = title.to_string();
        }
        if let Some(body) = non_empty_str(&fields, "body") {
            notification.body = body.to_string();
        }
        if let Value::Object(data) = &mut notification.data {
            data.extend(fields);
        }

        notification
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn default_actions(icon: &str) -> Vec<NotificationAction> {
    let icon_dir = icon.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    vec![
        NotificationAction {
            action: EXPLORE_ACTION.into(),
            title: "Explorar".into(),
            icon: format!("{icon_dir}/action-explore.png"),
        },
        NotificationAction {
            action: CLOSE_ACTION.into(),
            title: "Cerrar".into(),
            icon: format!("{icon_dir}/action-close.png"),
        },
    ]
}
