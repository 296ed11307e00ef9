//! Per-user alert inboxes and the user profile registry.
//!
//! Delivery fans an alert out as an independent copy per recipient: each
//! user's `read` flag is their own, never shared. The inbox is the
//! authoritative alert record; the real-time fabric is best-effort on top.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{AlertEvent, AlertType, ThresholdConfig};

// ---

/// A registered user: the profile city drives city-targeted delivery, the
/// optional thresholds personalize evaluation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    // ---
    pub user_id: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<ThresholdConfig>,
}

/// One delivered alert in one user's inbox. `read` is the only mutable
/// field, and only through `mark_read` / `mark_all_read`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    // ---
    pub id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub origin_city: Option<String>,
    pub read: bool,
}

/// Who an alert is delivered to.
#[derive(Debug, Clone)]
pub enum Target {
    AllUsers,
    City(String),
    User(String),
}

/// Aggregated administrative view: one row per distinct message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertAggregate {
    // ---
    pub message: String,
    pub alert_type: AlertType,
    pub first_timestamp: DateTime<Utc>,
    pub city: Option<String>,
    pub recipient_count: usize,
}

struct InboxState {
    // ---
    profiles: HashMap<String, UserProfile>,
    entries: HashMap<String, Vec<InboxEntry>>,
}

pub struct AlertInbox {
    // ---
    inner: RwLock<InboxState>,
    default_thresholds: ThresholdConfig,
}

impl AlertInbox {
    pub fn new(default_thresholds: ThresholdConfig) -> Self {
        // ---
        AlertInbox {
            inner: RwLock::new(InboxState {
                profiles: HashMap::new(),
                entries: HashMap::new(),
            }),
            default_thresholds,
        }
    }

    /// Register (or re-register) a user profile. Re-registering updates the
    /// profile city and keeps the existing inbox.
    pub async fn register_user(&self, user_id: &str, city: &str) -> Result<UserProfile> {
        // ---
        if user_id.trim().is_empty() {
            return Err(CoreError::Validation("user id must not be empty".into()));
        }
        if city.trim().is_empty() {
            return Err(CoreError::Validation("city must not be empty".into()));
        }

        let mut inner = self.inner.write().await;
        let thresholds = inner
            .profiles
            .get(user_id)
            .and_then(|p| p.thresholds.clone());
        let profile = UserProfile {
            user_id: user_id.to_string(),
            city: city.to_string(),
            thresholds,
        };
        inner.profiles.insert(user_id.to_string(), profile.clone());
        inner.entries.entry(user_id.to_string()).or_default();
        Ok(profile)
    }

    /// Set a user's personal thresholds, switching them to personalized
    /// evaluation.
    pub async fn set_thresholds(&self, user_id: &str, thresholds: ThresholdConfig) -> Result<()> {
        // ---
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| CoreError::NotFound(format!("unknown user '{}'", user_id)))?;
        profile.thresholds = Some(thresholds);
        Ok(())
    }

    /// A user's effective thresholds: personal if set, global defaults
    /// otherwise (also for unregistered users).
    pub async fn thresholds_for(&self, user_id: &str) -> ThresholdConfig {
        // ---
        self.inner
            .read()
            .await
            .profiles
            .get(user_id)
            .and_then(|p| p.thresholds.clone())
            .unwrap_or_else(|| self.default_thresholds.clone())
    }

    /// Profiles whose city matches, for personalized pipeline fan-out.
    pub async fn profiles_in_city(&self, city: &str) -> Vec<UserProfile> {
        // ---
        self.inner
            .read()
            .await
            .profiles
            .values()
            .filter(|p| p.city == city)
            .cloned()
            .collect()
    }

    /// Deliver one alert to every user matched by `target`, appending a
    /// fresh unread entry per recipient. Zero matched users is not an error;
    /// the returned count is surfaced to administrative callers as the
    /// fan-out breadth.
    pub async fn deliver(&self, event: &AlertEvent, target: &Target) -> usize {
        // ---
        let mut inner = self.inner.write().await;
        let recipients: Vec<String> = match target {
            Target::AllUsers => inner.profiles.keys().cloned().collect(),
            Target::City(city) => inner
                .profiles
                .values()
                .filter(|p| &p.city == city)
                .map(|p| p.user_id.clone())
                .collect(),
            Target::User(id) => {
                if inner.profiles.contains_key(id) {
                    vec![id.clone()]
                } else {
                    Vec::new()
                }
            }
        };

        for user_id in &recipients {
            inner
                .entries
                .entry(user_id.clone())
                .or_default()
                .push(InboxEntry {
                    id: Uuid::new_v4(),
                    alert_type: event.alert_type.clone(),
                    message: event.message.clone(),
                    timestamp: event.timestamp,
                    origin_city: event.origin_city.clone(),
                    read: false,
                });
        }

        tracing::debug!(
            alert = %event.id,
            recipients = recipients.len(),
            "alert delivered"
        );
        recipients.len()
    }

    /// All of a user's entries, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<InboxEntry>> {
        // ---
        let inner = self.inner.read().await;
        if !inner.profiles.contains_key(user_id) {
            return Err(CoreError::NotFound(format!("unknown user '{}'", user_id)));
        }
        let mut entries = inner.entries.get(user_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Mark one entry read. `NotFound` unless the entry exists in that
    /// user's own inbox; marking an already-read entry succeeds silently.
    pub async fn mark_read(&self, user_id: &str, entry_id: Uuid) -> Result<()> {
        // ---
        let mut inner = self.inner.write().await;
        let entry = inner
            .entries
            .get_mut(user_id)
            .and_then(|entries| entries.iter_mut().find(|e| e.id == entry_id))
            .ok_or_else(|| {
                CoreError::NotFound(format!("no entry {} for user '{}'", entry_id, user_id))
            })?;
        entry.read = true;
        Ok(())
    }

    /// Mark every entry for a user read. A no-op on an empty inbox.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        // ---
        let mut inner = self.inner.write().await;
        if !inner.profiles.contains_key(user_id) {
            return Err(CoreError::NotFound(format!("unknown user '{}'", user_id)));
        }
        let mut marked = 0;
        if let Some(entries) = inner.entries.get_mut(user_id) {
            for entry in entries.iter_mut().filter(|e| !e.read) {
                entry.read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Administrative bulk delete: remove entries whose message matches
    /// exactly, from every user's inbox. Returns the affected-user count.
    pub async fn delete_by_message(&self, message: &str) -> usize {
        // ---
        let mut inner = self.inner.write().await;
        let mut affected = 0;
        for entries in inner.entries.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.message != message);
            if entries.len() < before {
                affected += 1;
            }
        }
        tracing::info!(affected, alert_message = message, "alert entries deleted");
        affected
    }

    /// Administrative reporting view: entries grouped by identical message,
    /// ordered newest-first by each group's earliest timestamp.
    ///
    /// `recipient_count` is the number of distinct users holding the message,
    /// not the number of entries, so a user who received the same message
    /// twice counts once and the figure agrees with `delete_by_message`.
    /// Type and city are taken from the group's earliest entry.
    pub async fn aggregate_by_message(&self) -> Vec<AlertAggregate> {
        // ---
        struct Group<'a> {
            first: &'a InboxEntry,
            users: HashSet<&'a str>,
        }

        let inner = self.inner.read().await;
        let mut groups: HashMap<&str, Group<'_>> = HashMap::new();
        for (user_id, entries) in &inner.entries {
            for entry in entries {
                groups
                    .entry(entry.message.as_str())
                    .and_modify(|group| {
                        group.users.insert(user_id.as_str());
                        if entry.timestamp < group.first.timestamp {
                            group.first = entry;
                        }
                    })
                    .or_insert_with(|| Group {
                        first: entry,
                        users: HashSet::from([user_id.as_str()]),
                    });
            }
        }

        let mut report: Vec<AlertAggregate> = groups
            .into_values()
            .map(|group| AlertAggregate {
                message: group.first.message.clone(),
                alert_type: group.first.alert_type.clone(),
                first_timestamp: group.first.timestamp,
                city: group.first.origin_city.clone(),
                recipient_count: group.users.len(),
            })
            .collect();
        report.sort_by(|a, b| b.first_timestamp.cmp(&a.first_timestamp));
        report
    }
}
