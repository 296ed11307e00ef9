//! Ingestion and alert-authoring orchestration.
//!
//! `ingest` runs the full per-reading pipeline synchronously in the caller's
//! task: validate → store → evaluate → inbox fan-out → real-time publish.
//! Running it inline gives per-city FIFO for free — the evaluator observes
//! readings in append order. A store failure aborts everything downstream;
//! fan-out failures never surface to the ingestion caller.

use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::evaluator::evaluate;
use crate::fabric::PushMessage;
use crate::inbox::Target;
use crate::models::{AlertEvent, AlertType, SensorReading, Severity, StoredReading};
use crate::state::AppState;

// ---

/// What one successful ingestion produced.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    // ---
    pub reading: StoredReading,
    /// Alerts derived with the global default thresholds.
    pub alerts: Vec<AlertEvent>,
}

/// Ingest one reading: the only entry point for automatic alerts.
///
/// Inbox delivery is personalized: a user who has set their own thresholds
/// gets a re-evaluation against those instead of the global result. The
/// published real-time stream always carries the global-default alerts.
pub async fn ingest(state: &AppState, reading: SensorReading) -> Result<IngestReport> {
    // ---
    // Persistence is authoritative: a rejected or unstorable reading stops
    // the pipeline before any evaluation, delivery, or publish.
    let stored = state.store.append(reading).await?;

    let mut alerts = evaluate(&stored.reading, &state.config.default_thresholds);
    for alert in &mut alerts {
        alert.source_reading_id = Some(stored.id);
    }

    let city = stored.reading.city.as_str();
    for profile in state.inbox.profiles_in_city(city).await {
        let target = Target::User(profile.user_id.clone());
        match &profile.thresholds {
            Some(personal) => {
                let mut personal_alerts = evaluate(&stored.reading, personal);
                for alert in &mut personal_alerts {
                    alert.source_reading_id = Some(stored.id);
                    state.inbox.deliver(alert, &target).await;
                }
            }
            None => {
                for alert in &alerts {
                    state.inbox.deliver(alert, &target).await;
                }
            }
        }
    }

    // Subscribers get the reading and its alerts in the same logical step.
    state
        .fabric
        .publish(
            Some(city),
            PushMessage::NewReading {
                reading: (*stored).clone(),
                alerts: alerts.clone(),
            },
        )
        .await;
    for alert in &alerts {
        state
            .fabric
            .publish(Some(city), PushMessage::NewAlert { alert: alert.clone() })
            .await;
    }

    tracing::info!(
        city,
        reading = %stored.id,
        derived_alerts = alerts.len(),
        "reading ingested"
    );
    Ok(IngestReport {
        reading: (*stored).clone(),
        alerts,
    })
}

/// Administratively author an alert, bypassing the evaluator.
///
/// `city` scopes both inbox delivery (profile city) and the publish channel;
/// `None` means every user and every connection. Returns the event plus the
/// inbox recipient count for the administrative caller.
pub async fn create_manual_alert(
    state: &AppState,
    alert_type: AlertType,
    severity: Option<Severity>,
    message: String,
    city: Option<String>,
) -> Result<(AlertEvent, usize)> {
    // ---
    if matches!(&alert_type, AlertType::Custom(s) if s.trim().is_empty()) {
        return Err(CoreError::Validation("alert type must not be empty".into()));
    }
    if message.trim().is_empty() {
        return Err(CoreError::Validation(
            "alert message must not be empty".into(),
        ));
    }

    let event = AlertEvent::manual(
        alert_type,
        severity.unwrap_or(Severity::Info),
        message,
        city.clone(),
    );

    let target = match &city {
        Some(c) => Target::City(c.clone()),
        None => Target::AllUsers,
    };
    let recipients = state.inbox.deliver(&event, &target).await;

    state
        .fabric
        .publish(city.as_deref(), PushMessage::NewAlert { alert: event.clone() })
        .await;

    tracing::info!(
        alert = %event.id,
        recipients,
        city = city.as_deref().unwrap_or("<all>"),
        "manual alert created"
    );
    Ok((event, recipients))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::Config;
    use crate::models::tests::test_reading;
    use crate::models::ThresholdConfig;

    fn app() -> AppState {
        AppState::new(Config::default())
    }

    #[tokio::test]
    async fn congestion_breach_reaches_city_inboxes_and_channel_only() {
        // ---
        let state = app();
        state.inbox.register_user("m1", "Mumbai").await.unwrap();
        state.inbox.register_user("m2", "Mumbai").await.unwrap();
        state.inbox.register_user("d1", "Delhi").await.unwrap();

        let (mumbai_conn, mut mumbai_rx) = state.fabric.register().await;
        state.fabric.subscribe(mumbai_conn, "Mumbai").await;
        let (delhi_conn, mut delhi_rx) = state.fabric.register().await;
        state.fabric.subscribe(delhi_conn, "Delhi").await;

        let mut reading = test_reading("Mumbai");
        reading.traffic.congestion_level = 80.0;
        let report = ingest(&state, reading).await.unwrap();

        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].alert_type, AlertType::Traffic);
        assert_eq!(report.alerts[0].source_reading_id, Some(report.reading.id));

        // Every Mumbai user got exactly the one alert; Delhi users none.
        for user in ["m1", "m2"] {
            let entries = state.inbox.list_for_user(user).await.unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].alert_type, AlertType::Traffic);
        }
        assert!(state.inbox.list_for_user("d1").await.unwrap().is_empty());

        // Mumbai channel saw the reading and the alert; Delhi saw nothing.
        let first = mumbai_rx.try_recv().unwrap();
        assert!(matches!(first, PushMessage::NewReading { ref alerts, .. } if alerts.len() == 1));
        assert!(matches!(
            mumbai_rx.try_recv().unwrap(),
            PushMessage::NewAlert { .. }
        ));
        assert!(delhi_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn quiet_reading_delivers_no_alerts_but_publishes_reading() {
        // ---
        let state = app();
        state.inbox.register_user("m1", "Mumbai").await.unwrap();
        let (conn, mut rx) = state.fabric.register().await;
        state.fabric.subscribe(conn, "Mumbai").await;

        let report = ingest(&state, test_reading("Mumbai")).await.unwrap();
        assert!(report.alerts.is_empty());
        assert!(state.inbox.list_for_user("m1").await.unwrap().is_empty());

        assert!(matches!(
            rx.try_recv().unwrap(),
            PushMessage::NewReading { ref alerts, .. } if alerts.is_empty()
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejected_reading_aborts_the_whole_pipeline() {
        // ---
        let state = app();
        state.inbox.register_user("m1", "Mumbai").await.unwrap();
        let (conn, mut rx) = state.fabric.register().await;
        state.fabric.subscribe(conn, "Mumbai").await;

        let mut reading = test_reading("Mumbai");
        reading.traffic.congestion_level = 80.0;
        reading.latitude = 95.0;

        assert!(ingest(&state, reading).await.is_err());
        // No partial evaluate/deliver/publish.
        assert!(state.inbox.list_for_user("m1").await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            state.store.latest("Mumbai").await,
            Err(CoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn personalized_user_gets_their_own_evaluation() {
        // ---
        let state = app();
        state.inbox.register_user("strict", "Mumbai").await.unwrap();
        state.inbox.register_user("default", "Mumbai").await.unwrap();
        state
            .inbox
            .set_thresholds(
                "strict",
                ThresholdConfig {
                    air_quality_aqi_max: 100.0,
                    ..ThresholdConfig::default()
                },
            )
            .await
            .unwrap();

        // AQI 120 breaches only the personalized threshold.
        let mut reading = test_reading("Mumbai");
        reading.air_quality.aqi = 120.0;
        let report = ingest(&state, reading).await.unwrap();

        assert!(report.alerts.is_empty());
        assert_eq!(state.inbox.list_for_user("strict").await.unwrap().len(), 1);
        assert!(state.inbox.list_for_user("default").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn manual_alert_targets_city_and_broadcasts_without_one() {
        // ---
        let state = app();
        state.inbox.register_user("c1", "Chennai").await.unwrap();
        state.inbox.register_user("c2", "Chennai").await.unwrap();
        state.inbox.register_user("m1", "Mumbai").await.unwrap();

        let (chennai_conn, mut chennai_rx) = state.fabric.register().await;
        state.fabric.subscribe(chennai_conn, "Chennai").await;
        let (other_conn, mut other_rx) = state.fabric.register().await;
        state.fabric.subscribe(other_conn, "Delhi").await;

        let (event, recipients) = create_manual_alert(
            &state,
            AlertType::General,
            None,
            "Water main repair".to_string(),
            Some("Chennai".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(recipients, 2);
        assert_eq!(event.severity, Severity::Info);

        match chennai_rx.try_recv().unwrap() {
            PushMessage::NewAlert { alert } => {
                assert_eq!(alert.message, "Water main repair");
            }
            other => panic!("unexpected push: {:?}", other),
        }
        assert!(other_rx.try_recv().is_err());

        // Without a city the alert reaches every user and every connection.
        let (_, recipients) = create_manual_alert(
            &state,
            AlertType::Energy,
            Some(Severity::High),
            "Grid maintenance tonight".to_string(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(recipients, 3);
        assert!(chennai_rx.try_recv().is_ok());
        assert!(other_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn manual_alert_rejects_empty_fields() {
        // ---
        let state = app();
        assert!(matches!(
            create_manual_alert(&state, AlertType::General, None, "  ".to_string(), None).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            create_manual_alert(
                &state,
                AlertType::Custom("".to_string()),
                None,
                "valid message".to_string(),
                None
            )
            .await,
            Err(CoreError::Validation(_))
        ));
    }
}
