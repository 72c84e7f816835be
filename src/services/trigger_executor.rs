use chrono::Utc;
use mongodb::bson::DateTime;

use crate::{
    AppState,
    error::StoreError,
    models::{Alert, Notification},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Deactivated and the notification was stored.
    Notified,
    /// Deactivated, but the notification insert failed. Not rolled back.
    NotificationFailed,
    /// Another pass deactivated the alert first; nothing written.
    AlreadyTriggered,
}

/// Deactivate-then-notify for one alert whose condition held at `price`.
///
/// The deactivation is a compare-and-swap on `isActive == true`, so when two
/// passes race on the same alert only the one whose write lands sends the
/// notification. An `Err` means the deactivation itself failed and the alert
/// is still active; the next qualifying price event will try again.
pub async fn execute_alert(
    state: &AppState,
    alert: &Alert,
    price: f64,
) -> Result<TriggerOutcome, StoreError> {
    let now = DateTime::from_millis(Utc::now().timestamp_millis());

    let won = match state.alerts.deactivate(alert.id, now).await {
        Ok(won) => won,
        Err(e) => {
            tracing::error!(
                alert = %alert.id,
                symbol = %alert.symbol,
                "failed to deactivate alert: {}",
                e
            );
            return Err(e);
        }
    };

    if !won {
        tracing::debug!(alert = %alert.id, "alert already triggered by another pass");
        return Ok(TriggerOutcome::AlreadyTriggered);
    }

    tracing::info!(
        symbol = %alert.symbol,
        target = alert.target_price,
        price,
        owner = %alert.user,
        "alert triggered"
    );

    let notification = Notification::price_alert(alert, price);
    if let Err(e) = state.notifications.insert(&notification).await {
        tracing::warn!(
            alert = %alert.id,
            owner = %alert.user,
            "failed to create notification: {}",
            e
        );
        return Ok(TriggerOutcome::NotificationFailed);
    }

    Ok(TriggerOutcome::Notified)
}
