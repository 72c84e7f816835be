use futures_util::StreamExt;

use crate::{AppState, error::StoreError, models::Alert};

use super::trigger_executor::{TriggerOutcome, execute_alert};

/// What one evaluation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationSummary {
    pub scanned: usize,
    pub skipped: usize,
    pub triggered: usize,
    pub notified: usize,
    pub lost_races: usize,
}

/// Scans the active alerts for `symbol` and keeps the ones `price` satisfies.
///
/// Records that fail to decode are logged and skipped. Any other cursor
/// failure aborts the scan; there is no retry, the next price tick for the
/// symbol scans again.
pub async fn find_triggered(
    state: &AppState,
    symbol: &str,
    price: f64,
) -> Result<(Vec<Alert>, EvaluationSummary), StoreError> {
    let mut summary = EvaluationSummary::default();

    let mut cursor = state.alerts.find_active(symbol).await?;

    let mut hits: Vec<Alert> = Vec::new();
    while let Some(item) = cursor.next().await {
        let alert = match item {
            Ok(a) => a,
            Err(StoreError::Decode(e)) => {
                tracing::warn!(symbol, "alert decode error: {}", e);
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        summary.scanned += 1;
        if alert.should_trigger(price) {
            hits.push(alert);
        }
    }

    Ok((hits, summary))
}

/// One full pipeline pass for a price event: scan, filter, then fire each
/// hit in turn. Deactivate failures are contained per alert.
pub async fn process_price_update(
    state: &AppState,
    symbol: &str,
    price: f64,
) -> Result<EvaluationSummary, StoreError> {
    let (hits, mut summary) = match find_triggered(state, symbol, price).await {
        Ok(found) => found,
        Err(e) => {
            tracing::error!(symbol, "alert lookup failed: {}", e);
            return Err(e);
        }
    };

    for alert in &hits {
        match execute_alert(state, alert, price).await {
            Ok(TriggerOutcome::Notified) => {
                summary.triggered += 1;
                summary.notified += 1;
            }
            Ok(TriggerOutcome::NotificationFailed) => summary.triggered += 1,
            Ok(TriggerOutcome::AlreadyTriggered) => summary.lost_races += 1,
            // already logged; the alert stays active for the next tick
            Err(_) => {}
        }
    }

    Ok(summary)
}
