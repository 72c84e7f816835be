use chrono::Utc;
use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::Alert;

pub const PRICE_ALERT: &str = "PRICE_ALERT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub recipient: ObjectId,

    #[serde(rename = "type")]
    pub kind: String,

    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Notification {
    /// Builds the unread PRICE_ALERT message for an alert that just fired.
    pub fn price_alert(alert: &Alert, price: f64) -> Self {
        let now = DateTime::from_millis(Utc::now().timestamp_millis());

        Self {
            recipient: alert.user,
            kind: PRICE_ALERT.to_string(),
            content: format!(
                "Price Alert: {} has hit ${:.2} (Target: ${:.2})",
                alert.symbol, price, alert.target_price
            ),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }
}
