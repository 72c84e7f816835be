use std::fmt;

use mongodb::bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// Direction of a price alert. Stored as `"ABOVE"` / `"BELOW"`; anything
/// else is kept verbatim and never fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Above,
    Below,
    Other(String),
}

impl Condition {
    /// Equality fires in both directions.
    pub fn is_met(&self, price: f64, target: f64) -> bool {
        match self {
            Condition::Above => price >= target,
            Condition::Below => price <= target,
            Condition::Other(_) => false,
        }
    }
}

impl From<String> for Condition {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "ABOVE" => Condition::Above,
            "BELOW" => Condition::Below,
            _ => Condition::Other(raw),
        }
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Above => f.write_str("ABOVE"),
            Condition::Below => f.write_str("BELOW"),
            Condition::Other(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    // owner
    pub user: ObjectId,
    pub symbol: String,
    pub target_price: f64,
    pub condition: Condition,

    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_at: Option<DateTime>,
}

impl Alert {
    pub fn new(user: ObjectId, symbol: &str, condition: Condition, target_price: f64) -> Self {
        Self {
            id: ObjectId::new(),
            user,
            symbol: symbol.trim().to_uppercase(),
            target_price,
            condition,
            is_active: true,
            triggered_at: None,
        }
    }

    /// Inactive alerts never fire, whatever the price.
    pub fn should_trigger(&self, price: f64) -> bool {
        self.is_active && self.condition.is_met(price, self.target_price)
    }
}
