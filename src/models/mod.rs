pub mod alert;
pub mod notification;
pub mod price_update;

pub use alert::{Alert, Condition};
pub use notification::Notification;
pub use price_update::{FieldIssue, PriceUpdate};
