//! Record-store capabilities the pipeline is wired against.
//!
//! The engine never talks to a driver directly: the watcher pulls from a
//! [`PriceFeed`], the evaluator scans an [`AlertStore`], and the trigger path
//! writes through [`AlertStore::deactivate`] and [`NotificationStore::insert`].
//! `mongo` backs these with real collections, `memory` with in-process maps.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use mongodb::bson::{DateTime, Document, oid::ObjectId};

use crate::{
    error::StoreError,
    models::{Alert, Notification},
};

/// Post-images of price updates, in feed order. `Ok(None)` means the record
/// was gone by the time its post-image was looked up.
pub type FeedStream = BoxStream<'static, Result<Option<Document>, StoreError>>;

/// Cursor over scanned alerts. Items may fail individually.
pub type AlertStream = BoxStream<'static, Result<Alert, StoreError>>;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Opens a subscription starting at "now". Earlier events are not replayed.
    async fn subscribe(&self) -> Result<FeedStream, StoreError>;
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Active alerts for one symbol.
    async fn find_active(&self, symbol: &str) -> Result<AlertStream, StoreError>;

    /// Flips `isActive` to false and stamps `triggeredAt`, but only if the
    /// record is still active. Returns true when this call made the change.
    async fn deactivate(&self, id: ObjectId, at: DateTime) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<(), StoreError>;
}
