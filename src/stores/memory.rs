//! In-process record store implementing all three capabilities.
//!
//! Stocks, alerts and notifications live in plain maps behind a mutex.
//! Price changes are published on a broadcast channel the same way a
//! change stream with `fullDocument: updateLookup` would deliver them:
//! only updates that actually change `currentPrice` are emitted, and each
//! event carries the complete record after the write.

use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use mongodb::bson::{Bson, DateTime, Document, doc, from_document, oid::ObjectId, to_document};
use tokio::sync::broadcast::{self, error::RecvError};

use super::{AlertStore, AlertStream, FeedStream, NotificationStore, PriceFeed};
use crate::{
    error::StoreError,
    models::{Alert, Notification},
};

const FEED_CAPACITY: usize = 1024;

#[derive(Default)]
struct Records {
    stocks: HashMap<String, Document>,
    // raw documents so malformed alerts can be seeded
    alerts: Vec<Document>,
    notifications: Vec<Notification>,
}

pub struct MemoryStore {
    records: Mutex<Records>,
    feed: Mutex<Option<broadcast::Sender<Document>>>,
    alert_writes: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            records: Mutex::new(Records::default()),
            feed: Mutex::new(Some(tx)),
            alert_writes: AtomicUsize::new(0),
        }
    }

    fn records(&self) -> MutexGuard<'_, Records> {
        // a panicked writer leaves plain data behind; keep serving it
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, post_image: Document) {
        let feed = self.feed.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = feed.as_ref() {
            // no subscribers is fine: nobody is watching
            let _ = tx.send(post_image);
        }
    }

    /// Creates or replaces a stock record without emitting a feed event.
    pub fn insert_stock(&self, symbol: &str, price: f64) {
        let sym = symbol.to_uppercase();
        let record = doc! { "_id": ObjectId::new(), "symbol": &sym, "currentPrice": price };
        self.records().stocks.insert(sym, record);
    }

    /// Point update of `currentPrice`. Emits the post-image when the value changed.
    pub fn set_price(&self, symbol: &str, price: f64) {
        let sym = symbol.to_uppercase();
        let post_image = {
            let mut records = self.records();
            let record = records
                .stocks
                .entry(sym.clone())
                .or_insert_with(|| doc! { "_id": ObjectId::new(), "symbol": &sym });

            if record.get_f64("currentPrice").ok() == Some(price) {
                return;
            }
            record.insert("currentPrice", price);
            record.clone()
        };
        self.publish(post_image);
    }

    /// Sets any other stock field. Never emitted: the feed only carries price changes.
    pub fn set_stock_field(&self, symbol: &str, key: &str, value: impl Into<Bson>) {
        let sym = symbol.to_uppercase();
        if let Some(record) = self.records().stocks.get_mut(&sym) {
            record.insert(key, value.into());
        }
    }

    /// Pushes an arbitrary post-image onto the feed, bypassing the stock map.
    pub fn publish_raw(&self, post_image: Document) {
        self.publish(post_image);
    }

    /// Ends every open subscription. Later subscribes fail.
    pub fn close_feed(&self) {
        self.feed.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    /// Open subscriptions on the feed.
    pub fn subscriber_count(&self) -> usize {
        self.feed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map_or(0, |tx| tx.receiver_count())
    }

    pub fn stock_price(&self, symbol: &str) -> Option<f64> {
        self.records()
            .stocks
            .get(&symbol.to_uppercase())
            .and_then(|d| d.get_f64("currentPrice").ok())
    }

    pub fn insert_alert(&self, alert: &Alert) -> Result<(), mongodb::bson::ser::Error> {
        self.insert_alert_document(to_document(alert)?);
        Ok(())
    }

    pub fn insert_alert_document(&self, raw: Document) {
        self.records().alerts.push(raw);
    }

    pub fn alert(&self, id: ObjectId) -> Option<Alert> {
        self.records()
            .alerts
            .iter()
            .find(|d| d.get_object_id("_id").ok() == Some(id))
            .and_then(|d| from_document(d.clone()).ok())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.records().notifications.clone()
    }

    /// Successful alert mutations so far.
    pub fn alert_writes(&self) -> usize {
        self.alert_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for MemoryStore {
    async fn subscribe(&self) -> Result<FeedStream, StoreError> {
        let rx = self
            .feed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|tx| tx.subscribe())
            .ok_or_else(|| StoreError::Unavailable("price feed closed".to_string()))?;

        let events = stream::unfold(rx, |mut rx| async move {
            let item = match rx.recv().await {
                Ok(post_image) => Ok(Some(post_image)),
                Err(RecvError::Lagged(n)) => {
                    Err(StoreError::Unavailable(format!("feed lagged, {n} events lost")))
                }
                Err(RecvError::Closed) => return None,
            };
            Some((item, rx))
        });

        Ok(events.boxed())
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn find_active(&self, symbol: &str) -> Result<AlertStream, StoreError> {
        // same predicate as the collection query: symbol match and isActive == true
        let matched: Vec<Result<Alert, StoreError>> = self
            .records()
            .alerts
            .iter()
            .filter(|d| d.get_str("symbol").ok() == Some(symbol))
            .filter(|d| d.get_bool("isActive").ok() == Some(true))
            .map(|d| from_document::<Alert>(d.clone()).map_err(StoreError::from))
            .collect();

        Ok(stream::iter(matched).boxed())
    }

    async fn deactivate(&self, id: ObjectId, at: DateTime) -> Result<bool, StoreError> {
        let mut records = self.records();
        let Some(record) = records.alerts.iter_mut().find(|d| {
            d.get_object_id("_id").ok() == Some(id) && d.get_bool("isActive").ok() == Some(true)
        }) else {
            return Ok(false);
        };

        record.insert("isActive", false);
        record.insert("triggeredAt", at);
        self.alert_writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> Result<(), StoreError> {
        self.records().notifications.push(notification.clone());
        Ok(())
    }
}
