#![allow(dead_code)]

use std::{
    future::pending,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use alert_engine::{
    AppState,
    config::Settings,
    error::{EngineError, StoreError},
    models::{Alert, Condition, Notification},
    services::change_feed,
    stores::{
        AlertStore, AlertStream, FeedStream, NotificationStore, PriceFeed, memory::MemoryStore,
    },
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use mongodb::bson::{DateTime, Document, oid::ObjectId};
use tokio::{sync::Barrier, task::JoinHandle};

pub fn state_over(store: Arc<MemoryStore>) -> AppState {
    AppState {
        settings: Settings::default(),
        alerts: store.clone(),
        notifications: store,
    }
}

pub fn seed_alert(
    store: &MemoryStore,
    owner: ObjectId,
    symbol: &str,
    condition: Condition,
    target: f64,
) -> Alert {
    let alert = Alert::new(owner, symbol, condition, target);
    store.insert_alert(&alert).expect("seed alert");
    alert
}

/// Starts the watcher over the memory feed and waits until it is subscribed.
pub async fn start_watcher(store: Arc<MemoryStore>) -> JoinHandle<Result<(), EngineError>> {
    let state = state_over(store.clone());
    let feed = store.clone();
    let handle = tokio::spawn(async move {
        change_feed::watch_price_updates(state, feed.as_ref(), pending()).await
    });

    wait_for(|| store.subscriber_count() > 0).await;
    handle
}

/// Closes the feed and waits for the watcher to drain.
pub async fn finish(store: &MemoryStore, handle: JoinHandle<Result<(), EngineError>>) {
    store.close_feed();
    let res = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("watcher did not stop")
        .expect("watcher panicked");
    assert!(res.is_ok(), "watcher returned {res:?}");
}

pub async fn wait_for(cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// Alert store whose scan or deactivate can be switched to fail.
pub struct FlakyAlerts {
    pub inner: Arc<MemoryStore>,
    pub fail_scan: AtomicBool,
    pub fail_deactivate: AtomicBool,
}

impl FlakyAlerts {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_scan: AtomicBool::new(false),
            fail_deactivate: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl AlertStore for FlakyAlerts {
    async fn find_active(&self, symbol: &str) -> Result<AlertStream, StoreError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("no primary".to_string()));
        }
        self.inner.find_active(symbol).await
    }

    async fn deactivate(&self, id: ObjectId, at: DateTime) -> Result<bool, StoreError> {
        if self.fail_deactivate.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write concern timeout".to_string()));
        }
        self.inner.deactivate(id, at).await
    }
}

/// Notification sink that always rejects inserts.
pub struct RejectingNotifications {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl NotificationStore for RejectingNotifications {
    async fn insert(&self, _notification: &Notification) -> Result<(), StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

/// Holds every scanner at a barrier after it has read the active set, so
/// concurrent passes all see the alert as active before anyone writes.
pub struct BarrierAlerts {
    pub inner: Arc<MemoryStore>,
    pub barrier: Barrier,
}

#[async_trait]
impl AlertStore for BarrierAlerts {
    async fn find_active(&self, symbol: &str) -> Result<AlertStream, StoreError> {
        let snapshot: Vec<_> = self.inner.find_active(symbol).await?.collect().await;
        self.barrier.wait().await;
        Ok(stream::iter(snapshot).boxed())
    }

    async fn deactivate(&self, id: ObjectId, at: DateTime) -> Result<bool, StoreError> {
        self.inner.deactivate(id, at).await
    }
}

/// Feed that replays scripted subscriptions, one per `subscribe` call.
pub struct ScriptedFeed {
    pub scripts: Mutex<Vec<Vec<Result<Option<Document>, StoreError>>>>,
    pub subscribes: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new(mut scripts: Vec<Vec<Result<Option<Document>, StoreError>>>) -> Self {
        scripts.reverse();
        Self {
            scripts: Mutex::new(scripts),
            subscribes: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PriceFeed for ScriptedFeed {
    async fn subscribe(&self) -> Result<FeedStream, StoreError> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().unwrap().pop();
        match next {
            Some(items) => Ok(stream::iter(items).boxed()),
            None => Err(StoreError::Unavailable("connection refused".to_string())),
        }
    }
}
