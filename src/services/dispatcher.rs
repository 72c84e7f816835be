//! Fan-out from the change feed to evaluation passes.
//!
//! Each symbol gets one worker fed by a bounded queue, so prices for the same
//! symbol are evaluated strictly one after another in arrival order. Workers
//! for different symbols run in parallel, but every pass first takes a permit
//! from a shared semaphore, which caps how many evaluations touch the stores
//! at once. A full queue makes `dispatch` wait, pushing back on the watcher
//! instead of piling up tasks.
//!
//! A worker that sees no price for `worker_idle` closes its queue and exits;
//! the next price for that symbol starts a fresh one.

use std::{collections::HashMap, sync::Arc};

use tokio::{
    sync::{Semaphore, mpsc},
    task::JoinSet,
    time::timeout,
};

use crate::{AppState, models::PriceUpdate};

use super::alert_evaluator::process_price_update;

pub struct Dispatcher {
    state: AppState,
    queues: HashMap<String, mpsc::Sender<f64>>,
    workers: JoinSet<()>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(state: AppState) -> Self {
        let permits = Arc::new(Semaphore::new(state.settings.max_concurrency));

        Self {
            state,
            queues: HashMap::new(),
            workers: JoinSet::new(),
            permits,
        }
    }

    /// Queues the update for its symbol's worker, starting one if needed.
    /// Waits only while that symbol's queue is full.
    pub async fn dispatch(&mut self, update: PriceUpdate) {
        let PriceUpdate { symbol, mut price } = update;

        if let Some(tx) = self.queues.get(&symbol) {
            match tx.send(price).await {
                Ok(()) => return,
                // worker went idle (or died) and closed its queue
                Err(mpsc::error::SendError(p)) => price = p,
            }
        }

        self.prune();
        let tx = self.spawn_worker(symbol.clone());
        if tx.send(price).await.is_err() {
            tracing::warn!(symbol = %symbol, "evaluation worker stopped, dropping price {}", price);
            return;
        }
        self.queues.insert(symbol, tx);
    }

    fn spawn_worker(&mut self, symbol: String) -> mpsc::Sender<f64> {
        let (tx, rx) = mpsc::channel(self.state.settings.symbol_queue);
        let state = self.state.clone();
        let permits = self.permits.clone();

        self.workers.spawn(symbol_worker(state, symbol, rx, permits));
        tx
    }

    /// Forgets queues whose worker has exited and reaps finished tasks.
    fn prune(&mut self) {
        self.queues.retain(|_, tx| !tx.is_closed());
        while let Some(res) = self.workers.try_join_next() {
            if let Err(e) = res {
                tracing::error!("evaluation worker failed: {}", e);
            }
        }
    }

    /// Number of symbols with a live worker.
    pub fn active_symbols(&mut self) -> usize {
        self.prune();
        self.queues.len()
    }

    /// Closes every queue and waits until already-queued prices are evaluated,
    /// for at most `shutdown_grace`. Whatever is still running then is aborted.
    pub async fn shutdown(mut self) {
        self.queues.clear();

        let grace = self.state.settings.shutdown_grace;
        if timeout(grace, drain(&mut self.workers)).await.is_err() {
            tracing::warn!(
                pending = self.workers.len(),
                "evaluations still running after {:?}, aborting",
                grace
            );
            self.workers.abort_all();
            while self.workers.join_next().await.is_some() {}
        }
    }
}

async fn drain(workers: &mut JoinSet<()>) {
    while let Some(res) = workers.join_next().await {
        if let Err(e) = res {
            tracing::error!("evaluation worker failed: {}", e);
        }
    }
}

async fn symbol_worker(
    state: AppState,
    symbol: String,
    mut rx: mpsc::Receiver<f64>,
    permits: Arc<Semaphore>,
) {
    let idle = state.settings.worker_idle;

    loop {
        let price = match timeout(idle, rx.recv()).await {
            Ok(Some(price)) => price,
            Ok(None) => return,
            Err(_) => {
                // refuse new sends, then finish anything that slipped in
                rx.close();
                while let Some(price) = rx.recv().await {
                    evaluate(&state, &symbol, price, &permits).await;
                }
                tracing::debug!(symbol = %symbol, "evaluation worker idle, exiting");
                return;
            }
        };

        evaluate(&state, &symbol, price, &permits).await;
    }
}

async fn evaluate(state: &AppState, symbol: &str, price: f64, permits: &Semaphore) {
    let Ok(_permit) = permits.acquire().await else {
        return;
    };

    // errors are logged inside and contained to this pass
    let _ = process_price_update(state, symbol, price).await;
}
