use std::{future::Future, time::Duration};

use futures_util::StreamExt;

use crate::{
    AppState,
    error::{EngineError, StoreError},
    models::{FieldIssue, PriceUpdate},
    stores::PriceFeed,
};

use super::dispatcher::Dispatcher;

const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Target for dropped feed records, so data-quality problems can be filtered on.
pub const FEED_QUALITY: &str = "alert_engine::feed_quality";

/// Consumes the price feed until it ends, fails to (re)open, or `shutdown`
/// resolves. Accepted price updates are handed to the dispatcher without
/// waiting for their evaluation. Queued evaluations are drained before
/// returning, whichever way the loop ended.
pub async fn watch_price_updates<S>(
    state: AppState,
    feed: &dyn PriceFeed,
    shutdown: S,
) -> Result<(), EngineError>
where
    S: Future<Output = ()>,
{
    let mut dispatcher = Dispatcher::new(state);

    let result = tokio::select! {
        res = consume(feed, &mut dispatcher) => res,
        _ = shutdown => {
            tracing::info!("shutdown requested, stopping price watcher");
            Ok(())
        }
    };

    dispatcher.shutdown().await;
    result
}

async fn consume(feed: &dyn PriceFeed, dispatcher: &mut Dispatcher) -> Result<(), EngineError> {
    loop {
        let mut stream = feed.subscribe().await.map_err(EngineError::Subscribe)?;
        tracing::info!("watching for price changes");

        loop {
            match stream.next().await {
                Some(Ok(Some(post_image))) => match PriceUpdate::from_post_image(&post_image) {
                    Ok(update) => {
                        tracing::info!(
                            symbol = %update.symbol,
                            price = update.price,
                            "price update"
                        );
                        dispatcher.dispatch(update).await;
                    }
                    Err(issue) => report_dropped(&issue),
                },
                Some(Ok(None)) => report_dropped(&FieldIssue::MissingPostImage),
                Some(Err(StoreError::Decode(e))) => {
                    tracing::warn!("change event decode error: {}", e);
                }
                Some(Err(e)) => {
                    // events until the new subscription opens are lost
                    tracing::warn!("price feed interrupted, resubscribing: {}", e);
                    break;
                }
                None => {
                    tracing::info!("price feed closed");
                    return Ok(());
                }
            }
        }

        tokio::time::sleep(RESUBSCRIBE_DELAY).await;
    }
}

fn report_dropped(issue: &FieldIssue) {
    tracing::warn!(target: FEED_QUALITY, "dropped price event: {}", issue);
}
