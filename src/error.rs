use mongodb::error::ErrorKind;
use thiserror::Error;

/// Failure reported by one of the record stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A single record could not be decoded; callers skip it and move on.
    #[error("decode error: {0}")]
    Decode(String),

    /// The store could not serve the request; the current pass is abandoned.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::BsonDeserialization(_) => StoreError::Decode(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Errors that stop the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not connect to the record store: {0}")]
    Connect(String),

    #[error("could not open the price change feed: {0}")]
    Subscribe(#[source] StoreError),
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document};

    use super::*;

    #[test]
    fn bson_decode_failures_are_classified_as_decode() {
        let err = from_document::<crate::models::Alert>(doc! { "symbol": 5 }).unwrap_err();
        assert!(matches!(StoreError::from(err), StoreError::Decode(_)));
    }

    #[test]
    fn driver_deserialization_errors_are_decode() {
        let bson_err = from_document::<crate::models::Alert>(doc! {}).unwrap_err();
        let driver_err = mongodb::error::Error::from(bson_err);
        assert!(matches!(StoreError::from(driver_err), StoreError::Decode(_)));
    }

    #[test]
    fn other_driver_errors_are_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let driver_err = mongodb::error::Error::from(io_err);
        assert!(matches!(StoreError::from(driver_err), StoreError::Unavailable(_)));
    }
}
