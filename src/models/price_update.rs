use mongodb::bson::{Bson, Document};
use thiserror::Error;

/// `(symbol, newPrice)` pulled out of one change-feed post-image.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: f64,
}

/// Why a feed record was dropped before evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldIssue {
    #[error("post-image missing")]
    MissingPostImage,

    #[error("`{0}` missing")]
    Missing(&'static str),

    #[error("`{field}` has type {found:?}")]
    WrongType {
        field: &'static str,
        found: mongodb::bson::spec::ElementType,
    },

    #[error("`currentPrice` is not finite ({0})")]
    NonFinite(f64),
}

impl PriceUpdate {
    pub fn from_post_image(doc: &Document) -> Result<Self, FieldIssue> {
        let symbol = match doc.get("symbol") {
            Some(Bson::String(s)) => s.clone(),
            Some(other) => {
                return Err(FieldIssue::WrongType {
                    field: "symbol",
                    found: other.element_type(),
                })
            }
            None => return Err(FieldIssue::Missing("symbol")),
        };

        // only doubles are prices; ints are a data-quality problem upstream
        let price = match doc.get("currentPrice") {
            Some(Bson::Double(p)) => *p,
            Some(other) => {
                return Err(FieldIssue::WrongType {
                    field: "currentPrice",
                    found: other.element_type(),
                })
            }
            None => return Err(FieldIssue::Missing("currentPrice")),
        };

        if !price.is_finite() {
            return Err(FieldIssue::NonFinite(price));
        }

        Ok(Self { symbol, price })
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, spec::ElementType};

    use super::*;

    #[test]
    fn extracts_symbol_and_price() {
        let d = doc! {
            "symbol": "ACME",
            "name": "Acme Corp",
            "currentPrice": 101.0,
            "sector": "Tech",
        };
        let u = PriceUpdate::from_post_image(&d).unwrap();
        assert_eq!(u, PriceUpdate { symbol: "ACME".into(), price: 101.0 });
    }

    #[test]
    fn missing_fields_are_reported() {
        let no_symbol = doc! { "currentPrice": 1.0 };
        assert_eq!(
            PriceUpdate::from_post_image(&no_symbol),
            Err(FieldIssue::Missing("symbol"))
        );

        let no_price = doc! { "symbol": "ACME" };
        assert_eq!(
            PriceUpdate::from_post_image(&no_price),
            Err(FieldIssue::Missing("currentPrice"))
        );
    }

    #[test]
    fn integer_price_is_a_type_mismatch() {
        let d = doc! { "symbol": "ACME", "currentPrice": 101_i32 };
        assert_eq!(
            PriceUpdate::from_post_image(&d),
            Err(FieldIssue::WrongType { field: "currentPrice", found: ElementType::Int32 })
        );
    }

    #[test]
    fn non_string_symbol_is_a_type_mismatch() {
        let d = doc! { "symbol": 42_i64, "currentPrice": 1.0 };
        assert!(matches!(
            PriceUpdate::from_post_image(&d),
            Err(FieldIssue::WrongType { field: "symbol", .. })
        ));
    }

    #[test]
    fn nan_price_is_dropped() {
        let d = doc! { "symbol": "ACME", "currentPrice": f64::NAN };
        assert!(matches!(PriceUpdate::from_post_image(&d), Err(FieldIssue::NonFinite(_))));
    }
}
