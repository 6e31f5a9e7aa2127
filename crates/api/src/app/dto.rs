use serde::Deserialize;
use serde::de::DeserializeOwned;

use catalog_core::{CatalogError, ProductId};
use catalog_products::{BoolParam, ImageUrlMode};

// -------------------------
// Query parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ImageQuery {
    #[serde(rename = "fullyQualifyImageUrls")]
    pub fully_qualify_image_urls: Option<String>,
}

impl ImageQuery {
    pub fn mode(&self) -> ImageUrlMode {
        BoolParam::parse(self.fully_qualify_image_urls.as_deref()).into()
    }
}

// -------------------------
// Body / path decoding
// -------------------------

/// Decode a JSON body, turning any failure into a structured payload error.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, CatalogError> {
    serde_json::from_slice(body).map_err(|e| CatalogError::payload(e.to_string()))
}

/// Split a comma-separated id list, one entry per segment.
pub fn parse_id_list(raw: &str) -> Vec<ProductId> {
    raw.split(',').map(|part| ProductId::from(part.trim())).collect()
}

#[cfg(test)]
mod tests {
    use catalog_products::InventoryDelta;

    use super::*;

    #[test]
    fn id_list_keeps_one_entry_per_segment() {
        let ids = parse_id_list(" a,b,,a ");
        let ids: Vec<&str> = ids.iter().map(ProductId::as_str).collect();
        assert_eq!(ids, ["a", "b", "", "a"]);

        assert_eq!(parse_id_list("a").len(), 1);
        assert_eq!(parse_id_list("a,").len(), 2);
    }

    #[test]
    fn image_mode_defaults_to_fully_qualified() {
        assert_eq!(ImageQuery::default().mode(), ImageUrlMode::FullyQualified);

        let q = ImageQuery {
            fully_qualify_image_urls: Some("false".to_string()),
        };
        assert_eq!(q.mode(), ImageUrlMode::Bare);
    }

    #[test]
    fn malformed_body_is_a_payload_error() {
        let err = decode_json::<InventoryDelta>(b"{\"stockDelta\": \"ten\"}").unwrap_err();
        assert!(matches!(err, CatalogError::Payload(_)));

        let ok: InventoryDelta = decode_json(b"{\"stockDelta\": -3}").unwrap();
        assert_eq!(ok.stock_delta, -3);
    }
}
