use serde::{Deserialize, Serialize};

use catalog_core::{Entity, ExpectedRevision, ProductId};

use crate::label::ConfidenceLabel;

/// A catalog product as stored and served.
///
/// `revision` is assigned by the repository and bumped on every write;
/// `image_labels` is only ever written by enrichment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: ProductId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub gender_affinity: String,
    #[serde(default, alias = "currentStock")]
    pub current_stock: i64,
    #[serde(default)]
    pub promoted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_labels: Option<Vec<ConfidenceLabel>>,
    #[serde(default)]
    pub revision: u64,
}

impl Product {
    /// Build a brand-new record from a validated draft.
    ///
    /// The id is supplied by the repository; any id in the draft payload is
    /// ignored.
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Self {
        let mut product = Self {
            id,
            revision: 1,
            ..Self::default()
        };
        product.replace_fields(draft);
        product
    }

    /// Full replace of the mutable fields. Identity, labels and revision stay.
    pub fn replace_fields(&mut self, draft: ProductDraft) {
        self.url = draft.url;
        self.sku = draft.sku;
        self.name = draft.name;
        self.category = draft.category;
        self.style = draft.style;
        self.description = draft.description;
        self.price = draft.price;
        self.image = draft.image;
        self.featured = draft.featured;
        self.gender_affinity = draft.gender_affinity;
        self.current_stock = draft.current_stock;
        self.promoted = draft.promoted;
    }

    /// Wholesale label replacement; previous labels are discarded, never merged.
    pub fn replace_labels(&mut self, labels: Vec<ConfidenceLabel>) {
        self.image_labels = Some(labels);
    }

    /// Object key of the product image in the image bucket.
    pub fn storage_key(&self) -> String {
        format!("images/{}/{}", self.category, self.image)
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Request payload for create and full update.
///
/// Missing fields decode to their zero value, so an absent `name` surfaces as
/// a validation failure rather than a decode failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductDraft {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub gender_affinity: String,
    #[serde(default, alias = "currentStock")]
    pub current_stock: i64,
    #[serde(default)]
    pub promoted: bool,
    /// Revision the client last saw; makes an update conditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl ProductDraft {
    pub fn expected_revision(&self) -> ExpectedRevision {
        self.revision.into()
    }
}

/// Request payload for an inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDelta {
    #[serde(rename = "stockDelta", alias = "stock_delta")]
    pub stock_delta: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft {
            name: "Trail Runner".to_string(),
            category: "footwear".to_string(),
            price: 89.5,
            image: "trail.png".to_string(),
            current_stock: 12,
            ..ProductDraft::default()
        }
    }

    #[test]
    fn from_draft_assigns_identity_and_first_revision() {
        let product = Product::from_draft(ProductId::from("p-1"), draft());
        assert!(product.is_initialized());
        assert_eq!(product.id.as_str(), "p-1");
        assert_eq!(product.revision, 1);
        assert_eq!(product.name, "Trail Runner");
        assert!(product.image_labels.is_none());
    }

    #[test]
    fn default_product_is_not_initialized() {
        assert!(!Product::default().is_initialized());
    }

    #[test]
    fn replace_fields_keeps_labels_and_identity() {
        let mut product = Product::from_draft(ProductId::from("p-1"), draft());
        product.replace_labels(vec![ConfidenceLabel::new("Shoe", 98.0)]);

        let mut next = draft();
        next.name = "Trail Runner II".to_string();
        next.current_stock = 3;
        product.replace_fields(next);

        assert_eq!(product.id.as_str(), "p-1");
        assert_eq!(product.name, "Trail Runner II");
        assert_eq!(product.current_stock, 3);
        assert_eq!(product.image_labels.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn replace_labels_discards_previous_labels() {
        let mut product = Product::from_draft(ProductId::from("p-1"), draft());
        product.replace_labels(vec![ConfidenceLabel::new("Shoe", 98.0), ConfidenceLabel::new("Boot", 40.0)]);
        product.replace_labels(vec![ConfidenceLabel::new("Sneaker", 91.0)]);
        assert_eq!(product.image_labels, Some(vec![ConfidenceLabel::new("Sneaker", 91.0)]));
    }

    #[test]
    fn storage_key_is_scoped_by_category() {
        let product = Product::from_draft(ProductId::from("p-1"), draft());
        assert_eq!(product.storage_key(), "images/footwear/trail.png");
    }

    #[test]
    fn draft_accepts_camel_case_stock_and_ignores_unknown_fields() {
        let draft: ProductDraft = serde_json::from_str(
            r#"{"id":"client-chosen","name":"Mug","price":4.0,"currentStock":7,"category":"kitchen"}"#,
        )
        .unwrap();
        assert_eq!(draft.current_stock, 7);
        assert_eq!(draft.name, "Mug");
        assert_eq!(draft.expected_revision(), ExpectedRevision::Any);
    }

    #[test]
    fn draft_revision_makes_update_conditional() {
        let draft: ProductDraft = serde_json::from_str(r#"{"name":"Mug","revision":4}"#).unwrap();
        assert_eq!(draft.expected_revision(), ExpectedRevision::Exact(4));
    }

    #[test]
    fn inventory_delta_uses_stock_delta_field() {
        let delta: InventoryDelta = serde_json::from_str(r#"{"stockDelta":-3}"#).unwrap();
        assert_eq!(delta.stock_delta, -3);
    }

    #[test]
    fn product_omits_labels_until_enriched() {
        let product = Product::from_draft(ProductId::from("p-1"), draft());
        let json = serde_json::to_value(&product).unwrap();
        assert!(json.get("image_labels").is_none());
        assert_eq!(json["current_stock"], 12);
    }
}
