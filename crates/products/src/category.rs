use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, Entity};

/// A product category. `name` is what products reference and what scopes the
/// category's images.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: CategoryId,
    #[serde(default)]
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
