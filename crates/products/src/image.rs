//! Display image URL resolution.
//!
//! Resolution rewrites the `image` field in place and is not idempotent:
//! resolving an already fully-qualified URL prefixes it a second time. Apply
//! it once per response, after all persistence.

use crate::category::Category;
use crate::product::Product;

/// Filename served when a record has no image of its own.
pub const PLACEHOLDER_IMAGE: &str = "product_image_coming_soon.png";

/// Outcome of parsing a boolean-like query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolParam {
    Absent,
    True,
    False,
    Invalid,
}

impl BoolParam {
    /// Parse the accepted spellings: `1 t T TRUE true True` and their false
    /// counterparts. An empty value counts as absent.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => BoolParam::Absent,
            Some("1" | "t" | "T" | "TRUE" | "true" | "True") => BoolParam::True,
            Some("0" | "f" | "F" | "FALSE" | "false" | "False") => BoolParam::False,
            Some(_) => BoolParam::Invalid,
        }
    }
}

/// Whether responses carry absolute image URLs or bare filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageUrlMode {
    #[default]
    FullyQualified,
    Bare,
}

impl From<BoolParam> for ImageUrlMode {
    /// Absent means fully qualified; an unparseable toggle falls back to bare.
    fn from(param: BoolParam) -> Self {
        match param {
            BoolParam::Absent | BoolParam::True => ImageUrlMode::FullyQualified,
            BoolParam::False | BoolParam::Invalid => ImageUrlMode::Bare,
        }
    }
}

/// A record with an image that lives under a named scope.
pub trait ImageScoped {
    /// Path segment the image is stored under.
    fn image_scope(&self) -> &str;

    fn image(&self) -> &str;

    fn set_image(&mut self, image: String);
}

impl ImageScoped for Product {
    fn image_scope(&self) -> &str {
        &self.category
    }

    fn image(&self) -> &str {
        &self.image
    }

    fn set_image(&mut self, image: String) {
        self.image = image;
    }
}

impl ImageScoped for Category {
    fn image_scope(&self) -> &str {
        &self.name
    }

    fn image(&self) -> &str {
        &self.image
    }

    fn set_image(&mut self, image: String) {
        self.image = image;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolver {
    root: String,
    placeholder: String,
}

impl ImageResolver {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            placeholder: PLACEHOLDER_IMAGE.to_string(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// True when the image names a real file rather than nothing/the placeholder.
    pub fn has_own_image(&self, image: &str) -> bool {
        !image.is_empty() && image != self.placeholder
    }

    pub fn resolve<T: ImageScoped>(&self, record: &mut T, mode: ImageUrlMode) {
        let resolved = match (mode, self.has_own_image(record.image())) {
            (ImageUrlMode::FullyQualified, true) => {
                format!("{}{}/{}", self.root, record.image_scope(), record.image())
            }
            (ImageUrlMode::FullyQualified, false) => format!("{}{}", self.root, self.placeholder),
            (ImageUrlMode::Bare, false) => self.placeholder.clone(),
            (ImageUrlMode::Bare, true) => return,
        };
        record.set_image(resolved);
    }

    pub fn resolve_all<T: ImageScoped>(&self, records: &mut [T], mode: ImageUrlMode) {
        for record in records.iter_mut() {
            self.resolve(record, mode);
        }
    }
}
