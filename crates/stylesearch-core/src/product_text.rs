//! Canonical searchable text for a product.
//!
//! Field order is fixed: name, brand, category, subcategory, each color, each
//! style tag, description, then the secondary metadata keys in
//! [`SECONDARY_KEYS`] order. Missing fields are skipped. The builder keeps the
//! source casing; lowercasing happens when the text is indexed.

use crate::types::{field_text, Payload, ProductDocument};

/// Extra payload keys that contribute to the searchable text when present.
pub const SECONDARY_KEYS: [&str; 4] = ["model", "colorways", "product_type", "gender"];

impl ProductDocument {
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        for field in [&self.name, &self.brand, &self.category, &self.subcategory] {
            if let Some(value) = field { parts.push(value); }
        }
        parts.extend(self.colors.iter().map(String::as_str));
        parts.extend(self.style_tags.iter().map(String::as_str));
        if let Some(description) = &self.description { parts.push(description); }
        let secondary: Vec<String> = SECONDARY_KEYS.iter().filter_map(|key| field_text(&self.metadata, key)).collect();
        parts.extend(secondary.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Build the raw-cased searchable text straight from a payload.
pub fn build_text(payload: &Payload) -> String {
    let doc = ProductDocument {
        name: field_text(payload, "name"),
        brand: field_text(payload, "brand"),
        category: field_text(payload, "category"),
        subcategory: field_text(payload, "subcategory"),
        colors: crate::types::field_list(payload, "colors"),
        style_tags: crate::types::field_list(payload, "style_tags"),
        description: field_text(payload, "description"),
        metadata: payload.clone(),
        ..ProductDocument::default()
    };
    doc.searchable_text()
}
