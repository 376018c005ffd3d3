use stylesearch_core::types::{field_text, Payload};

/// Human-readable reasoning and field highlights for one hit.
///
/// A name matches when any whitespace-separated query word occurs in it;
/// brand and category match when they occur in the query. All comparisons
/// are case-insensitive; highlights keep the payload's casing.
pub fn explain(payload: &Payload, query: &str, score: f64) -> (String, Vec<String>) {
    let query_lower = query.to_lowercase();
    let mut reasons: Vec<&str> = Vec::new();
    let mut highlights = Vec::new();

    if let Some(name) = field_text(payload, "name") {
        let name_lower = name.to_lowercase();
        if query_lower.split_whitespace().any(|word| name_lower.contains(word)) {
            reasons.push("product name match");
            highlights.push(format!("Name: {name}"));
        }
    }
    if let Some(brand) = field_text(payload, "brand") {
        if query_lower.contains(&brand.to_lowercase()) {
            reasons.push("brand match");
            highlights.push(format!("Brand: {brand}"));
        }
    }
    if let Some(category) = field_text(payload, "category") {
        if query_lower.contains(&category.to_lowercase()) {
            reasons.push("category match");
            highlights.push(format!("Category: {category}"));
        }
    }

    if score >= 0.8 {
        reasons.push("high semantic similarity");
    } else if score >= 0.6 {
        reasons.push("good similarity");
    }
    if reasons.is_empty() {
        reasons.push("moderate similarity");
    }

    let reasoning = format!("Matched by: {} (score: {:.2}%)", reasons.join(", "), score * 100.0);
    (reasoning, highlights)
}
