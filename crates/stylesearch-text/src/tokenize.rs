use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static pattern"));

/// Split free text into lowercase lexical tokens.
///
/// Every character that is neither a Unicode word character nor whitespace
/// becomes a separator. Tokens of a single character are dropped. No stemming
/// and no stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ").to_lowercase();
    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect()
}
