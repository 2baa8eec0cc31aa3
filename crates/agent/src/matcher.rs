//! Fuzzy resolution of free text to a cart item.

use homequote_core::domain::cart::CartItem;

/// Category keywords tried when no cart item name matches directly. The
/// first category with a keyword present in the text selects the first cart
/// item whose name contains any keyword of that category.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    ("hvac", &["hvac", "heating", "cooling", "furnace", "air conditioning", "heat pump", "ac"]),
    ("plumbing", &["plumbing", "plumber", "pipe", "drain", "leak", "water heater"]),
    ("kitchen", &["kitchen", "cabinet", "countertop"]),
    ("bathroom", &["bathroom", "bath", "shower", "toilet"]),
    ("electrical", &["electrical", "electrician", "wiring", "outlet", "panel"]),
    ("roofing", &["roof", "roofing", "shingle", "gutter"]),
    ("lawn", &["lawn", "mowing", "grass", "yard"]),
    ("tree", &["tree", "stump", "branch"]),
];

/// Matches free text against the cart: (a) bidirectional case-insensitive
/// substring against item names, (b) category keyword table. Returns the
/// item index alongside the item.
pub fn match_cart_item<'a>(text: &str, items: &'a [CartItem]) -> Option<(usize, &'a CartItem)> {
    let needle = text.trim().to_ascii_lowercase();
    if needle.is_empty() || items.is_empty() {
        return None;
    }

    for (index, item) in items.iter().enumerate() {
        let name = item.service_name.to_ascii_lowercase();
        if name.contains(&needle) || needle.contains(&name) {
            return Some((index, item));
        }
    }

    let category = CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| contains_word(&needle, keyword)))?;

    items.iter().enumerate().find(|(_, item)| {
        let name = item.service_name.to_ascii_lowercase();
        category.1.iter().any(|keyword| name.contains(keyword))
    })
}

/// Explicit fallback rule: with exactly one item in the cart, an unmatched
/// reference is assumed to mean that item.
pub fn resolve_target<'a>(text: &str, items: &'a [CartItem]) -> Option<(usize, &'a CartItem)> {
    match_cart_item(text, items).or_else(|| {
        if items.len() == 1 {
            Some((0, &items[0]))
        } else {
            None
        }
    })
}

/// Word-boundary containment so "ac" does not match inside "replace".
fn contains_word(haystack: &str, word: &str) -> bool {
    if word.contains(' ') {
        return haystack.contains(word);
    }
    haystack.split(|ch: char| !ch.is_ascii_alphanumeric()).any(|token| token == word)
}
