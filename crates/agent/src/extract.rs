//! Pure text-to-slot-value extraction. An expected slot captures the whole
//! answer; a second pass opportunistically harvests cross-cutting fields
//! (address, phone, email, square footage) from any turn.

use std::collections::BTreeMap;

use homequote_core::domain::catalog::{Requirement, RequirementKind};

const STREET_SUFFIXES: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "dr", "drive", "ln", "lane", "blvd",
    "boulevard", "ct", "court", "way", "place", "pl", "circle", "cir", "terrace",
];

const SQUARE_FOOTAGE_UNITS: &[&str] = &["sqft", "sq", "square", "sf"];

pub fn extract(text: &str, expected: Option<&Requirement>) -> BTreeMap<String, String> {
    let mut extracted = BTreeMap::new();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return extracted;
    }

    if let Some(requirement) = expected {
        extracted.insert(requirement.key.clone(), expected_slot_value(trimmed, requirement));
    }

    // Common fields never overwrite a colliding expected-slot value.
    if let Some(address) = find_address(trimmed) {
        extracted.entry("address".to_string()).or_insert(address);
    }
    if let Some(phone) = find_phone(trimmed) {
        extracted.entry("phone".to_string()).or_insert(phone);
    }
    if let Some(email) = find_email(trimmed) {
        extracted.entry("email".to_string()).or_insert(email);
    }
    if let Some(square_footage) = find_square_footage(trimmed) {
        extracted.entry("square_footage".to_string()).or_insert(square_footage);
    }

    extracted
}

fn expected_slot_value(text: &str, requirement: &Requirement) -> String {
    match &requirement.kind {
        RequirementKind::Select { options } => {
            let lowered = text.to_ascii_lowercase();
            options
                .iter()
                .find(|option| lowered.contains(&option.to_ascii_lowercase()))
                .cloned()
                .unwrap_or_else(|| text.to_string())
        }
        RequirementKind::Text | RequirementKind::Number => text.to_string(),
    }
}

/// Street address: a number token followed by a street suffix within the
/// next few words.
fn find_address(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for (index, word) in words.iter().enumerate() {
        if !word.chars().all(|ch| ch.is_ascii_digit()) || word.is_empty() {
            continue;
        }
        let window_end = (index + 5).min(words.len());
        for end in index + 1..window_end {
            let candidate = normalize_word(words[end]);
            if STREET_SUFFIXES.contains(&candidate.as_str()) {
                return Some(words[index..=end].join(" ").trim_end_matches(['.', ',']).to_string());
            }
        }
    }
    None
}

/// 10-digit phone (optionally 11 digits with a leading 1), allowing the
/// usual separators across up to three adjacent words.
fn find_phone(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    for start in 0..words.len() {
        for end in start..(start + 3).min(words.len()) {
            let joined = words[start..=end].join("");
            let cleaned: String =
                joined.chars().filter(|ch| !matches!(ch, '(' | ')' | '-' | '.' | '+')).collect();
            if !cleaned.chars().all(|ch| ch.is_ascii_digit()) || cleaned.is_empty() {
                continue;
            }
            if cleaned.len() == 10 {
                return Some(cleaned);
            }
            if cleaned.len() == 11 && cleaned.starts_with('1') {
                return Some(cleaned);
            }
        }
    }
    None
}

fn find_email(text: &str) -> Option<String> {
    for word in text.split_whitespace() {
        let candidate = word.trim_matches(|ch: char| !ch.is_ascii_alphanumeric() && ch != '@');
        let Some(at) = candidate.find('@') else {
            continue;
        };
        let (local, domain) = candidate.split_at(at);
        let domain = &domain[1..];
        if !local.is_empty() && domain.contains('.') && !domain.ends_with('.') {
            return Some(candidate.to_string());
        }
    }
    None
}

/// A number immediately followed by a square-footage unit word.
fn find_square_footage(text: &str) -> Option<String> {
    let words: Vec<String> = text.split_whitespace().map(normalize_word).collect();
    for window in words.windows(2) {
        let [value, unit] = window else {
            continue;
        };
        if !SQUARE_FOOTAGE_UNITS.contains(&unit.as_str()) {
            continue;
        }
        let digits: String = value.chars().filter(|ch| ch.is_ascii_digit()).collect();
        if !digits.is_empty() && digits.len() == value.replace(',', "").len() {
            return Some(digits);
        }
    }
    // "1200sqft" written as one word
    for word in &words {
        for unit in SQUARE_FOOTAGE_UNITS {
            if let Some(prefix) = word.strip_suffix(unit) {
                let digits: String = prefix.chars().filter(|ch| ch.is_ascii_digit()).collect();
                if !digits.is_empty() && digits.len() == prefix.replace(',', "").len() {
                    return Some(digits);
                }
            }
        }
    }
    None
}

fn normalize_word(word: &str) -> String {
    word.trim_matches(|ch: char| !ch.is_ascii_alphanumeric()).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use homequote_core::domain::catalog::Requirement;

    use super::extract;

    #[test]
    fn expected_slot_captures_the_whole_answer() {
        let requirement = Requirement::required_text("issue_type", "What's the issue?");
        let extracted = extract("the furnace rattles when it starts", Some(&requirement));
        assert_eq!(
            extracted.get("issue_type").map(String::as_str),
            Some("the furnace rattles when it starts")
        );
    }

    #[test]
    fn select_slots_match_options_case_insensitively() {
        let requirement = Requirement::required_select(
            "system_type",
            "What type of system?",
            &["Central Air", "Heat Pump", "Window Unit"],
        );
        let extracted = extract("we have a HEAT PUMP upstairs", Some(&requirement));
        assert_eq!(extracted.get("system_type").map(String::as_str), Some("Heat Pump"));
    }

    #[test]
    fn select_slots_fall_back_to_raw_text() {
        let requirement =
            Requirement::required_select("system_type", "What type?", &["Central Air"]);
        let extracted = extract("geothermal", Some(&requirement));
        assert_eq!(extracted.get("system_type").map(String::as_str), Some("geothermal"));
    }

    #[test]
    fn addresses_are_harvested_from_any_answer() {
        let extracted = extract("it's at 123 Main St, hurry please", None);
        assert_eq!(extracted.get("address").map(String::as_str), Some("123 Main St"));
    }

    #[test]
    fn phones_accept_common_separator_styles() {
        for text in ["(312) 555-0198", "312-555-0198", "call me at 3125550198"] {
            let extracted = extract(text, None);
            assert_eq!(extracted.get("phone").map(String::as_str), Some("3125550198"), "{text}");
        }
    }

    #[test]
    fn emails_are_harvested() {
        let extracted = extract("reach me at jane.doe@example.com thanks", None);
        assert_eq!(extracted.get("email").map(String::as_str), Some("jane.doe@example.com"));
    }

    #[test]
    fn square_footage_is_harvested_with_units() {
        for text in ["about 1,200 sq ft", "1200 sqft total", "it's 1200sqft"] {
            let extracted = extract(text, None);
            assert_eq!(
                extracted.get("square_footage").map(String::as_str),
                Some("1200"),
                "{text}"
            );
        }
    }

    #[test]
    fn expected_slot_wins_a_key_collision_with_common_fields() {
        let requirement = Requirement::required_text("address", "What's the property address?");
        let extracted = extract("123 Main St apartment 4", Some(&requirement));
        // Whole answer, not just the harvested street fragment.
        assert_eq!(
            extracted.get("address").map(String::as_str),
            Some("123 Main St apartment 4")
        );
    }

    #[test]
    fn unrelated_answers_can_still_carry_common_fields() {
        let requirement = Requirement::required_text("issue_type", "What's the issue?");
        let extracted =
            extract("no cooling, and by the way my email is bob@home.net", Some(&requirement));
        assert_eq!(extracted.get("email").map(String::as_str), Some("bob@home.net"));
        assert!(extracted.contains_key("issue_type"));
    }

    #[test]
    fn empty_text_extracts_nothing() {
        assert!(extract("   ", None).is_empty());
    }
}
