//! Fixed keyword tables shared by intent extraction and product matching.
//!
//! Lookups are first-match over substrings of lower-cased text, so table order decides
//! ties. Brand keys of two letters or fewer (`ef`, `ka`) only match as whole words.
//!
//! The intent parser uses its own narrower tables ([`INTENT_BRANDS`], [`INTENT_KEYWORDS`]);
//! the matcher's tables cover every category the catalog is scraped into.

/// `(lower-case key, display name)` in lookup order.
pub const BRANDS: &[(&str, &str)] = &[
    ("acorn", "Acorn"),
    ("spin", "Spin"),
    ("fanco", "Fanco"),
    ("crestar", "Crestar"),
    ("alaska", "Alaska"),
    ("tecno", "Tecno"),
    ("pozzi", "Pozzi"),
    ("worx", "WORX"),
    ("makita", "Makita"),
    ("ef", "EF"),
    ("ka", "KA"),
];

/// `(category, keywords)` in lookup order.
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("Ceiling Fans", &["ceiling fan", "fan", "dc fan", "wifi fan"]),
    ("Range Hoods", &["hood", "chimney", "range hood", "kitchen hood"]),
    ("Hobs & Stoves", &["hob", "stove", "cooktop", "gas hob", "induction"]),
    ("Kitchen Taps", &["kitchen tap", "sink tap", "faucet"]),
    ("Basin Taps", &["basin tap", "bathroom tap", "basin mixer"]),
    ("Power Tools", &["drill", "power tool", "grinder", "saw", "washer", "blower"]),
    ("Kitchen Sinks", &["sink", "kitchen sink"]),
    ("Bathroom Fixtures", &["bathroom", "shower", "toilet"]),
    ("Water Heaters", &["water heater", "heater"]),
];

/// Brands the intent parser recognises, in lookup order.
pub const INTENT_BRANDS: &[(&str, &str)] = &[
    ("acorn", "Acorn"),
    ("spin", "Spin"),
    ("fanco", "Fanco"),
    ("crestar", "Crestar"),
    ("tecno", "Tecno"),
    ("ef", "EF"),
    ("pozzi", "Pozzi"),
    ("worx", "WORX"),
    ("makita", "Makita"),
    ("alaska", "Alaska"),
];

/// `(keyword, category)` pairs the intent parser recognises, in lookup order.
pub const INTENT_KEYWORDS: &[(&str, &str)] = &[
    ("ceiling fan", "Ceiling Fans"),
    ("fan", "Ceiling Fans"),
    ("hood", "Range Hoods"),
    ("chimney", "Range Hoods"),
    ("hob", "Hobs & Stoves"),
    ("stove", "Hobs & Stoves"),
    ("tap", "Kitchen Taps"),
    ("sink", "Kitchen Sinks"),
    ("drill", "Power Tools"),
    ("power tool", "Power Tools"),
];

const WHOLE_WORD_KEY_LEN: usize = 2;

/// Delivery localities recognised in free text.
pub const LOCALITIES: &[&str] =
    &["hougang", "kovan", "macpherson", "bedok", "tampines", "jurong", "woodlands", "yishun"];

/// First brand whose key occurs in `text`, as its display name.
pub fn detect_brand(text: &str) -> Option<&'static str> {
    find_brand(BRANDS, text)
}

/// [`detect_brand`] over the intent parser's brand table.
pub fn detect_intent_brand(text: &str) -> Option<&'static str> {
    find_brand(INTENT_BRANDS, text)
}

/// Category of the first intent keyword occurring in `text`.
pub fn detect_intent_category(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    INTENT_KEYWORDS.iter().find(|(keyword, _)| lowered.contains(keyword)).map(|(_, category)| *category)
}

fn find_brand(table: &'static [(&'static str, &'static str)], text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    table.iter().find(|(key, _)| contains_key(&lowered, key)).map(|(_, display)| *display)
}

fn contains_key(lowered: &str, key: &str) -> bool {
    if key.len() > WHOLE_WORD_KEY_LEN {
        return lowered.contains(key);
    }
    lowered.split(|character: char| !character.is_alphanumeric()).any(|word| word == key)
}

/// First category with any keyword occurring in `text`.
pub fn detect_category(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(category, _)| *category)
}

/// Keyword list for a category name, compared case-insensitively. Unknown categories
/// have no keywords.
pub fn category_keywords(category: &str) -> &'static [&'static str] {
    CATEGORIES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category.trim()))
        .map(|(_, keywords)| *keywords)
        .unwrap_or(&[])
}

/// First known locality in `text`, title-cased.
pub fn detect_locality(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    LOCALITIES.iter().find(|area| lowered.contains(**area)).map(|area| title_case(area))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        category_keywords, detect_brand, detect_category, detect_intent_brand, detect_intent_category,
        detect_locality,
    };

    #[test]
    fn brand_detection_is_case_insensitive_first_match() {
        assert_eq!(detect_brand("Need ACORN and Fanco fans"), Some("Acorn"));
        assert_eq!(detect_brand("makita drill x3"), Some("Makita"));
        assert_eq!(detect_brand("nothing branded"), None);
    }

    #[test]
    fn short_brand_keys_need_a_whole_word() {
        assert_eq!(detect_brand("okay, need 5 kitchen sinks"), None);
        assert_eq!(detect_brand("a chef's hood"), None);
        assert_eq!(detect_brand("KA 60cm hob"), Some("KA"));
        assert_eq!(detect_intent_brand("EF chimney hood"), Some("EF"));
        assert_eq!(detect_intent_brand("okay ka hob"), None);
    }

    #[test]
    fn intent_keywords_map_plain_tap_to_kitchen_taps() {
        assert_eq!(detect_intent_category("need 5 taps"), Some("Kitchen Taps"));
        assert_eq!(detect_intent_category("basin tap"), Some("Kitchen Taps"));
        assert_eq!(detect_intent_category("a water heater"), None);
        assert_eq!(detect_category("need 5 taps"), None);
    }

    #[test]
    fn category_order_decides_between_overlapping_keywords() {
        assert_eq!(detect_category("kitchen sink tap"), Some("Kitchen Taps"));
        assert_eq!(detect_category("a stainless sink"), Some("Kitchen Sinks"));
        assert_eq!(detect_category("2 ceiling fans"), Some("Ceiling Fans"));
        assert_eq!(detect_category("paint"), None);
    }

    #[test]
    fn unknown_category_has_no_keywords() {
        assert!(category_keywords("Lighting").is_empty());
        assert!(category_keywords("range hoods").contains(&"chimney"));
    }

    #[test]
    fn locality_is_title_cased() {
        assert_eq!(detect_locality("deliver to BEDOK north"), Some("Bedok".to_string()));
        assert_eq!(detect_locality("deliver to orchard"), None);
    }
}
