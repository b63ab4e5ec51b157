//! Location intent in free-text queries.
//!
//! Matching is accent- and case-insensitive, so "Hà Nội", "ha noi" and
//! "HANOI" all resolve to the same city.

use crate::matching::cv::contains_word;

/// Known cities and the spellings that refer to them
const CITIES: &[(&str, &[&str])] = &[
    ("ha noi", &["ha noi", "hanoi", "ha_noi"]),
    ("da nang", &["da nang", "danang"]),
    ("ho chi minh", &["ho chi minh", "hcm", "saigon", "sai gon", "ho_chi_minh"]),
    ("hai phong", &["hai phong", "haiphong"]),
    ("can tho", &["can tho", "cantho"]),
];

const ACCENT_FOLDS: &[(char, &str)] = &[
    ('a', "àáảãạăằắẳẵặâầấẩẫậ"),
    ('e', "èéẻẽẹêềếểễệ"),
    ('i', "ìíỉĩị"),
    ('o', "òóỏõọôồốổỗộơờớởỡợ"),
    ('u', "ùúủũụưừứửữự"),
    ('y', "ỳýỷỹỵ"),
    ('d', "đ"),
];

/// Lowercase and strip Vietnamese diacritics
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            ACCENT_FOLDS
                .iter()
                .find(|(_, accented)| accented.contains(c))
                .map(|(base, _)| *base)
                .unwrap_or(c)
        })
        .collect()
}

/// Canonical city named in `query`, if any. Spellings must stand as whole
/// words, so "can thoroughly" is not Can Tho.
pub fn detect(query: &str) -> Option<&'static str> {
    let folded = fold(query);
    CITIES
        .iter()
        .find(|(_, variants)| variants.iter().any(|v| contains_word(&folded, v)))
        .map(|(canonical, _)| *canonical)
}

/// Whether a record location refers to `city`
pub fn matches(location: Option<&str>, city: &str) -> bool {
    let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) else {
        return false;
    };
    let location = fold(location);
    let city = fold(city);
    if location.contains(&city) || city.contains(&location) {
        return true;
    }
    // "TP. HCM" and "Saigon" name the same city as "ho chi minh"
    CITIES
        .iter()
        .find(|(canonical, _)| *canonical == city)
        .is_some_and(|(_, variants)| variants.iter().any(|v| location.contains(v)))
}
