//! Potential-lead filtering.
//!
//! Every scraped organization lands in the full result sheet; the ones that
//! pass these filters are additionally written to the "Potential" sheet.

use crate::config::FiltersConfig;
use crate::organization::Organization;

/// Name keywords marking state-run or noncommercial organizations.
const NONCOMMERCIAL_KEYWORDS: [&str; 20] = [
    "школа",
    "детский сад",
    "садик",
    "университет",
    "колледж",
    "техникум",
    "больница",
    "поликлиника",
    "мфц",
    "администрация",
    "муницип",
    "гос",
    "государ",
    "библиотека",
    "музей",
    "загс",
    "налоговая",
    "паспортный",
    "соц",
    "центр занятости",
];

fn parse_word_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|part| part.trim().to_lowercase())
        .filter(|part| !part.is_empty())
        .collect()
}

pub fn is_noncommercial(org: &Organization) -> bool {
    let name = org.name.to_lowercase();
    if name.is_empty() {
        return false;
    }
    NONCOMMERCIAL_KEYWORDS.iter().any(|kw| name.contains(kw))
}

fn parse_rating(org: &Organization) -> Option<f32> {
    let raw = org.rating.trim().replace(',', ".");
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f32>().ok()
}

/// Whether the organization qualifies as a potential lead under the
/// configured filters. Filters with empty/zero configuration do not apply.
pub fn passes_potential_filters(org: &Organization, filters: &FiltersConfig) -> bool {
    let name = org.name.to_lowercase();

    let white_words = parse_word_list(&filters.white_words);
    if !white_words.is_empty() && !white_words.iter().any(|word| name.contains(word)) {
        return false;
    }

    let stop_words = parse_word_list(&filters.stop_words);
    if stop_words.iter().any(|word| name.contains(word)) {
        return false;
    }

    if filters.require_phone && org.phone.trim().is_empty() {
        return false;
    }

    if filters.require_badge {
        let badge = org.verified.to_lowercase();
        if !["синяя", "зелёная", "зеленая"].contains(&badge.as_str()) {
            return false;
        }
    }

    if filters.exclude_good_place && !org.award.trim().is_empty() {
        return false;
    }

    if filters.max_rating > 0.0 {
        if let Some(rating) = parse_rating(org) {
            if rating > filters.max_rating {
                return false;
            }
        }
    }

    if filters.exclude_noncommercial && is_noncommercial(org) {
        return false;
    }

    true
}
