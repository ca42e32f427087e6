//! Result extraction from rendered Yandex pages
//!
//! All parsing is pure: it takes an HTML snapshot produced by the browser
//! session and transcribes the visible fields. Missing fields become empty
//! strings; a malformed card never aborts the run.
//!
//! Two page families are supported:
//! - Maps result snippets and organization cards (slow mode)
//! - Search result organization cards, the "OrgCard" carousel (fast mode)

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::organization::Organization;

static RATING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[\.,]\d+").unwrap());
static COUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+?7|8)\D*\d(?:\D*\d){9}").unwrap());
static RATING_A11Y_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Рейтинг\s*([0-9]+(?:[.,][0-9]+)?)").unwrap());
static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

/// CSS selector for one maps result snippet.
pub const SNIPPET_SELECTOR: &str = ".search-business-snippet-view";

/// A maps result snippet before the organization card has been opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snippet {
    pub name: String,
    pub address: String,
    pub category: String,
    /// Relative card link, used as the dedup key.
    pub card_link: String,
    pub card_url: String,
    pub rating: String,
    pub rating_count: String,
    pub award: String,
    pub verified: String,
}

/// Fields only visible on the opened organization card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardDetails {
    pub phone: String,
    pub website: String,
    pub vk: String,
    pub telegram: String,
    pub whatsapp: String,
}

pub fn sanitize_text(value: &str) -> String {
    value.trim().to_string()
}

/// Normalize a rating like "4,7" to "4.7"; empty when no rating is present.
pub fn normalize_rating(text: &str) -> String {
    match RATING_RE.find(text) {
        Some(m) => m.as_str().replace(',', "."),
        None => String::new(),
    }
}

/// First run of digits in the text, e.g. a review count out of "132 отзыва".
pub fn extract_count(text: &str) -> String {
    COUNT_RE
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Extract Russian phone numbers from free text, normalized to `+7XXXXXXXXXX`.
pub fn extract_phones(text: &str) -> Vec<String> {
    let mut phones = Vec::new();
    for m in PHONE_RE.find_iter(text) {
        let mut digits = NON_DIGIT_RE.replace_all(m.as_str(), "").to_string();
        if digits.len() == 11 && digits.starts_with('8') {
            digits = format!("7{}", &digits[1..]);
        } else if digits.len() == 10 {
            digits = format!("7{}", digits);
        }
        if digits.len() != 11 {
            continue;
        }
        let formatted = format!("+{}", digits);
        if !phones.contains(&formatted) {
            phones.push(formatted);
        }
    }
    phones
}

/// Prefix relative yandex links with the host; leave absolute links alone.
pub fn normalize_href(href: &str) -> String {
    let href = href.replace("&amp;", "&");
    if href.starts_with('/') {
        format!("https://yandex.ru{}", href)
    } else {
        href
    }
}

/// Reduce a yandex profile link to its canonical `/profile/{oid}` form,
/// dropping query strings and trailing path segments.
pub fn strip_profile_link(href: &str) -> String {
    let href = normalize_href(href);
    if href.is_empty() {
        return href;
    }
    match url::Url::parse(&href) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            if host.contains("yandex.ru") && parsed.path().starts_with("/profile/") {
                let parts: Vec<&str> = parsed.path().split('/').collect();
                if parts.len() >= 3 && !parts[2].is_empty() {
                    return format!("https://{}/{}/{}", host, parts[1], parts[2]);
                }
            }
            href
        }
        Err(_) => href,
    }
}

/// Organization id from a card or profile href, used as a dedup key.
/// Handles `/profile/{oid}` and `/web-maps/org/{slug}/{oid}` shapes.
pub fn extract_org_id(href: &str) -> String {
    let href = normalize_href(href);
    let parsed = match url::Url::parse(&href) {
        Ok(p) => p,
        Err(_) => return String::new(),
    };
    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    match segments.as_slice() {
        ["profile", oid, ..] => oid.to_string(),
        ["web-maps", "org", .., oid] if oid.chars().all(|c| c.is_ascii_digit()) => {
            oid.to_string()
        }
        _ => String::new(),
    }
}

/// Markers of a Yandex captcha interstitial: the robot-check form replaces
/// the results page entirely, so any of these means no results will render.
pub fn is_captcha(html: &str) -> bool {
    let document = Html::parse_document(html);
    for selector in ["input[name='rep']", "form[action*='captcha']", ".CheckboxCaptcha"] {
        if let Ok(sel) = Selector::parse(selector) {
            if document.select(&sel).next().is_some() {
                return true;
            }
        }
    }
    html.contains("showcaptcha")
}

fn select_text(root: ElementRef<'_>, selector: &str) -> String {
    let sel = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    root.select(&sel)
        .next()
        .map(|el| sanitize_text(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn select_attr(root: ElementRef<'_>, selector: &str, attr: &str) -> String {
    let sel = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    root.select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(sanitize_text)
        .unwrap_or_default()
}

/// Parse all result snippets visible in a maps results snapshot, in display
/// order. Snippets without a card link are kept (they are skipped later by
/// the dedup logic, which has nothing to key on).
pub fn parse_result_snippets(html: &str) -> Vec<Snippet> {
    let document = Html::parse_document(html);
    let snippet_sel = match Selector::parse(SNIPPET_SELECTOR) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut snippets = Vec::new();
    for item in document.select(&snippet_sel) {
        snippets.push(parse_snippet(item));
    }
    debug!("Parsed {} result snippets", snippets.len());
    snippets
}

fn parse_snippet(item: ElementRef<'_>) -> Snippet {
    let card_link = select_attr(item, "a.link-overlay[href^='/web-maps/org/']", "href");
    let card_url = if card_link.is_empty() {
        String::new()
    } else {
        format!("https://yandex.ru{}", card_link)
    };

    let rating_text = select_text(item, ".business-rating-badge-view__rating-text");
    let mut count_text = select_text(item, ".business-rating-with-text-view__count");
    if count_text.is_empty() {
        count_text = select_text(item, ".business-rating-with-text-view .a11y-hidden");
    }

    Snippet {
        name: select_text(item, ".search-business-snippet-view__title"),
        address: select_text(item, ".search-business-snippet-view__address"),
        category: select_text(item, ".search-business-snippet-view__category"),
        card_link,
        card_url,
        rating: normalize_rating(&rating_text),
        rating_count: extract_count(&count_text),
        award: select_text(item, ".business-header-awards-view__award-text"),
        verified: parse_verified_badge(item),
    }
}

fn parse_verified_badge(item: ElementRef<'_>) -> String {
    let sel = match Selector::parse(".business-verified-badge") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    match item.select(&sel).next() {
        Some(badge) => {
            let class = badge.value().attr("class").unwrap_or("");
            if class.contains("_prioritized") {
                "зеленая".to_string()
            } else {
                "синяя".to_string()
            }
        }
        None => String::new(),
    }
}

/// Parse phone, website and social links from an opened organization card.
/// The card root is searched among the known container candidates; when none
/// is present the whole document is used.
pub fn parse_card_details(html: &str) -> CardDetails {
    let document = Html::parse_document(html);
    let root = find_card_root(&document).unwrap_or_else(|| document.root_element());

    let mut details = CardDetails {
        phone: select_text(root, "span[itemprop='telephone']"),
        website: select_attr(root, "a.business-urls-view__link[itemprop='url']", "href"),
        ..Default::default()
    };

    let links_sel = match Selector::parse("a[itemprop='sameAs']") {
        Ok(s) => s,
        Err(_) => return details,
    };
    for link in root.select(&links_sel) {
        let href = sanitize_text(link.value().attr("href").unwrap_or(""));
        let aria = link.value().attr("aria-label").unwrap_or("").to_lowercase();
        let lower_href = href.to_lowercase();

        if details.vk.is_empty() && (lower_href.contains("vk.com") || aria.contains("vkontakte"))
        {
            details.vk = href.clone();
        }
        if details.telegram.is_empty()
            && (lower_href.contains("t.me") || aria.contains("telegram"))
        {
            details.telegram = href.clone();
        }
        if details.whatsapp.is_empty()
            && (lower_href.contains("wa.me") || aria.contains("whatsapp"))
        {
            details.whatsapp = href.clone();
        }
    }
    details
}

/// Known containers for an opened organization card, newest layout first.
pub const CARD_ROOT_SELECTORS: [&str; 3] = [
    ".search-business-card-view",
    ".business-card-view",
    ".sidebar-content-view",
];

fn find_card_root(document: &Html) -> Option<ElementRef<'_>> {
    for selector in CARD_ROOT_SELECTORS {
        if let Ok(sel) = Selector::parse(selector) {
            if let Some(el) = document.select(&sel).next() {
                return Some(el);
            }
        }
    }
    None
}

/// Merge a snippet and its opened-card details into one Organization record.
pub fn merge_into_organization(snippet: &Snippet, details: &CardDetails) -> Organization {
    Organization {
        name: snippet.name.clone(),
        address: snippet.address.clone(),
        category: snippet.category.clone(),
        phone: details.phone.clone(),
        verified: snippet.verified.clone(),
        award: snippet.award.clone(),
        vk: details.vk.clone(),
        telegram: details.telegram.clone(),
        whatsapp: details.whatsapp.clone(),
        website: details.website.clone(),
        card_url: snippet.card_url.clone(),
        rating: snippet.rating.clone(),
        rating_count: snippet.rating_count.clone(),
    }
}

const SERP_CARD_SELECTORS: [&str; 3] = [".OrgCard", ".OrganicCard", ".Organic-Card"];

/// Parse the organization cards of a search results (SERP) snapshot.
/// The first selector family that yields matches wins; mixing families would
/// double-count the same cards.
pub fn parse_serp_cards(html: &str) -> Vec<Organization> {
    let document = Html::parse_document(html);

    for selector in SERP_CARD_SELECTORS {
        let sel = match Selector::parse(selector) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let cards: Vec<ElementRef<'_>> = document.select(&sel).collect();
        if cards.is_empty() {
            continue;
        }
        debug!("SERP: {} cards via selector {}", cards.len(), selector);
        return cards.into_iter().map(parse_serp_card).collect();
    }
    Vec::new()
}

fn parse_serp_card(card: ElementRef<'_>) -> Organization {
    let name = select_text(card, "a.OrgCard-Title .OrgCard-TitleText");
    let href = select_attr(card, "a.OrgCard-Title", "href");
    let card_url = if href.is_empty() {
        String::new()
    } else {
        strip_profile_link(&href)
    };

    let mut rating = normalize_rating(&select_text(card, ".LabelRating .Label-Content"));
    if rating.is_empty() {
        let a11y = select_text(card, ".LabelRating .A11yHidden");
        if let Some(caps) = RATING_A11Y_RE.captures(&a11y) {
            rating = caps[1].replace(',', ".");
        }
    }

    let reviews = extract_count(&select_text(card, "a.OrgCard-ReviewsLink"));
    let verified = if serp_card_is_verified(card) {
        "синяя".to_string()
    } else {
        String::new()
    };

    // Phones on SERP cards are plain button/label text; recover them by regex
    // over the whole card.
    let card_text = card.text().collect::<String>();
    let phone = extract_phones(&card_text).into_iter().next().unwrap_or_default();

    let website = serp_card_website(card);

    Organization {
        name,
        phone,
        verified,
        website,
        card_url,
        rating,
        rating_count: reviews,
        ..Default::default()
    }
}

fn serp_card_is_verified(card: ElementRef<'_>) -> bool {
    for selector in [".OrgCard-TitleVerified", ".Icon_type_verified"] {
        if let Ok(sel) = Selector::parse(selector) {
            if card.select(&sel).next().is_some() {
                return true;
            }
        }
    }
    // a11y marker text fallback
    if let Ok(sel) = Selector::parse(".A11yHidden") {
        for el in card.select(&sel) {
            if el
                .text()
                .collect::<String>()
                .contains("подтверждена владельцем")
            {
                return true;
            }
        }
    }
    false
}

fn serp_card_website(card: ElementRef<'_>) -> String {
    let sel = match Selector::parse(".OrgsListActions a.Button_link[href]") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    for link in card.select(&sel) {
        let href = sanitize_text(link.value().attr("href").unwrap_or(""));
        if href.starts_with("http") && !href.contains("yandex.ru") {
            return href;
        }
    }
    String::new()
}
