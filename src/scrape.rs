//! Slow mode: Yandex Maps result list with card visits.
//!
//! The loop alternates between snapshotting the result list and opening the
//! organization card of every snippet it has not seen yet. Cards carry the
//! phone, website and social links that the list snippets lack. Scrolling
//! continues until the configured number of consecutive rounds yields no new
//! snippets, or the limit is reached.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;

use crate::browser::{human_delay, SearchSession};
use crate::config::{AppConfig, DelaysConfig};
use crate::extract::{
    is_captcha, merge_into_organization, parse_card_details, parse_result_snippets, CardDetails,
    Snippet, CARD_ROOT_SELECTORS, SNIPPET_SELECTOR,
};
use crate::logger::ScrapeLogger;
use crate::organization::Organization;

/// Maps search URL for a query, e.g. `https://yandex.ru/web-maps/?text=...`.
pub fn build_maps_url(maps_url: &str, query: &str) -> Result<String> {
    let mut url = url::Url::parse(maps_url)
        .with_context(|| format!("Invalid maps URL: {}", maps_url))?;
    url.query_pairs_mut().append_pair("text", query);
    Ok(url.to_string())
}

/// Run the maps scrape. Returns the extracted organizations in the order
/// they first appeared in the result list.
pub fn run_slow_scrape<S: SearchSession>(
    session: &mut S,
    config: &AppConfig,
    query: &str,
    limit: Option<u64>,
    logger: &ScrapeLogger,
) -> Result<Vec<Organization>> {
    let results_url = build_maps_url(&config.search.maps_url, query)?;
    let results_timeout = Duration::from_secs(config.browser.results_timeout_secs);
    let card_wait = CARD_ROOT_SELECTORS.join(", ");
    let cap = limit.map(|n| n as usize);

    session.navigate(&results_url)?;
    session.dismiss_popups();

    if let Err(e) = session.wait_for_selector(SNIPPET_SELECTOR, results_timeout) {
        if is_captcha(&session.content().unwrap_or_default()) {
            logger.error("Captcha check blocked the results page");
            bail!("Captcha check blocked the results page for '{}'", query);
        }
        logger.warn(&format!("No results appeared for '{}': {}", query, e));
        return Ok(Vec::new());
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut organizations: Vec<Organization> = Vec::new();
    let mut stale_rounds: u32 = 0;
    let mut scroll_depth: u32 = 0;

    loop {
        let html = session.content()?;
        let snippets = parse_result_snippets(&html);
        logger.record_cards_seen(snippets.len());

        let fresh: Vec<Snippet> = snippets
            .into_iter()
            .filter(|s| !s.card_link.is_empty() && !seen.contains(&s.card_link))
            .collect();

        if fresh.is_empty() {
            stale_rounds += 1;
            logger.debug(&format!(
                "No new snippets this round ({}/{} stale)",
                stale_rounds, config.search.stale_scroll_rounds
            ));
        } else {
            stale_rounds = 0;
        }

        let mut visited_card = false;
        for snippet in fresh {
            if let Some(cap) = cap {
                if organizations.len() >= cap {
                    break;
                }
            }
            seen.insert(snippet.card_link.clone());

            logger.update_progress(&snippet.name);
            let details = open_card(
                session,
                &snippet,
                &card_wait,
                results_timeout,
                &config.delays,
                logger,
            );
            organizations.push(merge_into_organization(&snippet, &details));
            logger.record_organization();
            visited_card = true;

            human_delay(config.delays.action_min_ms, config.delays.action_max_ms);
        }

        if let Some(cap) = cap {
            if organizations.len() >= cap {
                break;
            }
        }
        if stale_rounds >= config.search.stale_scroll_rounds {
            break;
        }

        // Card visits replaced the results page; go back and restore the
        // scroll depth before loading the next batch.
        if visited_card {
            session.navigate(&results_url)?;
            session.dismiss_popups();
            if let Err(e) = session.wait_for_selector(SNIPPET_SELECTOR, results_timeout) {
                logger.warn(&format!("Result list did not reload: {}", e));
                break;
            }
            for _ in 0..scroll_depth {
                session.scroll_results()?;
            }
        }

        session.scroll_results()?;
        scroll_depth += 1;
        logger.record_scroll_round();
    }

    Ok(organizations)
}

/// Open an organization card and parse its contact details. Two snapshot
/// attempts, the card content sometimes renders after the container appears.
/// Failures degrade to empty details, the snippet fields are still kept.
fn open_card<S: SearchSession>(
    session: &mut S,
    snippet: &Snippet,
    card_wait: &str,
    timeout: Duration,
    delays: &DelaysConfig,
    logger: &ScrapeLogger,
) -> CardDetails {
    if snippet.card_url.is_empty() {
        return CardDetails::default();
    }
    if let Err(e) = session.navigate(&snippet.card_url) {
        logger.warn(&format!("Failed to open card for '{}': {}", snippet.name, e));
        return CardDetails::default();
    }
    if let Err(e) = session.wait_for_selector(card_wait, timeout) {
        warn!("Card container missing for '{}': {}", snippet.name, e);
        return CardDetails::default();
    }

    for attempt in 0..2 {
        match session.content() {
            Ok(html) => {
                let details = parse_card_details(&html);
                if !details.phone.is_empty() || attempt == 1 {
                    return details;
                }
                human_delay(delays.action_min_ms, delays.action_max_ms);
            }
            Err(e) => {
                logger.warn(&format!("Card snapshot failed for '{}': {}", snippet.name, e));
                return CardDetails::default();
            }
        }
    }
    CardDetails::default()
}
