//! Fast mode: Yandex Search organization cards.
//!
//! A single SERP request with the companies vertical preselected carries
//! dozens of organization cards at once, so no card visits are needed. The
//! records are thinner than slow mode (no address, category or social links)
//! but arrive in a fraction of the time.

use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::time::Duration;

use crate::browser::SearchSession;
use crate::config::AppConfig;
use crate::extract::{extract_org_id, is_captcha, parse_serp_cards};
use crate::logger::ScrapeLogger;
use crate::organization::Organization;

/// Selector marking that organization cards have rendered, either card
/// family counts.
const SERP_READY_SELECTOR: &str = ".OrgCard, .OrganicCard, .Organic-Card";

/// SERP URL for the companies vertical of a query.
pub fn build_serp_url(lr: &str, query: &str) -> Result<String> {
    let mut url = url::Url::parse("https://yandex.ru/search/")
        .context("Invalid SERP base URL")?;
    url.query_pairs_mut()
        .append_pair("lr", lr)
        .append_pair("text", query)
        .append_pair("serp-reload-from", "companies")
        .append_pair("noreask", "1");
    Ok(url.to_string())
}

/// Dedup key for a SERP card: the organization id from the profile link,
/// falling back to name plus review count when no link is present.
fn serp_dedup_key(org: &Organization) -> String {
    let id = extract_org_id(&org.card_url);
    if !id.is_empty() {
        return id;
    }
    format!("{}|{}", org.name, org.rating_count)
}

/// Run the SERP scrape. Scrolling loads more cards until the limit, the
/// configured card ceiling, or a stale-round cutoff is hit.
pub fn run_fast_scrape<S: SearchSession>(
    session: &mut S,
    config: &AppConfig,
    query: &str,
    limit: Option<u64>,
    logger: &ScrapeLogger,
) -> Result<Vec<Organization>> {
    let serp_url = build_serp_url(&config.search.serp_lr, query)?;
    let results_timeout = Duration::from_secs(config.browser.results_timeout_secs);
    let cap = limit.map(|n| n as usize);

    session.navigate(&serp_url)?;
    session.dismiss_popups();

    if let Err(e) = session.wait_for_selector(SERP_READY_SELECTOR, results_timeout) {
        if is_captcha(&session.content().unwrap_or_default()) {
            logger.error("Captcha check blocked the results page");
            bail!("Captcha check blocked the results page for '{}'", query);
        }
        logger.warn(&format!("No organization cards for '{}': {}", query, e));
        return Ok(Vec::new());
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut organizations: Vec<Organization> = Vec::new();
    let mut stale_rounds: u32 = 0;

    loop {
        let html = session.content()?;
        // The robot check can replace the SERP after any scroll
        if is_captcha(&html) {
            logger.error("Captcha check interrupted the run");
            bail!("Captcha check interrupted the run for '{}'", query);
        }
        let cards = parse_serp_cards(&html);
        logger.record_cards_seen(cards.len());

        let mut added = 0usize;
        for org in cards {
            if org.name.is_empty() {
                continue;
            }
            let key = serp_dedup_key(&org);
            if !seen.insert(key) {
                continue;
            }
            logger.update_progress(&org.name);
            organizations.push(org);
            logger.record_organization();
            added += 1;

            if let Some(cap) = cap {
                if organizations.len() >= cap {
                    return Ok(organizations);
                }
            }
            if organizations.len() >= config.search.serp_max_cards {
                logger.warn(&format!(
                    "Card ceiling of {} reached, stopping",
                    config.search.serp_max_cards
                ));
                return Ok(organizations);
            }
        }

        if added == 0 {
            stale_rounds += 1;
            if stale_rounds >= config.search.stale_scroll_rounds {
                break;
            }
        } else {
            stale_rounds = 0;
        }

        session.scroll_results()?;
        logger.record_scroll_round();
    }

    Ok(organizations)
}
