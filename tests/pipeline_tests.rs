//! End-to-end pipeline tests: a scripted browser session drives the scrape
//! loops, and the results land in a spreadsheet on disk.

use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

use orgharvest::browser::SearchSession;
use orgharvest::config::{AppConfig, DEFAULT_CONFIG};
use orgharvest::excel::{potential_csv_path, write_results};
use orgharvest::logger::{ScrapeLogger, VerbosityLevel};
use orgharvest::organization::Organization;
use orgharvest::scrape::run_slow_scrape;
use orgharvest::serp::run_fast_scrape;

/// Scripted session. Result pages are indexed by scroll depth; card pages
/// are looked up by URL. Unknown URLs land back on the first result page.
struct ScriptedSession {
    result_pages: Vec<String>,
    card_pages: HashMap<String, String>,
    depth: usize,
    current: String,
}

impl ScriptedSession {
    fn new(result_pages: Vec<String>, card_pages: HashMap<String, String>) -> Self {
        Self {
            result_pages,
            card_pages,
            depth: 0,
            current: String::new(),
        }
    }
}

impl SearchSession for ScriptedSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        if let Some(card) = self.card_pages.get(url) {
            self.current = card.clone();
        } else {
            self.depth = 0;
            self.current = self.result_pages[0].clone();
        }
        Ok(())
    }

    fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
        let found = selector
            .split(',')
            .map(|part| part.trim().trim_start_matches('.'))
            .any(|class| self.current.contains(class));
        if found {
            Ok(())
        } else {
            anyhow::bail!("selector not found: {}", selector)
        }
    }

    fn content(&mut self) -> Result<String> {
        Ok(self.current.clone())
    }

    fn scroll_results(&mut self) -> Result<()> {
        if self.depth + 1 < self.result_pages.len() {
            self.depth += 1;
        }
        self.current = self.result_pages[self.depth].clone();
        Ok(())
    }
}

fn maps_page(entries: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body>");
    for (name, link, badge) in entries {
        html.push_str(&format!(
            r#"<div class="search-business-snippet-view">
                 <a class="link-overlay" href="{}"></a>
                 <div class="search-business-snippet-view__title">{}</div>
                 <div class="search-business-snippet-view__address">ул. Мира, 1</div>
                 {}
               </div>"#,
            link, name, badge
        ));
    }
    html.push_str("</body></html>");
    html
}

fn card_page(phone: &str, website: &str) -> String {
    format!(
        r#"<html><body><div class="business-card-view">
             <span itemprop="telephone">{}</span>
             <a class="business-urls-view__link" itemprop="url" href="{}">сайт</a>
           </div></body></html>"#,
        phone, website
    )
}

fn serp_page(entries: &[(&str, &str)]) -> String {
    let mut html = String::from("<html><body>");
    for (name, profile) in entries {
        html.push_str(&format!(
            r#"<div class="OrgCard">
                 <a class="OrgCard-Title" href="{}">
                   <span class="OrgCard-TitleText">{}</span>
                   <span class="OrgCard-TitleVerified"></span>
                 </a>
                 <button>тел. 8 (999) 000-11-22</button>
               </div>"#,
            profile, name
        ));
    }
    html.push_str("</body></html>");
    html
}

fn test_config() -> AppConfig {
    let mut config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
    config.delays.action_min_ms = 0;
    config.delays.action_max_ms = 0;
    config.delays.scroll_min_ms = 0;
    config.delays.scroll_max_ms = 0;
    config.search.stale_scroll_rounds = 2;
    config
}

fn quiet_logger() -> ScrapeLogger {
    ScrapeLogger::new(VerbosityLevel::Summary)
}

const BLUE_BADGE: &str = r#"<span class="business-verified-badge"></span>"#;

#[test]
fn test_slow_scrape_to_spreadsheet() {
    let page = maps_page(&[
        ("Кафе Ромашка", "/web-maps/org/a/111", BLUE_BADGE),
        ("Бар Василёк", "/web-maps/org/b/222", BLUE_BADGE),
    ]);
    let mut cards = HashMap::new();
    cards.insert(
        "https://yandex.ru/web-maps/org/a/111".to_string(),
        card_page("+7 999 000 11 22", "https://romashka.example"),
    );
    cards.insert(
        "https://yandex.ru/web-maps/org/b/222".to_string(),
        card_page("+7 999 000 33 44", "https://vasilek.example"),
    );

    let config = test_config();
    let mut session = ScriptedSession::new(vec![page], cards);
    let orgs = run_slow_scrape(
        &mut session,
        &config,
        "кафе в Москве",
        None,
        &quiet_logger(),
    )
    .unwrap();

    assert_eq!(orgs.len(), 2);
    assert_eq!(orgs[0].phone, "+7 999 000 11 22");
    assert_eq!(orgs[0].website, "https://romashka.example");
    assert_eq!(orgs[0].address, "ул. Мира, 1");
    assert_eq!(orgs[0].verified, "синяя");

    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("result.csv").to_string_lossy().to_string();
    write_results(&orgs, &out, "csv", "Organizations", &config.filters).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Название"));
    assert!(lines[1].contains("Кафе Ромашка"));
}

#[test]
fn test_limit_holds_in_both_modes() {
    let maps = maps_page(&[
        ("Кафе Ромашка", "/web-maps/org/a/111", BLUE_BADGE),
        ("Бар Василёк", "/web-maps/org/b/222", BLUE_BADGE),
        ("Салон Орхидея", "/web-maps/org/c/333", BLUE_BADGE),
    ]);
    let mut cards = HashMap::new();
    for url in [
        "https://yandex.ru/web-maps/org/a/111",
        "https://yandex.ru/web-maps/org/b/222",
        "https://yandex.ru/web-maps/org/c/333",
    ] {
        cards.insert(url.to_string(), card_page("+7 999 000 11 22", ""));
    }
    let mut session = ScriptedSession::new(vec![maps], cards);
    let slow = run_slow_scrape(
        &mut session,
        &test_config(),
        "кафе в Москве",
        Some(1),
        &quiet_logger(),
    )
    .unwrap();
    assert_eq!(slow.len(), 1);

    let serp = serp_page(&[
        ("Салон Орхидея", "/profile/111"),
        ("Студия Пион", "/profile/222"),
        ("Ателье Ирис", "/profile/333"),
    ]);
    let mut session = ScriptedSession::new(vec![serp], HashMap::new());
    let fast = run_fast_scrape(
        &mut session,
        &test_config(),
        "салон красоты в Казани",
        Some(2),
        &quiet_logger(),
    )
    .unwrap();
    assert_eq!(fast.len(), 2);
}

#[test]
fn test_fast_scrape_extracts_serp_fields() {
    let serp = serp_page(&[("Салон Орхидея", "/profile/111")]);
    let mut session = ScriptedSession::new(vec![serp], HashMap::new());
    let orgs = run_fast_scrape(
        &mut session,
        &test_config(),
        "салон красоты в Казани",
        None,
        &quiet_logger(),
    )
    .unwrap();

    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].name, "Салон Орхидея");
    assert_eq!(orgs[0].card_url, "https://yandex.ru/profile/111");
    assert_eq!(orgs[0].verified, "синяя");
    assert_eq!(orgs[0].phone, "+79990001122");
}

#[test]
fn test_captcha_wall_fails_the_run_in_both_modes() {
    let captcha = r#"<html><body>
        <form action="/checkcaptcha"><input name="rep" type="text"></form>
    </body></html>"#
        .to_string();

    let mut session = ScriptedSession::new(vec![captcha.clone()], HashMap::new());
    let slow = run_slow_scrape(
        &mut session,
        &test_config(),
        "кафе в Москве",
        None,
        &quiet_logger(),
    );
    assert!(slow.is_err());

    let mut session = ScriptedSession::new(vec![captcha], HashMap::new());
    let fast = run_fast_scrape(
        &mut session,
        &test_config(),
        "кафе в Москве",
        None,
        &quiet_logger(),
    );
    assert!(fast.is_err());
}

#[test]
fn test_empty_scrape_writes_header_only_spreadsheet() {
    let mut session = ScriptedSession::new(
        vec!["<html><body><div class='no-results'></div></body></html>".to_string()],
        HashMap::new(),
    );
    let config = test_config();
    let orgs = run_slow_scrape(
        &mut session,
        &config,
        "кафе в Москве",
        None,
        &quiet_logger(),
    )
    .unwrap();
    assert!(orgs.is_empty());

    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("empty.csv").to_string_lossy().to_string();
    write_results(&orgs, &out, "csv", "Organizations", &config.filters).unwrap();

    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_potential_sheet_filters_leads() {
    let with_phone = Organization {
        name: "Кафе Ромашка".to_string(),
        phone: "+79990001122".to_string(),
        verified: "синяя".to_string(),
        ..Default::default()
    };
    let without_badge = Organization {
        name: "Бар Василёк".to_string(),
        phone: "+79990003344".to_string(),
        ..Default::default()
    };

    let mut config = test_config();
    config.filters.require_phone = true;
    config.filters.require_badge = true;

    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("leads.csv").to_string_lossy().to_string();
    write_results(
        &[with_phone, without_badge],
        &out,
        "csv",
        "Organizations",
        &config.filters,
    )
    .unwrap();

    let all = std::fs::read_to_string(&out).unwrap();
    assert!(all.contains("Ромашка"));
    assert!(all.contains("Василёк"));

    let potential = std::fs::read_to_string(potential_csv_path(&out)).unwrap();
    assert!(potential.contains("Ромашка"));
    assert!(!potential.contains("Василёк"));
}

#[test]
fn test_xlsx_workbook_written() {
    let org = Organization {
        name: "Кафе Ромашка".to_string(),
        ..Default::default()
    };
    let config = test_config();
    let tmp = TempDir::new().unwrap();
    let out = tmp.path().join("result.xlsx").to_string_lossy().to_string();
    write_results(&[org], &out, "xlsx", "Organizations", &config.filters).unwrap();

    let bytes = std::fs::read(&out).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}
