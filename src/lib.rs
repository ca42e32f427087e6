//! orgharvest scrapes organization listings for a "niche in city" query from
//! Yandex Maps (slow mode, with card details) or Yandex Search organization
//! cards (fast mode) into a spreadsheet.

pub mod browser;
pub mod cli;
pub mod config;
pub mod excel;
pub mod extract;
pub mod filters;
pub mod logger;
pub mod organization;
pub mod query;
pub mod scrape;
pub mod serp;
