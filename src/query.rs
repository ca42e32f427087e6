//! Query resolution: either `--query` is given verbatim, or the user is
//! prompted once for a niche and a city and the phrase is composed as
//! "{niche} в {city}". Resolution is a pure function over an input source
//! so it can be tested without a terminal.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

/// A resolved search query. Invariant: `compose()` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub niche: String,
    pub city: String,
}

impl Query {
    /// Full search phrase as typed into the maps search box.
    pub fn compose(&self) -> String {
        if self.city.is_empty() {
            self.niche.clone()
        } else {
            format!("{} в {}", self.niche, self.city)
        }
    }

    /// Split a raw phrase back into niche and city on the " в " separator.
    pub fn split(raw: &str) -> Query {
        let cleaned = raw.trim();
        match cleaned.split_once(" в ") {
            Some((niche, city)) => Query {
                niche: niche.trim().to_string(),
                city: city.trim().to_string(),
            },
            None => Query {
                niche: cleaned.to_string(),
                city: String::new(),
            },
        }
    }
}

/// Resolve the query from the optional `--query` flag, falling back to exactly
/// one interactive prompt sequence (niche, then city) on the given reader.
/// Fails with a usage error when the composed query is empty.
pub fn resolve_query<R: BufRead, W: Write>(
    flag: Option<&str>,
    input: &mut R,
    output: &mut W,
) -> Result<Query> {
    if let Some(raw) = flag {
        let query = Query::split(raw);
        if query.compose().trim().is_empty() {
            bail!("Search query cannot be empty");
        }
        return Ok(query);
    }

    write!(output, "Введите нишу: ")?;
    output.flush()?;
    let mut niche = String::new();
    input.read_line(&mut niche)?;

    write!(output, "Введите город: ")?;
    output.flush()?;
    let mut city = String::new();
    input.read_line(&mut city)?;

    let query = Query {
        niche: niche.trim().to_string(),
        city: city.trim().to_string(),
    };
    if query.compose().trim().is_empty() {
        bail!("Search query cannot be empty (no niche or city entered)");
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_flag_query_is_split() {
        let mut input = Cursor::new("");
        let mut out = Vec::new();
        let q = resolve_query(Some("стоматология в Казань"), &mut input, &mut out).unwrap();
        assert_eq!(q.niche, "стоматология");
        assert_eq!(q.city, "Казань");
        assert_eq!(q.compose(), "стоматология в Казань");
        // No prompt was written
        assert!(out.is_empty());
    }

    #[test]
    fn test_flag_query_without_city() {
        let mut input = Cursor::new("");
        let mut out = Vec::new();
        let q = resolve_query(Some("автосервис"), &mut input, &mut out).unwrap();
        assert_eq!(q.niche, "автосервис");
        assert_eq!(q.city, "");
        assert_eq!(q.compose(), "автосервис");
    }

    #[test]
    fn test_prompt_sequence_is_niche_then_city() {
        let mut input = Cursor::new("салон красоты\nМосква\n");
        let mut out = Vec::new();
        let q = resolve_query(None, &mut input, &mut out).unwrap();
        assert_eq!(q.compose(), "салон красоты в Москва");

        let prompts = String::from_utf8(out).unwrap();
        assert_eq!(prompts.matches("Введите нишу").count(), 1);
        assert_eq!(prompts.matches("Введите город").count(), 1);
        // Niche is asked before city
        assert!(prompts.find("нишу").unwrap() < prompts.find("город").unwrap());
    }

    #[test]
    fn test_empty_prompt_input_is_an_error() {
        let mut input = Cursor::new("\n\n");
        let mut out = Vec::new();
        let err = resolve_query(None, &mut input, &mut out).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_empty_flag_is_an_error() {
        let mut input = Cursor::new("");
        let mut out = Vec::new();
        assert!(resolve_query(Some("   "), &mut input, &mut out).is_err());
    }

    #[test]
    fn test_split_roundtrip() {
        let q = Query::split("  кофейня в Санкт-Петербург  ");
        assert_eq!(q.niche, "кофейня");
        assert_eq!(q.city, "Санкт-Петербург");
    }
}
