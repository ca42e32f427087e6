use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "orgharvest")]
#[command(about = "Scrapes organization listings from Yandex Maps into a spreadsheet")]
#[command(version)]
pub struct Args {
    /// Search query like "ниша в город"; prompts interactively when omitted
    #[arg(short, long)]
    pub query: Option<String>,

    /// Limit number of organizations (must be a positive integer)
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Run browser in headless mode (true/false)
    #[arg(long, default_value = "false")]
    pub headless: String,

    /// Parser mode: slow (maps cards with details) or fast (search results)
    #[arg(short, long, default_value = "slow")]
    pub mode: String,

    /// Output spreadsheet path
    #[arg(short, long, default_value = "result.xlsx")]
    pub out: String,

    /// Optional log file path; progress and errors are appended there
    #[arg(long)]
    pub log: Option<String>,

    /// Block image resources for faster scraping (true/false)
    #[arg(long)]
    pub block_images: Option<String>,

    /// Block media resources for faster scraping (true/false)
    #[arg(long)]
    pub block_media: Option<String>,

    /// Create default configuration file at ./config/orgharvest.toml
    #[arg(long)]
    pub init: bool,

    /// Verbose logging (use -v for detailed, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Parse a strict boolean flag value. Only the literal tokens "true" and
/// "false" are accepted; anything else is a validation error.
pub fn parse_strict_bool(flag: &str, value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!(
            "Invalid value '{}' for {}: expected 'true' or 'false'",
            other, flag
        )),
    }
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        parse_strict_bool("--headless", &self.headless)?;

        if let Some(ref v) = self.block_images {
            parse_strict_bool("--block-images", v)?;
        }
        if let Some(ref v) = self.block_media {
            parse_strict_bool("--block-media", v)?;
        }

        if let Some(limit) = self.limit {
            if limit == 0 {
                return Err("Limit must be greater than 0".to_string());
            }
        }

        if !["slow", "fast"].contains(&self.mode.as_str()) {
            return Err("Mode must be 'slow' or 'fast'".to_string());
        }

        if !self.init && self.out.trim().is_empty() {
            return Err("Output path cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn headless(&self) -> bool {
        // validate() has already checked the token
        self.headless == "true"
    }

    pub fn block_images_override(&self) -> Option<bool> {
        self.block_images.as_deref().map(|v| v == "true")
    }

    pub fn block_media_override(&self) -> Option<bool> {
        self.block_media.as_deref().map(|v| v == "true")
    }
}
