use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup
///
/// Every sheet URL is optional: a missing URL makes the corresponding
/// endpoint serve its fallback (the bundled sample for `/api/data`, an empty
/// row set elsewhere) instead of aborting the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub sheet_weekly_csv_url: Option<String>,
    pub sheet_members_csv_url: Option<String>,
    pub sheet_latest_csv_url: Option<String>,
    pub sheet_groups_csv_url: Option<String>,
    pub sheet_deals_csv_url: Option<String>,
    pub sheet_ceo_csv_url: Option<String>,
    pub sheet_tech_csv_url: Option<String>,
    pub sheet_supply_csv_url: Option<String>,

    /// Accepted login credential pairs (up to two, per the env layout)
    pub credentials: Vec<(String, String)>,

    pub ceo_msg_webhook_url: Option<String>,
    pub news_feed_urls: Vec<String>,
    pub news_en_feed_urls: Vec<String>,
    pub rates_url: Option<String>,

    pub media_dir: PathBuf,
    pub status_store_path: PathBuf,
    pub bind_addr: String,
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn feed_list(name: &str) -> Vec<String> {
    var(name)
        .map(|v| {
            v.split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Self {
        let mut credentials = Vec::new();
        if let (Some(user), Some(pass)) = (var("LOGIN_USER"), var("LOGIN_PASS")) {
            credentials.push((user, pass));
        }
        if let (Some(user), Some(pass)) = (var("LOGIN_USER2"), var("LOGIN_PASS2")) {
            credentials.push((user, pass));
        }

        Config {
            sheet_weekly_csv_url: var("SHEET_WEEKLY_CSV_URL"),
            sheet_members_csv_url: var("SHEET_MEMBERS_CSV_URL"),
            sheet_latest_csv_url: var("SHEET_LATEST_CSV_URL"),
            sheet_groups_csv_url: var("SHEET_GROUPS_CSV_URL"),
            sheet_deals_csv_url: var("SHEET_DEALS_CSV_URL"),
            sheet_ceo_csv_url: var("SHEET_CEO_CSV_URL"),
            sheet_tech_csv_url: var("SHEET_TECH_CSV_URL"),
            sheet_supply_csv_url: var("SHEET_SUPPLY_CSV_URL"),
            credentials,
            ceo_msg_webhook_url: var("CEO_MSG_WEBHOOK_URL"),
            news_feed_urls: feed_list("NEWS_FEED_URLS"),
            news_en_feed_urls: feed_list("NEWS_EN_FEED_URLS"),
            rates_url: var("RATES_URL"),
            media_dir: var("MEDIA_DIR").unwrap_or_else(|| "media".to_string()).into(),
            status_store_path: var("STATUS_STORE_PATH")
                .unwrap_or_else(|| "database/status.json".to_string())
                .into(),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
        }
    }
}
