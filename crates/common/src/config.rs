use chrono_tz::Tz;
use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,

    /// Notion integration token
    pub notion_token: String,

    /// Notion database id holding lead records
    pub notion_db: String,

    /// Z-API instance id for WhatsApp delivery
    pub zapi_instance: String,

    /// Z-API instance token
    pub zapi_token: String,

    /// Administrative WhatsApp distribution list
    pub admin_phones: Vec<String>,

    /// Local timezone all meeting times are rendered and scheduled in
    pub timezone: Tz,

    /// Domestic country-code prefix for phone normalization (default: 55)
    pub country_code: String,

    /// Optional meeting link embedded in the confirmation message
    pub meeting_link: Option<String>,

    /// HTTP listen port (default: 3000)
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let timezone: Tz = std::env::var("TZ")
            .unwrap_or_else(|_| "America/Sao_Paulo".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("TZ must be a valid IANA timezone name"))?;

        Ok(Self {
            webhook_secret: std::env::var("CAL_SECRET")
                .map_err(|_| anyhow::anyhow!("CAL_SECRET environment variable is required"))?,
            notion_token: std::env::var("NOTION_TOKEN")
                .map_err(|_| anyhow::anyhow!("NOTION_TOKEN environment variable is required"))?,
            notion_db: std::env::var("NOTION_DB")
                .map_err(|_| anyhow::anyhow!("NOTION_DB environment variable is required"))?,
            zapi_instance: std::env::var("ZAPI_INSTANCE")
                .map_err(|_| anyhow::anyhow!("ZAPI_INSTANCE environment variable is required"))?,
            zapi_token: std::env::var("ZAPI_TOKEN")
                .map_err(|_| anyhow::anyhow!("ZAPI_TOKEN environment variable is required"))?,
            admin_phones: Self::parse_phone_list(
                &std::env::var("ADMIN_PHONES").unwrap_or_default(),
            ),
            timezone,
            country_code: std::env::var("COUNTRY_CODE").unwrap_or_else(|_| "55".to_string()),
            meeting_link: std::env::var("MEETING_LINK").ok(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid u16"))?,
        })
    }

    /// Split a comma-separated phone list, dropping empty entries.
    pub fn parse_phone_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}
