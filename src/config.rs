use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub base_url: String,
    /// Device limit advertised to customers and stamped on new licenses.
    pub default_max_devices: i32,
    /// Per-category cap actually enforced on admission. Independent of
    /// `default_max_devices`; do not derive one from the other.
    pub category_device_limit: i32,
    /// Bearer token required on /internal routes. None disables them.
    pub internal_api_token: Option<String>,
    /// Resend API key for outbound email (None = email disabled unless a
    /// webhook URL is set).
    pub resend_api_key: Option<String>,
    pub email_from: String,
    /// Webhook URL for DIY notification delivery instead of Resend.
    pub notify_webhook_url: Option<String>,
    /// Operator address for claim alerts and the daily summary.
    pub operator_email: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("READGATE_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let default_max_devices: i32 = env::var("MAX_DEVICES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let category_device_limit: i32 = env::var("CATEGORY_DEVICE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "readgate.db".to_string()),
            base_url,
            default_max_devices,
            category_device_limit,
            internal_api_token: env::var("INTERNAL_API_TOKEN").ok(),
            resend_api_key: env::var("RESEND_API_KEY").ok(),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@readgate.local".to_string()),
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL").ok(),
            operator_email: env::var("OPERATOR_EMAIL").ok(),
            dev_mode,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
