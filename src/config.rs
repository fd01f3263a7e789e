#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    /// `mailto:` contact embedded in VAPID signatures.
    pub vapid_subject: String,
}

impl Config {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/word_reminder".to_string());

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let vapid_public_key = std::env::var("VAPID_PUBLIC_KEY").unwrap_or_default();
        let vapid_private_key = std::env::var("VAPID_PRIVATE_KEY").unwrap_or_default();

        let contact = std::env::var("WORD_REMINDER_EMAIL")
            .unwrap_or_else(|_| "support@wordreminder.app".to_string());
        let vapid_subject = format!("mailto:{contact}");

        Self {
            database_url,
            log_level,
            vapid_public_key,
            vapid_private_key,
            vapid_subject,
        }
    }
}
