use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Telegram bot token; shared secret for init-data signature checks.
    pub bot_token: String,
    /// Telegram user ids allowed to call admin endpoints.
    pub admin_ids: Vec<i64>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("PORT must be a number"),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:xp.db?mode=rwc".to_string()),
            bot_token: env::var("BOT_TOKEN")
                .unwrap_or_else(|_| "development-bot-token-change-in-production".to_string()),
            admin_ids: parse_id_list(&env::var("ADMIN_IDS").unwrap_or_default()),
            cors_origins: parse_origin_list(
                &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost".to_string()),
            ),
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure config tests run serially (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("HOST");
        env::remove_var("PORT");
        env::remove_var("DATABASE_URL");
        env::remove_var("BOT_TOKEN");
        env::remove_var("ADMIN_IDS");
        env::remove_var("CORS_ORIGINS");
    }

    #[test]
    fn test_config_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, "sqlite:xp.db?mode=rwc");
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.cors_origins, vec!["http://localhost".to_string()]);
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();

        env::set_var("HOST", "0.0.0.0");
        env::set_var("PORT", "3000");
        env::set_var("DATABASE_URL", "sqlite:test.db");
        env::set_var("BOT_TOKEN", "123456:test-token");
        env::set_var("ADMIN_IDS", "111, 222,333");
        env::set_var("CORS_ORIGINS", "https://app.example.com,https://web.telegram.org");

        let config = Config::from_env().unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, "sqlite:test.db");
        assert_eq!(config.bot_token, "123456:test-token");
        assert_eq!(config.admin_ids, vec![111, 222, 333]);
        assert!(config.is_admin(222));
        assert!(!config.is_admin(444));
        assert_eq!(config.cors_origins.len(), 2);

        // Clean up
        clear_env();
    }

    #[test]
    fn test_parse_id_list_skips_garbage() {
        assert_eq!(parse_id_list("1,abc,,2"), vec![1, 2]);
        assert_eq!(parse_id_list(""), Vec::<i64>::new());
    }
}
