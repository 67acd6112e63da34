pub mod domain;
pub mod error;
pub mod format;
pub mod gateway;
pub mod lifecycle;
pub mod operations;
pub mod pipeline;
pub mod session;
pub mod shaping;
pub mod variant;
pub mod view;

#[cfg(test)]
mod test_support;

pub mod config {
    use std::time::Duration;

    const DEFAULT_API_URL: &str = "http://localhost:8000";
    const DEFAULT_TIMEOUT_SECS: u64 = 120;
    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub api_base_url: String,
        pub request_timeout: Duration,
        pub sentry_dsn: Option<String>,
        pub port: u16,
        /// Idle time after which the api drops a session.
        pub session_ttl: Duration,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self::from_lookup(|key| std::env::var(key).ok()))
        }

        fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let api_base_url = lookup("FINTELLECT_API_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string());

            let timeout_secs = lookup("FINTELLECT_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS);

            let session_ttl_secs = lookup("FINTELLECT_SESSION_TTL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_SESSION_TTL_SECS);

            let port = lookup("PORT")
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);

            Self {
                api_base_url,
                request_timeout: Duration::from_secs(timeout_secs),
                sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.trim().is_empty()),
                port,
                session_ttl: Duration::from_secs(session_ttl_secs),
            }
        }
    }

}
