//! API server configuration.

/// Configuration for the admin HTTP server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// Bearer token required on `/api/admin/*`. Admin routes reject every
    /// request while unset.
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable             | Default          |
    /// |----------------------|------------------|
    /// | `BIND_ADDR`          | `127.0.0.1:3100` |
    /// | `ROAMLY_ADMIN_TOKEN` | unset            |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            admin_token: std::env::var("ROAMLY_ADMIN_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
        }
    }
}
