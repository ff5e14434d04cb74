use std::time::Duration;

/// Authentication parameters.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_ttl: chrono::Duration,
    pub link_ttl: chrono::Duration,
    /// Where the link's `code` is sent back to. Must be an absolute URL.
    pub link_base_url: String,
    /// Where the client goes after a link has been consumed.
    pub redirect_url: String,
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::days(7),
            link_ttl: chrono::Duration::minutes(15),
            link_base_url: "http://localhost:3333/auth-links/authenticate".to_string(),
            redirect_url: "http://localhost:5173".to_string(),
            password_iterations: 10_000,
        }
    }
}

/// Everything the domain services are configured with.
#[derive(Debug, Clone)]
pub struct DomainSettings {
    pub auth: AuthSettings,
    /// Upper bound on each store call and each link delivery.
    pub store_timeout: Duration,
}

impl Default for DomainSettings {
    fn default() -> Self {
        Self {
            auth: AuthSettings::default(),
            store_timeout: Duration::from_secs(5),
        }
    }
}
