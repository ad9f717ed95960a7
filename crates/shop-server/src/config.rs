//! Server Configuration

use secrecy::SecretString;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1000";

/// Which gateway implementation to run against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GatewayKind {
    #[default]
    Razorpay,

    /// In-memory gateway for local end-to-end runs
    Mock,
}

impl GatewayKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "razorpay" => Some(Self::Razorpay),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Process-level settings outside the payment configuration
#[derive(Debug)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Postgres connection string; the in-memory store is used without it
    pub database_url: Option<SecretString>,

    /// Database name overriding the one in the URL
    pub db_name: Option<String>,

    /// HS256 secret for session tokens
    pub jwt_secret: Option<SecretString>,

    pub gateway: GatewayKind,
}

impl ServerConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let gateway = match get("PAYMENT_GATEWAY") {
            Some(value) => GatewayKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown PAYMENT_GATEWAY; using razorpay");
                GatewayKind::Razorpay
            }),
            None => GatewayKind::default(),
        };

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            database_url: get("DATABASE_URL").map(SecretString::new),
            db_name: get("DB_NAME"),
            jwt_secret: get("JWT_SECRET").map(SecretString::new),
            gateway,
        }
    }
}
