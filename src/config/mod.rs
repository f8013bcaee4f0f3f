use std::env;

/// Runtime configuration for the learning-content service
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum size of a single uploaded lesson video or resource file in bytes (default: 100 MB)
    pub max_upload_size: usize,

    /// JWT Secret Key (Required in production)
    pub jwt_secret: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Base URL prepended to storage keys when building public file URLs
    pub storage_public_base_url: String,

    /// Username of an admin account created at startup, if any
    pub admin_username: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024, // 100 MB
            jwt_secret: "secret".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
            storage_public_base_url: "http://localhost:9000/fitlearn".to_string(),
            admin_username: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),

            storage_public_base_url: env::var("STORAGE_PUBLIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.storage_public_base_url),

            admin_username: env::var("ADMIN_USERNAME").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Create config for development (relaxed limits, local origins)
    pub fn development() -> Self {
        Self {
            max_upload_size: 512 * 1024 * 1024,
            ..Self::default()
        }
    }

    /// Create config for production (strict security)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        Self {
            jwt_secret: env::var("JWT_SECRET").expect("CRITICAL: JWT_SECRET must be set"),
            ..from_env
        }
    }
}
