// config.rs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    /// Token and auth cookie lifetime, in minutes.
    pub jwt_maxage: i64,
    pub port: u16,
    // Payment gateway configuration
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_webhook_secret: String,
    pub gateway_base_url: String,
    // External AI scoring service
    pub scoring_service_url: Option<String>,
    // Comma-separated frontend origins for CORS
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn init() -> Config {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");
        let jwt_maxage = std::env::var("JWT_MAXAGE").expect("JWT_MAXAGE must be set");
        let app_url = std::env::var("APP_URL").expect("APP_URL must be set");

        // Gateway configuration (with test defaults)
        let gateway_key_id = std::env::var("GATEWAY_KEY_ID")
            .unwrap_or_else(|_| "rzp_test_key".to_string());
        let gateway_key_secret = std::env::var("GATEWAY_KEY_SECRET")
            .unwrap_or_else(|_| "test_secret_key".to_string());
        let gateway_webhook_secret = std::env::var("GATEWAY_WEBHOOK_SECRET")
            .unwrap_or_else(|_| "test_webhook_secret".to_string());
        let gateway_base_url = std::env::var("GATEWAY_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        let scoring_service_url = std::env::var("SCORING_SERVICE_URL").ok();

        let allowed_origins: Vec<String> = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);

        Config {
            database_url,
            app_url,
            jwt_secret,
            jwt_maxage: jwt_maxage.parse::<i64>().unwrap(),
            port,
            gateway_key_id,
            gateway_key_secret,
            gateway_webhook_secret,
            gateway_base_url,
            scoring_service_url,
            allowed_origins,
        }
    }
}
