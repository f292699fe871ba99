/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address of the gameplay backend (default route for unclassified messages)
    pub game_proxy: String,
    /// Address of the chat backend (`chat.*` messages)
    pub chat_proxy: String,
    /// Address of the login backend (`account.*` messages)
    pub login_proxy: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            game_proxy: "ws://127.0.0.1:8001".to_string(),
            chat_proxy: "ws://127.0.0.1:8002".to_string(),
            login_proxy: "ws://127.0.0.1:8003".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load config from environment or use defaults
    ///
    /// An explicitly empty address disables that backend: requests classified
    /// to it are answered with a "proxy not connected" code instead of being
    /// forwarded.
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GAME_PROXY_ADDR") {
            config.game_proxy = addr;
        }
        if let Ok(addr) = std::env::var("CHAT_PROXY_ADDR") {
            config.chat_proxy = addr;
        }
        if let Ok(addr) = std::env::var("LOGIN_PROXY_ADDR") {
            config.login_proxy = addr;
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        for (name, addr) in [
            ("game_proxy", &self.game_proxy),
            ("chat_proxy", &self.chat_proxy),
            ("login_proxy", &self.login_proxy),
        ] {
            if !addr.is_empty() && !addr.contains("://") {
                return Err(format!("{} must be a URL or empty, got '{}'", name, addr));
            }
        }
        if self.game_proxy.is_empty() && self.chat_proxy.is_empty() && self.login_proxy.is_empty()
        {
            return Err("at least one backend address must be configured".to_string());
        }
        Ok(())
    }
}
