//! API server configuration.
//!
//! Environment-driven; every value has a development default except the
//! provider credentials, which [`GatewayConfig::from_env`] requires.
//!
//! ## Variables
//! ```text
//! TIENDA_BIND_ADDR       listen address            (default 0.0.0.0:8080)
//! TIENDA_DATABASE_PATH   SQLite file path          (default tienda.db)
//! TIENDA_STORE_NAME      store contact for QR      (default Tienda POS)
//! TIENDA_STORE_EMAIL     store contact for QR
//! TIENDA_STORE_PHONE     store contact for QR
//! PAGOFACIL_*            provider credentials (see tienda-gateway)
//! ```

use std::net::SocketAddr;

use tienda_settlement::EngineConfig;

/// Runtime configuration for the API binary.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub database_path: String,
    pub store: EngineConfig,
}

impl ApiConfig {
    /// Loads configuration from the environment.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr = std::env::var("TIENDA_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()?;

        let database_path =
            std::env::var("TIENDA_DATABASE_PATH").unwrap_or_else(|_| "tienda.db".to_string());

        let mut store = EngineConfig::default();
        if let Ok(name) = std::env::var("TIENDA_STORE_NAME") {
            store.store_name = name;
        }
        if let Ok(email) = std::env::var("TIENDA_STORE_EMAIL") {
            store.store_email = email;
        }
        if let Ok(phone) = std::env::var("TIENDA_STORE_PHONE") {
            store.store_phone = phone;
        }

        Ok(ApiConfig {
            bind_addr,
            database_path,
            store,
        })
    }
}
