//! # Server Configuration
//!
//! Environment-driven configuration with sensible local defaults.
//!
//! | Variable           | Default         | Purpose                    |
//! |--------------------|-----------------|----------------------------|
//! | `BODEGA_DB_PATH`   | `./bodega.db`   | SQLite database file       |
//! | `BODEGA_BIND_ADDR` | `0.0.0.0:3000`  | HTTP listen address        |

use std::env;

/// Runtime configuration for the server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    pub db_path: String,

    /// Address the HTTP listener binds to.
    pub bind_addr: String,
}

impl ServerConfig {
    /// Loads configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        ServerConfig {
            db_path: env::var("BODEGA_DB_PATH").unwrap_or_else(|_| "./bodega.db".to_string()),
            bind_addr: env::var("BODEGA_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}
