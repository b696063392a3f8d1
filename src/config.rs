//! Server configuration.

use serde::Deserialize;

fn default_port() -> u16 {
    5000
}

fn default_frontend_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Server settings, read from an optional `calple.toml` in the working
/// directory and overridable through `CALPLE_*` environment variables
/// (e.g. `CALPLE_PORT=8080`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed to send credentialed browser requests.
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("calple").required(false))
            .add_source(config::Environment::with_prefix("CALPLE"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
