use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::report::ReportStore;
use crate::transcription::SttProvider;

/// Runtime configuration, read from the environment once at startup and
/// handed to the components that need it. The Gemini key is genuinely
/// optional: without it, feedback is pinned to the rule-based path.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub stt_provider: SttProvider,
    pub google_api_key: Option<String>,
    pub assemblyai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub jwt_secret: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env_value("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = env_value("PORT").unwrap_or_else(|| "5000".to_string());
        let listen_addr = format!("{}:{}", host, port)
            .parse()
            .context("HOST/PORT do not form a valid listen address")?;

        Ok(Config {
            listen_addr,
            stt_provider: SttProvider::from_str(&env_value("STT_PROVIDER").unwrap_or_default()),
            google_api_key: env_value("GOOGLE_SPEECH_API_KEY"),
            assemblyai_api_key: env_value("ASSEMBLYAI_API_KEY"),
            gemini_api_key: env_value("GEMINI_API_KEY"),
            jwt_secret: env_value("JWT_SECRET").unwrap_or_else(|| "fallback_secret".to_string()),
            data_dir: env_value("SPEAKWISE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(ReportStore::default_dir),
        })
    }

    /// The key for the selected transcription provider. Startup fails here
    /// rather than on the first analyze request.
    pub fn stt_api_key(&self) -> Result<&str> {
        let key = match self.stt_provider {
            SttProvider::Google => self.google_api_key.as_deref(),
            SttProvider::AssemblyAI => self.assemblyai_api_key.as_deref(),
        };
        key.with_context(|| format!("{} is not set", self.stt_provider.api_key_name()))
    }
}

/// Read an environment variable, trimming whitespace and surrounding quotes
/// (deployment dashboards tend to add them). Empty values count as unset.
fn env_value(name: &str) -> Option<String> {
    let value = std::env::var(name).ok()?;
    let value = value.trim().trim_matches('"').to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
