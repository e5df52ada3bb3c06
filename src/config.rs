use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub audio: AudioSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Remote collaborator endpoint and the identifying values sent on every
/// request
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub company_id: String,
    pub token: String,
    #[serde(default = "default_include_audio")]
    pub include_audio: bool,
    #[serde(default = "default_search_limit")]
    pub recipient_search_limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

fn default_include_audio() -> bool {
    true
}

fn default_search_limit() -> usize {
    5
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
