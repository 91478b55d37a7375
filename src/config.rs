use anyhow::{anyhow, Result};
use serenity::all::{ChannelId, OnlineStatus, UserId};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

pub const CONFIG_DIR_REL_HOME: &str = ".config/imaginebot";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Bot configuration
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Config {
    pub general: General,
    pub embed: Embed,
    pub links: Links,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(default)]
    pub image_api: ImageApi,
    #[serde(default)]
    pub text_api: TextApi,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct General {
    pub discord_token: String,
    /// The only user allowed to run owner-only commands
    pub owner_id: UserId,
    #[serde(default = "default_status")]
    pub status: OnlineStatus,
    /// Shown as "Playing <activity>"
    #[serde(default)]
    pub activity: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Embed {
    pub color: u32,
    pub error_color: u32,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Links {
    pub support_server: String,
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
pub struct Feedback {
    pub channel_id: Option<ChannelId>,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct ImageApi {
    pub url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct TextApi {
    pub url: String,
    pub timeout_seconds: u64,
}

fn default_status() -> OnlineStatus {
    OnlineStatus::Online
}

impl Default for ImageApi {
    fn default() -> Self {
        Self {
            url: "https://bucu-api.vercel.app/image".to_owned(),
            api_key: "bucu".to_owned(),
            timeout_seconds: 60,
        }
    }
}

impl Default for TextApi {
    fn default() -> Self {
        Self {
            url: "https://text.pollinations.ai/".to_owned(),
            timeout_seconds: 30,
        }
    }
}

impl ImageApi {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl TextApi {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Directory holding the configuration file and the persistent state documents.
pub fn config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(CONFIG_DIR_REL_HOME))
        .ok_or(anyhow!("Could not find home directory"))
}

impl Config {
    pub async fn load() -> Result<Self> {
        let path = config_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            anyhow!(
                "Could not open configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).await.map_err(|e| {
            anyhow!(
                "Could not read configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            anyhow!(
                "Could not parse configuration at `{}`: {}",
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(config)
    }
}
