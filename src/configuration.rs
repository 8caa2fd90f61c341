use crate::{content_client::ContentClient, domain::SubscriberEmail, email_client::EmailClient};
use anyhow::Context;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{
    postgres::{PgConnectOptions, PgSslMode},
    ConnectOptions,
};
use std::{str::FromStr, time::Duration};
use tracing_log::log::LevelFilter;

#[derive(Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub content: ContentSettings,
}

#[derive(Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
}

#[derive(Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<Secret<String>>,
    pub require_ssl: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    /// `None` when no durable datastore is configured.
    pub fn connect_options(&self) -> Option<Result<PgConnectOptions, sqlx::Error>> {
        let url = self.url.as_ref()?;

        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        Some(PgConnectOptions::from_str(url.expose_secret()).map(|options| {
            options
                .ssl_mode(ssl_mode)
                .log_statements(LevelFilter::Trace)
        }))
    }
}

#[derive(Deserialize)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender: String,
    recipient: String,
    pub api_key: Option<Secret<String>>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn recipient(&self) -> Result<SubscriberEmail, String> {
        SubscriberEmail::parse(self.recipient.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// `Ok(None)` when no API key is configured and notifications are disabled.
    pub fn client(&self) -> Result<Option<EmailClient>, anyhow::Error> {
        let Some(api_key) = self.api_key.clone() else {
            return Ok(None);
        };

        let client = EmailClient::new(
            self.base_url.clone(),
            self.sender.clone(),
            api_key,
            self.timeout(),
        )
        .context("Failed to build the email http client")?;

        Ok(Some(client))
    }
}

#[derive(Deserialize)]
pub struct ContentSettings {
    pub base_url: String,
    pub notion_version: String,
    pub integration_secret: Option<Secret<String>>,
    pub page_url: Option<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl ContentSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// The content feed is mandatory, so every missing piece here is fatal.
    pub fn client(&self) -> Result<ContentClient, anyhow::Error> {
        let integration_secret = self
            .integration_secret
            .clone()
            .context("Content provider integration secret is not configured")?;
        let page_url = self
            .page_url
            .as_deref()
            .context("Content provider page url is not configured")?;
        let page_id = crate::content_client::extract_page_id(page_url)
            .map_err(anyhow::Error::msg)?;

        ContentClient::new(
            self.base_url.clone(),
            self.notion_version.clone(),
            integration_secret,
            page_id,
            self.timeout(),
        )
        .context("Failed to build the content provider http client")
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let config_dir = std::env::current_dir()
        .map(|dir| dir.join("configuration"))
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?;

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let env_config = format!("{}.yaml", environment.as_str());

    let builder = config::Config::builder()
        .add_source(config::File::from(config_dir.join("base.yaml")))
        .add_source(config::File::from(config_dir.join(env_config)))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        );

    with_deployment_overrides(builder)?
        .build()?
        .try_deserialize()
}

/// Variable names used by the hosting platform, mapped onto settings keys.
const DEPLOYMENT_VARIABLES: [(&str, &str); 4] = [
    ("DATABASE_URL", "database.url"),
    ("RESEND_API_KEY", "email_client.api_key"),
    ("NOTION_INTEGRATION_SECRET", "content.integration_secret"),
    ("NOTION_PAGE_URL", "content.page_url"),
];

fn with_deployment_overrides(
    mut builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for (variable, key) in DEPLOYMENT_VARIABLES {
        let value = std::env::var(variable).ok().filter(|v| !v.is_empty());
        builder = builder.set_override_option(key, value)?;
    }

    Ok(builder)
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "production" => Ok(Environment::Production),
            other => Err(format!(
                "`{other}` is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}
