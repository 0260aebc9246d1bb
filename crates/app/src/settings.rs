//! Handles settings for the application. Configuration is written in
//! `settings.toml`.

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

/// Payment-processor credentials. When absent the export worker falls back
/// to the local payment source, which performs no real reconciliation.
#[derive(Debug, Deserialize)]
pub struct Stripe {
    pub secret_key: String,
    pub base_url: Option<String>,
}

/// Identity written into SIE file headers.
#[derive(Debug, Deserialize, Default)]
pub struct Sie {
    pub program: Option<String>,
    pub org_number: Option<String>,
    pub org_name: Option<String>,
    pub currency: Option<String>,
    pub series: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Worker {
    pub poll_seconds: Option<u64>,
    pub aggregation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    pub stripe: Option<Stripe>,
    pub sie: Option<Sie>,
    pub worker: Option<Worker>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}

impl Sie {
    pub fn into_sie_settings(self) -> engine::SieSettings {
        let mut settings = engine::SieSettings::default();
        if let Some(program) = self.program {
            settings.program = program;
        }
        if let Some(org_number) = self.org_number {
            settings.org_number = org_number;
        }
        if let Some(org_name) = self.org_name {
            settings.org_name = org_name;
        }
        if let Some(currency) = self.currency {
            settings.currency = currency;
        }
        if let Some(series) = self.series {
            settings.series = series;
        }
        settings
    }
}
