use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub refresh_token: RefreshTokenSettings,
    #[serde(default)]
    pub environment: EnvironmentSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Access token settings, used to mint the short-lived `jwt` on refresh
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64, // seconds (e.g., 900 for 15 minutes)
    pub issuer: String,
}

/// Refresh token behaviour
///
/// `refresh_token_expires_in` is kept as written (`"30d"`, `"1h"`, `"15m"`);
/// it is parsed whenever a lifetime is needed so a bad value fails the
/// request that needed it.
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RefreshTokenSettings {
    #[serde(default)]
    pub request_refresh_on_all: bool,
    pub refresh_token_secret: String,
    pub refresh_token_expires_in: String,
    #[serde(default)]
    pub cookie_response: bool,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Deployment values that only influence cookie attributes
#[derive(serde::Deserialize, Clone, Debug, Default)]
pub struct EnvironmentSettings {
    #[serde(default)]
    pub mode: Environment,
    pub production_url: Option<String>,
}

impl EnvironmentSettings {
    pub fn is_production(&self) -> bool {
        self.mode == Environment::Production
    }

    /// Domain the refresh cookie is scoped to.
    ///
    /// `localhost` outside production; in production the host part of
    /// `production_url`, falling back to the raw value when it is not a URL.
    pub fn cookie_domain(&self) -> String {
        if !self.is_production() {
            return "localhost".to_string();
        }

        match self.production_url.as_deref() {
            Some(raw) => url::Url::parse(raw)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| raw.trim_end_matches('/').to_string()),
            None => "localhost".to_string(),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
