use std::fmt;

use crate::common::errors::Error;
use crate::common::DEFAULT_MAX_AGE_MINUTES;

const APP_KEY_VAR: &str = "BOT_APP_KEY";
const APP_SECRET_VAR: &str = "BOT_APP_SECRET";
const ACCESS_TOKEN_VAR: &str = "BOT_ACCESS_TOKEN";
const TOKEN_SECRET_VAR: &str = "BOT_TOKEN_SECRET";
const TARGET_VAR: &str = "BOT_TARGET";
const SOURCE_VAR: &str = "BOT_SOURCE";
const MAX_AGE_VAR: &str = "BOT_MAXAGE";

/// Options read from the environment at invocation time.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub app_key: String,
    pub app_secret: String,
    pub access_token: String,
    pub token_secret: String,
    /// Screen name of the account whose tweets get replies.
    pub target: String,
    /// `source` attribute a candidate tweet must have.
    pub source: String,
    /// Maximum age of a tweet to reply to, in minutes.
    pub max_age: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads every option through `lookup`. All missing options are reported
    /// together, in declaration order.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |name: &'static str| match lookup(name) {
            Some(value) => value,
            None => {
                missing.push(name);
                String::new()
            }
        };

        let app_key = required(APP_KEY_VAR);
        let app_secret = required(APP_SECRET_VAR);
        let access_token = required(ACCESS_TOKEN_VAR);
        let token_secret = required(TOKEN_SECRET_VAR);
        let target = required(TARGET_VAR);
        let source = required(SOURCE_VAR);

        if !missing.is_empty() {
            return Err(Error::Configuration(format!(
                "Missing configuration option(s): {}",
                missing.join(", ")
            )));
        }

        // Zero means unset, like an empty value.
        let max_age = match lookup(MAX_AGE_VAR).filter(|value| !value.trim().is_empty()) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(0) => DEFAULT_MAX_AGE_MINUTES,
                Ok(minutes) => minutes,
                Err(_) => {
                    return Err(Error::Configuration(format!(
                        "{} must be a whole number of minutes, got {:?}",
                        MAX_AGE_VAR, value
                    )))
                }
            },
            None => DEFAULT_MAX_AGE_MINUTES,
        };

        Ok(Self {
            app_key,
            app_secret,
            access_token,
            token_secret,
            target,
            source,
            max_age,
        })
    }

    pub fn max_age_seconds(&self) -> i64 {
        i64::try_from(self.max_age.saturating_mul(60)).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_key", &"<redacted>")
            .field("app_secret", &"<redacted>")
            .field("access_token", &"<redacted>")
            .field("token_secret", &"<redacted>")
            .field("target", &self.target)
            .field("source", &self.source)
            .field("max_age", &self.max_age)
            .finish()
    }
}
