pub mod client;
pub mod oauth;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::common::errors::Error;

pub use client::TwitterClient;

const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct User {
    pub screen_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tweet {
    pub id: u64,
    pub id_str: String,
    #[serde(deserialize_with = "deserialize_created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "full_text")]
    pub text: String,
    /// Raw source attribute, an HTML anchor around the client name.
    #[serde(default)]
    pub source: String,
    pub user: User,
    #[serde(default)]
    pub in_reply_to_status_id: Option<u64>,
    #[serde(default)]
    pub retweeted_status: Option<serde_json::Value>,
}

impl Tweet {
    pub fn author(&self) -> &str {
        &self.user.screen_name
    }

    pub fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }

    /// Client name with the surrounding anchor tag stripped.
    pub fn source_name(&self) -> &str {
        let source = self.source.trim();
        match (source.find('>'), source.rfind("</a>")) {
            (Some(start), Some(end)) if source.starts_with("<a") && start < end => {
                &source[start + 1..end]
            }
            _ => source,
        }
    }
}

pub fn parse_created_at(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_str(value, CREATED_AT_FORMAT).map(|date| date.with_timezone(&Utc))
}

fn deserialize_created_at<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_created_at(&value).map_err(serde::de::Error::custom)
}

/// The slice of the Twitter API the bot needs.
#[async_trait]
pub trait TwitterApi: Send + Sync {
    /// Latest tweets of `screen_name`, or of the authenticated account when
    /// `None`, newest first.
    async fn user_timeline(&self, screen_name: Option<&str>, count: u32)
        -> Result<Vec<Tweet>, Error>;

    async fn get_status(&self, id: u64) -> Result<Tweet, Error>;

    async fn update_status(&self, text: &str, in_reply_to_status_id: u64) -> Result<Tweet, Error>;
}
