use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use uuid::Uuid;

use super::oauth::{authorization_header, encode_pairs, Credentials};
use super::{Tweet, TwitterApi};
use crate::common::errors::Error;
use crate::common::utils::rate_limit_reset;
use crate::config::Config;

const API_BASE_URL: &str = "https://api.twitter.com/1.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TwitterClient {
    http: reqwest::Client,
    credentials: Credentials,
    base_url: String,
}

impl TwitterClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            credentials: config.into(),
            base_url: API_BASE_URL.into(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<(T, HeaderMap), Error> {
        let url = format!("{}/{}.json", self.base_url, endpoint);
        let nonce = Uuid::new_v4().simple().to_string();
        let authorization = authorization_header(
            &self.credentials,
            method.as_str(),
            &url,
            &params,
            &nonce,
            Utc::now().timestamp(),
        )?;

        let encoded = encode_pairs(&params);
        let request = if method == Method::GET {
            let url = if encoded.is_empty() {
                url
            } else {
                format!("{}?{}", url, encoded)
            };
            self.http.get(url)
        } else {
            self.http
                .request(method, url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(encoded)
        };

        let response = request
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        let response = check_status(endpoint, response).await?;
        read_json(response).await
    }
}

/// A body that doesn't match the expected shape is a `Json` error, which the
/// workflow does not retry.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<(T, HeaderMap), Error> {
    let headers = response.headers().clone();
    let bytes = response.bytes().await?;
    let body = serde_json::from_slice(&bytes)?;

    Ok((body, headers))
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        log_rate_limit(response.headers());
        return Err(Error::RateLimited {
            endpoint: endpoint.into(),
        });
    }

    let message = response.text().await.unwrap_or_default();
    warn!("{} failed with status {}", endpoint, status);

    Err(Error::TwitterApi {
        status: status.as_u16(),
        message,
    })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn log_rate_limit(headers: &HeaderMap) {
    info!(
        "Rate limit remaining {}/{} resets in {}",
        header(headers, "x-rate-limit-remaining").unwrap_or("??"),
        header(headers, "x-rate-limit-limit").unwrap_or("??"),
        rate_limit_reset(header(headers, "x-rate-limit-reset"), Utc::now()),
    );
}

#[async_trait]
impl TwitterApi for TwitterClient {
    async fn user_timeline(
        &self,
        screen_name: Option<&str>,
        count: u32,
    ) -> Result<Vec<Tweet>, Error> {
        let mut params = vec![
            ("count".to_string(), count.to_string()),
            ("tweet_mode".to_string(), "extended".to_string()),
        ];
        if let Some(screen_name) = screen_name {
            params.push(("screen_name".to_string(), screen_name.to_string()));
        }

        let (tweets, headers) = self
            .call::<Vec<Tweet>>(Method::GET, "statuses/user_timeline", params)
            .await?;

        log_rate_limit(&headers);
        info!(
            "last-modified: {}",
            header(&headers, "last-modified").unwrap_or("??")
        );

        Ok(tweets)
    }

    async fn get_status(&self, id: u64) -> Result<Tweet, Error> {
        let params = vec![
            ("id".to_string(), id.to_string()),
            ("tweet_mode".to_string(), "extended".to_string()),
        ];
        let (tweet, _) = self.call(Method::GET, "statuses/show", params).await?;

        Ok(tweet)
    }

    async fn update_status(&self, text: &str, in_reply_to_status_id: u64) -> Result<Tweet, Error> {
        let params = vec![
            ("status".to_string(), text.to_string()),
            (
                "in_reply_to_status_id".to_string(),
                in_reply_to_status_id.to_string(),
            ),
        ];
        let (tweet, _) = self.call(Method::POST, "statuses/update", params).await?;

        Ok(tweet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &'static str) -> Response {
        http::Response::builder()
            .status(status)
            .header("x-rate-limit-remaining", "0")
            .header("x-rate-limit-limit", "900")
            .body(body)
            .map(Response::from)
            .unwrap()
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let error = check_status("statuses/update", response(429, "{}"))
            .await
            .unwrap_err();

        assert!(matches!(&error, Error::RateLimited { endpoint } if endpoint == "statuses/update"));
        assert_eq!(error.error_type(), "RateLimitExceeded");
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let error = check_status("statuses/show", response(500, "Internal error"))
            .await
            .unwrap_err();

        assert!(matches!(
            &error,
            Error::TwitterApi { status: 500, message } if message == "Internal error"
        ));
        assert_eq!(error.error_type(), "TwitterApiError");
    }

    #[tokio::test]
    async fn success_passes_through() {
        let checked = check_status("statuses/show", response(200, "[]")).await.unwrap();
        assert_eq!(checked.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unexpected_body_is_a_serialization_error() {
        let error = read_json::<Vec<Tweet>>(response(200, "{\"errors\": []}"))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Json(_)));
        assert_eq!(error.error_type(), "SerializationError");
    }
}
