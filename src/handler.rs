use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::bot::{choose_candidate_tweet, reply_to_tweet};
use crate::common::errors::Error;
use crate::config::Config;
use crate::twitter::TwitterApi;
use crate::workflow::{run_state_machine, WorkflowStarter};

/// Invocation payload. The schedule rule passes the state machine ARN, the
/// workflow passes the tweet id.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HandlerEvent {
    #[serde(default)]
    pub state_machine_arn: Option<String>,
    #[serde(default)]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[tracing::instrument(skip(config, api, starter, rng))]
pub async fn handle_event<A, W, R>(
    event: HandlerEvent,
    config: &Config,
    api: &A,
    starter: &W,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Value, Error>
where
    A: TwitterApi + ?Sized,
    W: WorkflowStarter + ?Sized,
    R: Rng + ?Sized,
{
    match event.tweet_id {
        None => {
            let tweet = choose_candidate_tweet(api, config, now, rng).await?;

            match (event.state_machine_arn.as_deref(), tweet) {
                (None, _) => warn!("no Step Function state machine ARN provided"),
                (Some(arn), Some(tweet)) => {
                    run_state_machine(starter, arn, &tweet.id_str).await?;
                }
                (Some(_), None) => {}
            }

            Ok(Value::Null)
        }
        Some(tweet_id) => {
            info!("Tweet ID argument: {}", tweet_id);
            let outcome = reply_to_tweet(api, &tweet_id, event.dry_run, rng).await?;

            Ok(serde_json::to_value(outcome)?)
        }
    }
}
