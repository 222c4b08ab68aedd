use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::errors::Error;
use crate::common::utils::pretty_duration;
use crate::common::TIMELINE_COUNT;
use crate::config::Config;
use crate::twitter::{Tweet, TwitterApi};

/// Marker every tweet worth a reply contains.
const CANDIDATE_MARKER: &str = "Alt/title text:";

pub const MESSAGES: [&str; 40] = [
    "Admirable bot.",
    "Amazing bot.",
    "Awesome bot.",
    "Brilliant bot.",
    "Cool bot.",
    "Excellent bot.",
    "Exceptional bot.",
    "Extraordinary bot.",
    "Fantastic bot.",
    "Good bot.",
    "Grandiose bot.",
    "Impressive bot.",
    "Incredible bot.",
    "Magnificient bot.",
    "Marvelous bot.",
    "Noble bot.",
    "Outstanding bot.",
    "Phenomenal bot.",
    "Remarkable bot.",
    "Sensational bot.",
    "Sublime bot.",
    "Superb bot.",
    "Wonderful bot.",
    "The best bot.",
    "Thank you for your assiduity.",
    "Thank you for your conscientiousness.",
    "Thank you for your diligence.",
    "Thank you for your generous effort.",
    "Thanks!",
    "Much thanks.",
    "Thanks so much.",
    "Thank you for posting this.",
    "Good job.",
    "Splendid job.",
    "I appreciate your effort.",
    "I appreciate your diligence.",
    "I appreciate your work.",
    "I am grateful for your work.",
    "Well done.",
    "Continue your great work.",
];

/// Result of the reply step, returned to the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReplyOutcome {
    pub tweet_id: String,
    pub dry_run: bool,
    /// Only set when a reply was actually sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_tweet: Option<String>,
}

pub fn is_candidate(tweet: &Tweet, config: &Config) -> bool {
    tweet.author() == config.target
        && tweet.source_name() == config.source
        && !tweet.is_retweet()
        && tweet.text.contains(CANDIDATE_MARKER)
}

fn log_tweet(tweet: Option<&Tweet>) {
    match tweet {
        None => info!("No tweet"),
        Some(tweet) => {
            info!(".  Tweet ID: {}", tweet.id_str);
            info!(".  Created:  {}", tweet.created_at);
            info!(".  Author:   {}", tweet.author());
            info!(".  {}", tweet.text);
        }
    }
}

/// Newest tweet of the target account that qualifies for a reply.
pub async fn get_latest_candidate_tweet<A>(api: &A, config: &Config) -> Result<Option<Tweet>, Error>
where
    A: TwitterApi + ?Sized,
{
    let tweets = api
        .user_timeline(Some(&config.target), TIMELINE_COUNT)
        .await?;

    Ok(tweets.into_iter().find(|tweet| is_candidate(tweet, config)))
}

/// Picks a reply for `tweet`, or `None` when the controlled account already
/// replied to it. Messages used in the account's recent tweets are skipped.
pub async fn choose_reply<A, R>(api: &A, tweet: &Tweet, rng: &mut R) -> Result<Option<String>, Error>
where
    A: TwitterApi + ?Sized,
    R: Rng + ?Sized,
{
    let own_tweets = api.user_timeline(None, TIMELINE_COUNT).await?;

    // Without a visible timeline there is no way to tell whether we already
    // replied, so refuse to act.
    if own_tweets.is_empty() {
        return Err(Error::NoTimeline);
    }

    if own_tweets
        .iter()
        .any(|own| own.in_reply_to_status_id == Some(tweet.id))
    {
        return Ok(None);
    }

    let mut messages: Vec<&str> = MESSAGES
        .iter()
        .copied()
        .filter(|message| !own_tweets.iter().any(|own| own.text.contains(message)))
        .collect();

    if messages.is_empty() {
        messages = MESSAGES.to_vec();
    }

    Ok(messages.choose(rng).map(|message| message.to_string()))
}

/// Seconds since the tweet was posted. Clock skew clamps to zero.
pub fn time_since_tweet(tweet: &Tweet, now: DateTime<Utc>) -> i64 {
    (now - tweet.created_at).num_seconds().max(0)
}

pub async fn choose_candidate_tweet<A, R>(
    api: &A,
    config: &Config,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Option<Tweet>, Error>
where
    A: TwitterApi + ?Sized,
    R: Rng + ?Sized,
{
    let candidate = get_latest_candidate_tweet(api, config).await?;
    log_tweet(candidate.as_ref());

    let Some(candidate) = candidate else {
        return Ok(None);
    };

    let seconds_since = time_since_tweet(&candidate, now);
    let max_age = config.max_age_seconds();
    info!("Tweet was posted {} ago.", pretty_duration(seconds_since));

    if seconds_since > max_age {
        info!("Tweet was posted more than {} ago.", pretty_duration(max_age));
        return Ok(None);
    }

    if choose_reply(api, &candidate, rng).await?.is_none() {
        info!("Already replied to this tweet.");
        return Ok(None);
    }

    Ok(Some(candidate))
}

pub async fn reply_to_tweet<A, R>(
    api: &A,
    tweet_id: &str,
    dry_run: bool,
    rng: &mut R,
) -> Result<ReplyOutcome, Error>
where
    A: TwitterApi + ?Sized,
    R: Rng + ?Sized,
{
    let id = tweet_id
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::InvalidTweetId(tweet_id.into()))?;

    let tweet = api.get_status(id).await?;
    log_tweet(Some(&tweet));

    let mut outcome = ReplyOutcome {
        tweet_id: tweet_id.into(),
        dry_run,
        reply_tweet: None,
    };

    let Some(reply) = choose_reply(api, &tweet, rng).await? else {
        info!("Already replied to this tweet.");
        return Ok(outcome);
    };

    info!("Reply: {}", reply);
    if dry_run {
        info!("Dry run - not sending reply");
        return Ok(outcome);
    }

    api.update_status(&format!("@{} {}", tweet.author(), reply), id)
        .await?;
    info!("Reply tweet sent.");

    outcome.reply_tweet = Some(reply);
    Ok(outcome)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::twitter::User;

    pub(crate) const TARGET: &str = "xkcdComic";
    pub(crate) const SOURCE: &str = "xkcd bot";
    pub(crate) const CONTROLLED: &str = "GoodBotBot";

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap()
    }

    pub(crate) fn config() -> Config {
        Config {
            app_key: "key".into(),
            app_secret: "secret".into(),
            access_token: "token".into(),
            token_secret: "token-secret".into(),
            target: TARGET.into(),
            source: SOURCE.into(),
            max_age: 360,
        }
    }

    pub(crate) fn tweet(id: u64, author: &str, text: &str, minutes_ago: i64) -> Tweet {
        Tweet {
            id,
            id_str: id.to_string(),
            created_at: now() - Duration::minutes(minutes_ago),
            text: text.into(),
            source: format!("<a href=\"https://xkcd.com\" rel=\"nofollow\">{}</a>", SOURCE),
            user: User {
                screen_name: author.into(),
            },
            in_reply_to_status_id: None,
            retweeted_status: None,
        }
    }

    pub(crate) fn comic(id: u64, minutes_ago: i64) -> Tweet {
        tweet(id, TARGET, "Alt/title text: a clever joke", minutes_ago)
    }

    pub(crate) fn own_reply(id: u64, to: u64, text: &str) -> Tweet {
        let mut reply = tweet(id, CONTROLLED, text, 10);
        reply.in_reply_to_status_id = Some(to);
        reply
    }

    /// In-memory account: the target's timeline, the controlled account's
    /// timeline, and every status update posted.
    pub(crate) struct FakeTwitter {
        pub target_timeline: Vec<Tweet>,
        pub own_timeline: Vec<Tweet>,
        pub posted: Mutex<Vec<(String, u64)>>,
    }

    impl FakeTwitter {
        pub(crate) fn new(target_timeline: Vec<Tweet>, own_timeline: Vec<Tweet>) -> Self {
            Self {
                target_timeline,
                own_timeline,
                posted: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn posted(&self) -> Vec<(String, u64)> {
            self.posted.lock().expect("poisoned mutex").clone()
        }
    }

    #[async_trait]
    impl TwitterApi for FakeTwitter {
        async fn user_timeline(
            &self,
            screen_name: Option<&str>,
            count: u32,
        ) -> Result<Vec<Tweet>, Error> {
            let timeline = match screen_name {
                Some(_) => &self.target_timeline,
                None => &self.own_timeline,
            };
            Ok(timeline.iter().take(count as usize).cloned().collect())
        }

        async fn get_status(&self, id: u64) -> Result<Tweet, Error> {
            self.target_timeline
                .iter()
                .find(|tweet| tweet.id == id)
                .cloned()
                .ok_or(Error::TwitterApi {
                    status: 404,
                    message: "No status found with that ID.".into(),
                })
        }

        async fn update_status(
            &self,
            text: &str,
            in_reply_to_status_id: u64,
        ) -> Result<Tweet, Error> {
            self.posted
                .lock()
                .expect("poisoned mutex")
                .push((text.to_string(), in_reply_to_status_id));
            Ok(own_reply(999, in_reply_to_status_id, text))
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn candidate_requires_author_source_marker_and_no_retweet() {
        let config = config();
        assert!(is_candidate(&comic(1, 5), &config));

        assert!(!is_candidate(&tweet(1, "someoneElse", "Alt/title text: x", 5), &config));
        assert!(!is_candidate(&tweet(1, TARGET, "just a tweet", 5), &config));

        let mut other_client = comic(1, 5);
        other_client.source = "Twitter Web App".into();
        assert!(!is_candidate(&other_client, &config));

        let mut retweet = comic(1, 5);
        retweet.retweeted_status = Some(serde_json::json!({ "id": 2 }));
        assert!(!is_candidate(&retweet, &config));
    }

    #[test]
    fn time_since_tweet_clamps_future_tweets() {
        assert_eq!(time_since_tweet(&comic(1, 90), now()), 90 * 60);
        assert_eq!(time_since_tweet(&comic(1, -5), now()), 0);
    }

    #[tokio::test]
    async fn latest_candidate_skips_non_matching_tweets() {
        let api = FakeTwitter::new(
            vec![tweet(3, TARGET, "an announcement", 1), comic(2, 30), comic(1, 60)],
            vec![],
        );

        let candidate = get_latest_candidate_tweet(&api, &config()).await.unwrap();
        assert_eq!(candidate.map(|tweet| tweet.id), Some(2));
    }

    #[tokio::test]
    async fn choose_reply_refuses_empty_timeline() {
        let api = FakeTwitter::new(vec![comic(1, 5)], vec![]);

        let result = choose_reply(&api, &comic(1, 5), &mut rng()).await;
        assert!(matches!(result, Err(Error::NoTimeline)));
    }

    #[tokio::test]
    async fn choose_reply_detects_existing_reply() {
        let api = FakeTwitter::new(vec![comic(1, 5)], vec![own_reply(10, 1, "@xkcdComic Good bot.")]);

        let reply = choose_reply(&api, &comic(1, 5), &mut rng()).await.unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn choose_reply_avoids_recently_used_messages() {
        let recent = own_reply(10, 50, &MESSAGES[1..].join(" "));
        let api = FakeTwitter::new(vec![comic(1, 5)], vec![recent]);

        let reply = choose_reply(&api, &comic(1, 5), &mut rng()).await.unwrap();
        assert_eq!(reply.as_deref(), Some(MESSAGES[0]));
    }

    #[tokio::test]
    async fn choose_reply_falls_back_to_full_set_when_all_used() {
        let text = MESSAGES.join(" ");
        let api = FakeTwitter::new(vec![comic(1, 5)], vec![own_reply(10, 50, &text)]);

        let reply = choose_reply(&api, &comic(1, 5), &mut rng()).await.unwrap();
        assert!(reply.is_some_and(|reply| MESSAGES.contains(&reply.as_str())));
    }

    #[tokio::test]
    async fn candidate_older_than_max_age_is_ignored() {
        let api = FakeTwitter::new(vec![comic(1, 361)], vec![own_reply(10, 50, "hello")]);

        let chosen = choose_candidate_tweet(&api, &config(), now(), &mut rng())
            .await
            .unwrap();
        assert_eq!(chosen, None);
    }

    #[tokio::test]
    async fn fresh_unanswered_candidate_is_chosen() {
        let api = FakeTwitter::new(vec![comic(1, 20)], vec![own_reply(10, 50, "hello")]);

        let chosen = choose_candidate_tweet(&api, &config(), now(), &mut rng())
            .await
            .unwrap();
        assert_eq!(chosen.map(|tweet| tweet.id), Some(1));
    }

    #[tokio::test]
    async fn answered_candidate_is_not_chosen() {
        let api = FakeTwitter::new(vec![comic(1, 20)], vec![own_reply(10, 1, "@xkcdComic Thanks!")]);

        let chosen = choose_candidate_tweet(&api, &config(), now(), &mut rng())
            .await
            .unwrap();
        assert_eq!(chosen, None);
    }

    #[tokio::test]
    async fn reply_mentions_author_and_threads_under_tweet() {
        let api = FakeTwitter::new(vec![comic(42, 20)], vec![own_reply(10, 50, "hello")]);

        let outcome = reply_to_tweet(&api, "42", false, &mut rng()).await.unwrap();

        let posted = api.posted();
        assert_eq!(posted.len(), 1);
        let reply = outcome.reply_tweet.expect("reply should be reported");
        assert_eq!(posted[0], (format!("@xkcdComic {}", reply), 42));
        assert_eq!(outcome.tweet_id, "42");
        assert!(!outcome.dry_run);
    }

    #[tokio::test]
    async fn dry_run_does_not_post() {
        let api = FakeTwitter::new(vec![comic(42, 20)], vec![own_reply(10, 50, "hello")]);

        let outcome = reply_to_tweet(&api, "42", true, &mut rng()).await.unwrap();

        assert!(api.posted().is_empty());
        assert_eq!(outcome.reply_tweet, None);
        assert!(outcome.dry_run);
    }

    #[tokio::test]
    async fn already_answered_tweet_gets_no_second_reply() {
        let api = FakeTwitter::new(vec![comic(42, 20)], vec![own_reply(10, 42, "@xkcdComic Thanks!")]);

        let outcome = reply_to_tweet(&api, "42", false, &mut rng()).await.unwrap();

        assert!(api.posted().is_empty());
        assert_eq!(outcome.reply_tweet, None);
    }

    #[tokio::test]
    async fn malformed_tweet_id_is_rejected() {
        let api = FakeTwitter::new(vec![], vec![]);

        let result = reply_to_tweet(&api, "not-a-number", false, &mut rng()).await;
        assert!(matches!(result, Err(Error::InvalidTweetId(_))));
    }

    #[test]
    fn outcome_omits_reply_when_none_was_sent() {
        let outcome = ReplyOutcome {
            tweet_id: "42".into(),
            dry_run: true,
            reply_tweet: None,
        };

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "tweet-id": "42", "dry-run": true })
        );
    }
}
