//! Runs the polling step locally against the live API, without starting the
//! workflow.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

use goodbotbot::bot::choose_candidate_tweet;
use goodbotbot::common::errors::Error;
use goodbotbot::common::init_tracing;
use goodbotbot::config::Config;
use goodbotbot::twitter::TwitterClient;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = Config::from_env()?;
    let api = TwitterClient::new(&config)?;
    let mut rng = StdRng::from_entropy();

    match choose_candidate_tweet(&api, &config, Utc::now(), &mut rng).await? {
        Some(tweet) => println!("Would reply to tweet {}", tweet.id_str),
        None => println!("Nothing to reply to"),
    }

    Ok(())
}
