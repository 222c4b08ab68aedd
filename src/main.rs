use aws_config::BehaviorVersion;
use chrono::Utc;
use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;

use goodbotbot::common::errors::Error;
use goodbotbot::common::init_tracing;
use goodbotbot::config::Config;
use goodbotbot::handler::{handle_event, HandlerEvent};
use goodbotbot::twitter::TwitterClient;
use goodbotbot::workflow::StepFunctionsStarter;

async fn process_event(
    event: LambdaEvent<HandlerEvent>,
    starter: &StepFunctionsStarter,
) -> Result<Value, Error> {
    // Read per invocation so a configuration change needs no cold start.
    let config = Config::from_env()?;
    let api = TwitterClient::new(&config)?;
    let mut rng = StdRng::from_entropy();

    handle_event(event.payload, &config, &api, starter, Utc::now(), &mut rng).await
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    init_tracing();

    let aws_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let starter = StepFunctionsStarter::new(aws_sdk_sfn::Client::new(&aws_config));

    lambda_runtime::run(service_fn(|event: LambdaEvent<HandlerEvent>| async {
        process_event(event, &starter).await
    }))
    .await
}
