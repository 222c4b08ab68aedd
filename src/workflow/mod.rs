pub mod definition;

use async_trait::async_trait;
use aws_sdk_sfn::error::SdkError;
use aws_sdk_sfn::operation::start_execution::StartExecutionError;
use serde_json::json;
use tracing::info;

use crate::common::errors::Error;

const EXECUTION_NAME_PREFIX: &str = "GoodBotBot-tweet-id-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { execution_arn: String },
    /// An execution with this name already exists, so the tweet has already
    /// been handed to the workflow.
    AlreadyExists,
}

#[async_trait]
pub trait WorkflowStarter: Send + Sync {
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: String,
    ) -> Result<StartOutcome, Error>;
}

/// Execution names are unique per state machine, which is what keeps the bot
/// from replying twice to one tweet.
pub fn execution_name(tweet_id: &str) -> String {
    format!("{}{}", EXECUTION_NAME_PREFIX, tweet_id)
}

pub async fn run_state_machine<W>(
    starter: &W,
    state_machine_arn: &str,
    tweet_id: &str,
) -> Result<StartOutcome, Error>
where
    W: WorkflowStarter + ?Sized,
{
    let name = execution_name(tweet_id);
    info!("Execution name: {}", name);

    let input = serde_json::to_string(&json!({ "tweet-id": tweet_id }))?;
    starter.start_execution(state_machine_arn, &name, input).await
}

pub struct StepFunctionsStarter {
    client: aws_sdk_sfn::Client,
}

impl StepFunctionsStarter {
    pub fn new(client: aws_sdk_sfn::Client) -> Self {
        Self { client }
    }
}

fn is_already_exists(err: &SdkError<StartExecutionError>) -> bool {
    err.as_service_error()
        .is_some_and(StartExecutionError::is_execution_already_exists)
}

#[async_trait]
impl WorkflowStarter for StepFunctionsStarter {
    async fn start_execution(
        &self,
        state_machine_arn: &str,
        name: &str,
        input: String,
    ) -> Result<StartOutcome, Error> {
        let result = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .name(name)
            .input(input)
            .send()
            .await;

        match result {
            Ok(output) => {
                info!("Execution started: {}", output.execution_arn());
                Ok(StartOutcome::Started {
                    execution_arn: output.execution_arn().to_owned(),
                })
            }
            Err(err) if is_already_exists(&err) => {
                info!("Execution {} already exists", name);
                Ok(StartOutcome::AlreadyExists)
            }
            Err(err) => Err(Box::new(err).into()),
        }
    }
}
