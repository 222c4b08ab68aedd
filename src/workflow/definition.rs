//! Amazon States Language definition of the reply workflow.
//!
//! The workflow is a single task invoking the bot Lambda in reply mode. All
//! retry behaviour lives in the `Retry` table below and is carried out by
//! Step Functions.

use serde::Serialize;
use serde_json::{json, Value};

/// Substitution variable the template replaces with the function ARN.
pub const FUNCTION_ARN_VARIABLE: &str = "${ReplyFunctionArn}";

const REPLY_STATE: &str = "Reply";
const LAMBDA_INVOKE_RESOURCE: &str = "arn:aws:states:::lambda:invoke";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RetryPolicy {
    pub error_equals: Vec<&'static str>,
    pub interval_seconds: u32,
    pub max_attempts: u32,
    pub backoff_rate: f64,
}

impl RetryPolicy {
    fn new(
        error_equals: &[&'static str],
        interval_seconds: u32,
        max_attempts: u32,
        backoff_rate: f64,
    ) -> Self {
        Self {
            error_equals: error_equals.to_vec(),
            interval_seconds,
            max_attempts,
            backoff_rate,
        }
    }
}

/// Retry table, first match wins. Error names are the `errorType`s the
/// handler reports plus the Lambda service errors.
pub fn retry_policies() -> Vec<RetryPolicy> {
    vec![
        // Twitter rate limit windows are 15 minutes.
        RetryPolicy::new(&["RateLimitExceeded"], 15 * 60, 4, 2.0),
        RetryPolicy::new(&["TwitterApiError", "HttpError"], 60, 5, 2.0),
        RetryPolicy::new(
            &[
                "Lambda.ServiceException",
                "Lambda.AWSLambdaException",
                "Lambda.SdkClientException",
                "Lambda.TooManyRequestsException",
            ],
            2,
            6,
            2.0,
        ),
    ]
}

pub fn state_machine_definition() -> Value {
    json!({
        "Comment": "Reply to a single tweet. The execution name carries the tweet id.",
        "StartAt": REPLY_STATE,
        "States": {
            REPLY_STATE: {
                "Type": "Task",
                "Resource": LAMBDA_INVOKE_RESOURCE,
                "Parameters": {
                    "FunctionName": FUNCTION_ARN_VARIABLE,
                    "Payload.$": "$"
                },
                "OutputPath": "$.Payload",
                "Retry": retry_policies(),
                "End": true
            }
        }
    })
}

pub fn render() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&state_machine_definition())
}
