use aws_sdk_sfn::error::SdkError;
use aws_sdk_sfn::operation::start_execution::StartExecutionError;
use lambda_runtime::Diagnostic;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Controlled account's timeline is empty")]
    NoTimeline,
    #[error("Invalid tweet id: {0}")]
    InvalidTweetId(String),
    #[error("Rate limit exceeded for {endpoint}")]
    RateLimited { endpoint: String },
    #[error("Twitter API returned {status}: {message}")]
    TwitterApi { status: u16, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    StepFunctions(#[from] Box<SdkError<StartExecutionError>>),
}

impl Error {
    /// Name reported to the runtime as `errorType`. The reply workflow's
    /// retry table matches on these.
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "ConfigurationError",
            Error::NoTimeline => "NoTimelineError",
            Error::InvalidTweetId(_) => "InvalidTweetIdError",
            Error::RateLimited { .. } => "RateLimitExceeded",
            Error::TwitterApi { .. } => "TwitterApiError",
            Error::Http(_) => "HttpError",
            Error::Json(_) => "SerializationError",
            Error::StepFunctions(_) => "StepFunctionsError",
        }
    }
}

impl From<Error> for Diagnostic {
    fn from(value: Error) -> Self {
        Diagnostic {
            error_type: value.error_type().into(),
            error_message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_carries_error_class() {
        let diagnostic: Diagnostic = Error::RateLimited {
            endpoint: "statuses/update".into(),
        }
        .into();

        assert_eq!(diagnostic.error_type, "RateLimitExceeded");
        assert_eq!(
            diagnostic.error_message,
            "Rate limit exceeded for statuses/update"
        );
    }
}
