//! Twitter reply bot running on AWS Lambda.
//!
//! A schedule invokes the handler to look for a fresh tweet from the target
//! account and hands it to a Step Functions workflow, which invokes the
//! handler again to post the reply. Retries and the one-reply-per-tweet
//! guarantee come from the workflow; see [`workflow`].

pub mod bot;
pub mod common;
pub mod config;
pub mod handler;
pub mod twitter;
pub mod workflow;
