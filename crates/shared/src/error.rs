use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    InvalidProposal,
    AlreadyVoted,
    InsufficientBalance,
    NeuronCommand,
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "Not found",
            Self::InvalidProposal => "Invalid proposal",
            Self::AlreadyVoted => "Already voted",
            Self::InsufficientBalance => "Insufficient balance",
            Self::NeuronCommand => "Neuron command failed",
            Self::Internal => "Internal error",
        };
        f.write_str(label)
    }
}

/// Structured failure reported by the governance backend inside an `err` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code}{}", message_suffix(.message))]
pub struct BackendError {
    pub code: ErrorCode,
    #[serde(default)]
    pub message: String,
}

impl BackendError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn message_suffix(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(": {message}")
    }
}
