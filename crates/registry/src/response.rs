//! Structured invocation results handed back to the dispatcher's caller.

use std::fmt;

use bytes::Bytes;

/// Outcome class of an invocation, with its wire status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// The operation failed; see [`Response::message`].
    Error,
}

impl Status {
    /// Numeric status code (200 or 500).
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Error => 500,
        }
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Outcome class.
    pub status: Status,
    /// Failure description; empty on success.
    pub message: String,
    /// Operation output; empty for operations that return nothing.
    pub payload: Bytes,
}

impl Response {
    /// A success carrying an optional payload.
    #[must_use]
    pub fn success(payload: Option<Bytes>) -> Self {
        Self { status: Status::Ok, message: String::new(), payload: payload.unwrap_or_default() }
    }

    /// A failure with a human-readable message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { status: Status::Error, message: message.into(), payload: Bytes::new() }
    }

    /// Returns `true` for a successful invocation.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Payload as UTF-8 text, lossily.
    #[must_use]
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Status::Ok => write!(f, "status:{} payload:{}", self.status.code(), self.payload_text()),
            Status::Error => write!(f, "status:{} message:{}", self.status.code(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_without_payload_is_empty() {
        let response = Response::success(None);
        assert!(response.is_ok());
        assert_eq!(response.status.code(), 200);
        assert!(response.payload.is_empty());
    }

    #[test]
    fn error_carries_message() {
        let response = Response::error("patient does not exist");
        assert!(!response.is_ok());
        assert_eq!(response.to_string(), "status:500 message:patient does not exist");
    }
}
