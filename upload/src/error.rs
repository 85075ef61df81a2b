// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::UploadState;

/// The error type for upload operations.
///
/// Besides the kind and message, an error remembers how far the session got:
/// the furthest [`UploadState`], the part being uploaded and, for session
/// failures, whether the best-effort abort went through.
#[derive(Error, Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    state: Option<UploadState>,
    part: Option<(u32, usize)>,
    status: Option<StatusCode>,
    context: Vec<(&'static str, String)>,
    abort: Option<AbortOutcome>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid credentials and settings. Never retried.
    ConfigInvalid,
    /// The request can't be built or signed, or the caller misused the session.
    RequestInvalid,
    /// The payload can't be encoded or read.
    PayloadInvalid,
    /// Transport failure or timeout.
    Network,
    /// The server answered with an error response.
    Protocol,
    /// The server returned eTag doesn't match the local digest.
    Integrity,
    /// The session was cancelled by the caller.
    Cancelled,
}

/// Outcome of the abort issued after a session failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortOutcome {
    /// The server accepted the abort.
    Aborted,
    /// The abort itself failed, the upload may still hold storage.
    Failed(String),
    /// There was no upload id to abort.
    Skipped,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            state: None,
            part: None,
            status: None,
            context: Vec::new(),
            abort: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a piece of context like the server error code.
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Record the HTTP status returned by the server.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Record the state the session had reached. The first recorded state wins.
    pub(crate) fn with_state(mut self, state: UploadState) -> Self {
        self.state.get_or_insert(state);
        self
    }

    /// Record the part `number` of `total` that failed.
    pub(crate) fn with_part(mut self, number: u32, total: usize) -> Self {
        self.part = Some((number, total));
        self
    }

    pub(crate) fn with_abort(mut self, outcome: AbortOutcome) -> Self {
        self.abort = Some(outcome);
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message without context.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The furthest state the session reached before failing.
    pub fn state(&self) -> Option<UploadState> {
        self.state
    }

    /// The failed part as `(part_number, total_parts)`.
    pub fn part(&self) -> Option<(u32, usize)> {
        self.part
    }

    /// HTTP status returned by the server, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Look up a context value by key.
    pub fn context(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Outcome of the abort issued for this failure.
    pub fn abort_outcome(&self) -> Option<&AbortOutcome> {
        self.abort.as_ref()
    }

    /// Check if retrying the same request may succeed.
    ///
    /// Network errors, timeouts, server errors and throttling are retryable.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Network => true,
            ErrorKind::Protocol => self.status.is_some_and(|s| {
                s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS
            }),
            _ => false,
        }
    }
}

// Convenience constructors
impl Error {
    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a payload invalid error
    pub fn payload_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PayloadInvalid, message)
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Create an integrity error
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Integrity, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.part, self.state) {
            (Some((number, total)), _) => write!(f, "failed during part {number} of {total} upload: ")?,
            (None, Some(state)) => write!(f, "failed during {state}: ")?,
            (None, None) => {}
        }
        write!(f, "{}: {}", self.kind, self.message)?;

        if self.status.is_some() || !self.context.is_empty() {
            f.write_str(" (")?;
            let mut first = true;
            if let Some(status) = self.status {
                write!(f, "status: {}", status.as_u16())?;
                first = false;
            }
            for (k, v) in &self.context {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{k}: {v}")?;
                first = false;
            }
            f.write_str(")")?;
        }

        match &self.abort {
            Some(AbortOutcome::Aborted) => f.write_str("; upload aborted"),
            Some(AbortOutcome::Failed(reason)) => write!(f, "; abort failed: {reason}"),
            Some(AbortOutcome::Skipped) | None => Ok(()),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::PayloadInvalid => write!(f, "invalid payload"),
            ErrorKind::Network => write!(f, "network error"),
            ErrorKind::Protocol => write!(f, "service error"),
            ErrorKind::Integrity => write!(f, "integrity check failed"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Signing and context errors.
///
/// Credential and configuration problems become [`ErrorKind::ConfigInvalid`],
/// unsignable requests [`ErrorKind::RequestInvalid`], local read failures
/// [`ErrorKind::PayloadInvalid`] and transport failures [`ErrorKind::Network`].
impl From<bcesign_core::Error> for Error {
    fn from(err: bcesign_core::Error) -> Self {
        use bcesign_core::ErrorKind as CoreKind;

        let kind = match err.kind() {
            CoreKind::CredentialInvalid | CoreKind::ConfigInvalid => ErrorKind::ConfigInvalid,
            CoreKind::RequestInvalid => ErrorKind::RequestInvalid,
            CoreKind::Io => ErrorKind::PayloadInvalid,
            CoreKind::Transport => ErrorKind::Network,
        };
        Self::new(kind, err.message().to_string()).with_source(err)
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::payload_invalid(err.to_string()).with_source(err)
    }
}
