/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Result codes shared by every channel-manager operation.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Coarse outcome class of a failed operation.
///
/// `Busy` is advisory: the caller is expected to retry once the condition clears.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    InvalidArgs,
    NotFound,
    Busy,
    Failure,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidArgs => write!(f, "INVALID_ARGS"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::Busy => write!(f, "BUSY"),
            ErrorCode::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Failure returned from the channel-manager API.
#[derive(Debug)]
pub struct ChannelMgrError {
    code: ErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl ChannelMgrError {
    pub fn fail_with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::fail_with_code(ErrorCode::InvalidArgs, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::fail_with_code(ErrorCode::NotFound, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::fail_with_code(ErrorCode::Busy, message)
    }

    /// Wraps an OS/socket error as a generic failure.
    pub fn io(message: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: ErrorCode::Failure,
            message: message.into(),
            source: Some(err),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_busy(&self) -> bool {
        self.code == ErrorCode::Busy
    }
}

impl Display for ChannelMgrError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(err) => write!(f, "{}: {}: {err}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl Error for ChannelMgrError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|err| err as &(dyn Error + 'static))
    }
}

/// Two errors are equal when they carry the same code; messages are diagnostic only.
impl PartialEq for ChannelMgrError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelMgrError, ErrorCode};
    use std::error::Error;
    use std::io;

    #[test]
    fn io_failure_exposes_display_and_source() {
        let error = ChannelMgrError::io(
            "bind failed",
            io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        );

        assert_eq!(error.code(), ErrorCode::Failure);
        assert!(error.to_string().starts_with("FAILURE: bind failed"));
        assert!(error.source().is_some());
    }

    #[test]
    fn busy_display_is_stable() {
        let error = ChannelMgrError::busy("channel is referenced");

        assert!(error.is_busy());
        assert_eq!(error.to_string(), "BUSY: channel is referenced");
        assert!(error.source().is_none());
    }

    #[test]
    fn equality_compares_codes_only() {
        assert_eq!(
            ChannelMgrError::not_found("a"),
            ChannelMgrError::not_found("b")
        );
        assert_ne!(
            ChannelMgrError::not_found("a"),
            ChannelMgrError::invalid_args("a")
        );
    }
}
