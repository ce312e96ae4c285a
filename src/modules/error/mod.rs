// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InboxdError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

pub type InboxdResult<T, E = InboxdError> = std::result::Result<T, E>;

impl InboxdError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InboxdError::Generic { code, .. } => *code,
        }
    }
}
