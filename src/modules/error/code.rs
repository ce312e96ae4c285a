// Copyright © 2026 inboxd.dev
// Licensed under Inboxd License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    MissingConfiguration = 10020,

    // Authentication and authorization errors (20000–20999)
    PermissionDenied = 20000,
    MissingRefreshToken = 20060,

    // Resource errors (30000–30999)
    ResourceNotFound = 30000,

    // Network connection errors (40000–40999)
    NetworkError = 40000,
    HttpResponseError = 40030,

    // Mail service errors (50000–50999)
    GmailApiCallFailed = 50070,
    GmailApiInvalidHistoryId = 50080,
    ScorerCallFailed = 50090,
    ScorerResponseInvalid = 50100,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}
