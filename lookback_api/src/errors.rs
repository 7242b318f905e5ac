//! Error types for the API client.

use crate::transport::TransportError;

/// Errors that can occur when building or executing a snapshot query.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A builder argument was rejected (e.g. a sort direction other than 1 or -1).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The query asked for all fields and also listed explicit fields.
    #[error("Cannot set fields=true and pass required fields")]
    ConflictingProjection,
    /// The query has no find clause.
    #[error("Cannot execute query without find")]
    MissingFilter,
    /// Username or password is not configured.
    #[error("Username and Password are required to execute query")]
    MissingCredentials,
    /// Workspace is not configured.
    #[error("Workspace is required to execute query")]
    MissingWorkspace,
    /// The configured base URL does not form a valid query URL.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    /// The service answered 401.
    #[error("Authorization failed, check username and password")]
    AuthenticationFailed,
    /// The service answered without a body.
    #[error("No data received from server (status {status})")]
    EmptyResponse { status: u16 },
    /// The service parsed the query but reported errors. All messages are kept in order.
    #[error("{}", .0.join(", "))]
    ServiceReportedError(Vec<String>),
    /// A success response whose body is not a valid result envelope. Kept
    /// apart from [`Error::TransportFailure`] so callers can tell a completed
    /// exchange with garbage in it from one that never completed.
    #[error("Failed to parse response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
    /// A non-success status whose body is not a result envelope.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// A continuation was requested from a result that did not come from `execute`.
    #[error("Result has no source query to continue from")]
    MissingSourceQuery,
    /// The transport failed to complete the exchange.
    #[error("Transport failure")]
    TransportFailure(#[source] TransportError),
}

impl Error {
    /// The service-reported error messages, if this is a [`Error::ServiceReportedError`].
    pub fn service_errors(&self) -> Option<&[String]> {
        match self {
            Error::ServiceReportedError(errors) => Some(errors),
            _ => None,
        }
    }
}
