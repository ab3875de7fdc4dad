use crate::{api::models::Id, common::constants::GENERIC_ERROR_MESSAGE};
use snafu::Snafu;
use std::path::PathBuf;

/// Errors raised while talking to the fleet backend or managing local client state.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum Error {
    /// The backend endpoint is not a valid URL.
    #[snafu(display("Invalid fleet API endpoint {}: {}", endpoint, source))]
    InvalidEndpoint {
        source: url::ParseError,
        endpoint: String,
    },

    /// The HTTP client could not be constructed.
    #[snafu(display("Failed to build HTTP client: {}", source))]
    ClientBuild { source: reqwest::Error },

    /// A read request could not be sent, retries included.
    #[snafu(display("GET {} failed: {}", path, source))]
    ReadRequest {
        source: reqwest_middleware::Error,
        path: String,
    },

    /// A write request could not be sent.
    #[snafu(display("{} {} failed: {}", method, path, source))]
    WriteRequest {
        source: reqwest::Error,
        method: String,
        path: String,
    },

    /// The response body did not match the expected model.
    #[snafu(display("Failed to decode response of {}: {}", path, source))]
    DecodeResponse { source: reqwest::Error, path: String },

    /// The backend rejected the bearer token. Stored credentials were cleared.
    #[snafu(display(
        "Unauthorized request to {}: stored credentials were cleared, please log in again with `fleetctl login`",
        path
    ))]
    Unauthorized { path: String },

    /// The backend answered with a non-success status.
    #[snafu(display("{} returned {}: {}", path, status, message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE)))]
    HttpStatus {
        path: String,
        status: u16,
        message: Option<String>,
    },

    /// Reading or writing a client state file failed.
    #[snafu(display("Failed to access {}: {}", filepath.display(), source))]
    StateFileIo {
        source: std::io::Error,
        filepath: PathBuf,
    },

    /// A client state file holds invalid JSON.
    #[snafu(display("Failed to parse {}: {}", filepath.display(), source))]
    StateFileParse {
        source: serde_json::Error,
        filepath: PathBuf,
    },

    /// Serializing a client state file failed.
    #[snafu(display("Failed to serialize {}: {}", filepath.display(), source))]
    StateFileSerialize {
        source: serde_json::Error,
        filepath: PathBuf,
    },

    /// The backend acknowledged a ConfigMap sync without applying it.
    #[snafu(display("{} was rejected: {}", action, message.as_deref().unwrap_or(GENERIC_ERROR_MESSAGE)))]
    SyncRejected {
        action: String,
        message: Option<String>,
    },

    /// The same action is already waiting for the backend.
    #[snafu(display("'{}' is already in progress, wait for it to finish", action))]
    DuplicateSubmission { action: String },

    /// Input was rejected before anything was sent.
    #[snafu(display("{}", source))]
    Validation { source: ValidationError },
}

/// Client-side validation failures, reported before a request is made.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub), context(suffix(false)))]
pub enum ValidationError {
    /// No target environment was chosen.
    #[snafu(display("Please select a target environment."))]
    NoTargetEnvironment,

    /// The chosen target is the source environment.
    #[snafu(display("Target environment must differ from the source environment."))]
    TargetIsSource,

    /// The environment id is not one of the offered options.
    #[snafu(display("Environment {} is not available as a target.", id))]
    UnknownEnvironment { id: Id },

    /// The app instance does not belong to the target environment.
    #[snafu(display("App instance {} is not part of the target environment.", id))]
    UnknownAppInstance { id: Id },

    /// The service is not part of the sync selection.
    #[snafu(display("Service {} is not part of the selection.", id))]
    UnknownService { id: Id },

    /// Some services have no destination in 1:1 mode.
    #[snafu(display("Please map every service to a target app instance: {}", services.join(", ")))]
    UnmappedServices { services: Vec<String> },

    /// No destination instances in fan-out mode.
    #[snafu(display("Please select at least one target app instance."))]
    NoTargetInstances,

    /// The wizard was opened without services.
    #[snafu(display("Please select at least one service to sync."))]
    NoServicesSelected,

    /// The destructive-action confirmation was declined.
    #[snafu(display("Sync was not confirmed."))]
    NotConfirmed,

    /// A submission is running and cannot be interrupted.
    #[snafu(display("A sync is being submitted and cannot be cancelled."))]
    SubmissionInFlight,

    /// The requested transition is not valid from the current step.
    #[snafu(display("Cannot {} while at step {}.", action, step))]
    InvalidStep { action: String, step: String },

    /// The key already matches between source and target.
    #[snafu(display("Key '{}' is already identical.", key))]
    KeyIdentical { key: String },

    /// The key has no value in the source ConfigMap.
    #[snafu(display("Key '{}' does not exist in the source ConfigMap.", key))]
    KeyMissingInSource { key: String },

    /// The key is not part of the comparison.
    #[snafu(display("Key '{}' is not part of this ConfigMap comparison.", key))]
    UnknownKey { key: String },

    /// No selected key has a value to sync.
    #[snafu(display("Please select at least one key with a source value."))]
    NoKeysSelected,

    /// A required form field is empty.
    #[snafu(display("{} is required.", field))]
    RequiredField { field: String },
}

/// A wrapper type to remove repeated Result<T, Error> returns.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<ValidationError> for Error {
    fn from(source: ValidationError) -> Self {
        Self::Validation { source }
    }
}

impl Error {
    /// Message suitable for a notification: the server's message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            Error::HttpStatus {
                message: Some(message),
                ..
            } => message.clone(),
            Error::SyncRejected {
                message: Some(message),
                ..
            } => message.clone(),
            Error::HttpStatus { message: None, .. }
            | Error::ReadRequest { .. }
            | Error::WriteRequest { .. }
            | Error::DecodeResponse { .. } => GENERIC_ERROR_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<Error> for i32 {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidEndpoint { .. } => 401,
            Error::ClientBuild { .. } => 402,
            Error::ReadRequest { .. } => 403,
            Error::WriteRequest { .. } => 404,
            Error::DecodeResponse { .. } => 405,
            Error::Unauthorized { .. } => 406,
            Error::HttpStatus { .. } => 407,
            Error::StateFileIo { .. } => 408,
            Error::StateFileParse { .. } => 409,
            Error::StateFileSerialize { .. } => 410,
            Error::DuplicateSubmission { .. } => 411,
            Error::Validation { .. } => 412,
            Error::SyncRejected { .. } => 413,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_is_preferred() {
        let error = Error::HttpStatus {
            path: "/api/services/sync".to_string(),
            status: 409,
            message: Some("Target environment is locked".to_string()),
        };
        assert_eq!(error.user_message(), "Target environment is locked");

        let error = Error::HttpStatus {
            path: "/api/services/sync".to_string(),
            status: 500,
            message: None,
        };
        assert_eq!(error.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn validation_errors_keep_their_text() {
        let error: Error = ValidationError::NoTargetEnvironment.into();
        assert_eq!(error.user_message(), "Please select a target environment.");
        assert_eq!(i32::from(error), 412);
    }
}
