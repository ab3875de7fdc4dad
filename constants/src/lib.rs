/// Name of the command line binary.
pub const CLI_NAME: &str = "fleetctl";

/// User agent sent with every request to the fleet backend.
pub fn user_agent() -> String {
    format!("{CLI_NAME}/{}", env!("CARGO_PKG_VERSION"))
}

/// Default URL of the fleet-management REST backend.
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:8080";

/// Environment variable carrying the backend URL.
pub const API_ENDPOINT_ENV: &str = "FLEET_API_URL";

/// Environment variable carrying the bearer token.
pub const API_TOKEN_ENV: &str = "FLEET_API_TOKEN";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "FLEET_CONFIG_DIR";

/// Default configuration directory, relative to the user's home directory.
pub const DEFAULT_CONFIG_DIR: &str = ".config/fleet";

/// File inside the configuration directory holding the bearer token.
pub const TOKEN_FILE_NAME: &str = "token.json";

/// File inside the configuration directory holding the persisted UI preferences.
pub const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Default request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

/// Default time after which cached responses are considered stale.
pub const DEFAULT_STALE_TIME: &str = "30s";

/// Number of retries for transient failures on read requests.
pub const READ_MAX_RETRIES: u32 = 3;
