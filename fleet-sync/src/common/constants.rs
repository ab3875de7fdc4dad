use std::{
    env,
    path::{Path, PathBuf},
};

/// Sites route.
pub const SITES_PATH: &str = "/api/sites";

/// Environments route.
pub const ENVIRONMENTS_PATH: &str = "/api/environments";

/// App instances route.
pub const APP_INSTANCES_PATH: &str = "/api/app-instances";

/// Services route.
pub const SERVICES_PATH: &str = "/api/services";

/// Services of a single app instance.
pub const SERVICES_BY_APP_INSTANCE_PATH: &str = "/api/services/by-app-instance";

/// Service comparison between two app instances.
pub const SERVICES_COMPARE_PATH: &str = "/api/services/compare/by-instance";

/// Service sync submission.
pub const SERVICES_SYNC_PATH: &str = "/api/services/sync";

/// Sync audit trail.
pub const SYNC_HISTORY_PATH: &str = "/api/services/sync/history";

/// Sync audit trail with per-service results.
pub const SYNC_HISTORY_DETAILED_PATH: &str = "/api/services/sync/history/detailed";

/// ConfigMap comparison between two app instances.
pub const CONFIGMAPS_COMPARE_PATH: &str = "/api/configmaps/compare/by-instance";

/// ConfigMaps route, details live under `/{name}/details`.
pub const CONFIGMAPS_PATH: &str = "/api/configmaps";

/// Single ConfigMap key sync.
pub const CONFIGMAP_SYNC_KEY_PATH: &str = "/api/configmaps/sync-key";

/// Multi ConfigMap key sync.
pub const CONFIGMAP_SYNC_KEYS_PATH: &str = "/api/configmaps/sync-keys";

/// Secret comparison between two app instances.
pub const SECRETS_COMPARE_PATH: &str = "/api/secrets/compare/by-instance";

/// Fallback shown when a failed request carries no server message.
pub const GENERIC_ERROR_MESSAGE: &str = "Request failed, please try again.";

/// Hex versions longer than this are treated as commit hashes.
pub const COMMIT_HASH_MIN_LEN: usize = 13;

/// Length of a shortened commit hash.
pub const SHORT_HASH_LEN: usize = 7;

/// Resolve the configuration directory: the explicit value, then `FLEET_CONFIG_DIR`,
/// then `$HOME/.config/fleet`, then the working directory.
pub fn config_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = env::var_os(::constants::CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    match env::var_os("HOME") {
        Some(home) => Path::new(&home).join(::constants::DEFAULT_CONFIG_DIR),
        None => PathBuf::from("."),
    }
}
