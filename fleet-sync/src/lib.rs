/// Shared constants, errors and helpers.
pub mod common;
/// Wire models and the REST client for the fleet backend.
pub mod api;
/// Cache keys and the query cache.
pub mod cache;
/// Source versus target comparison classification.
pub mod compare;
/// Cached reads and pessimistic mutations on top of the REST client.
pub mod data_access;
/// User-facing notifications.
pub mod notify;
/// Environment to app instance pickers.
pub mod picker;
/// Persisted UI preferences.
pub mod preferences;
/// Service sync wizard and ConfigMap key sync.
pub mod sync;
