pub mod configmap_keys;
pub mod in_flight;
pub mod wizard;
