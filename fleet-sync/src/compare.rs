pub mod classification;
pub mod configmap_keys;
