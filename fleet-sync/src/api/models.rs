use crate::common::errors::{self, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    convert::Infallible,
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

/// Identifier of a backend resource.
///
/// Backends number their rows or hand out opaque strings such as UUIDs; both decode, and an
/// id is sent back in the shape it arrived in. Numeric text equals the number it spells, so
/// `"20"` typed on the command line matches `20` from the wire.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum Id {
    Number(u64),
    Text(String),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum IdKey<'a> {
    Number(u64),
    Text(&'a str),
}

impl Id {
    fn key(&self) -> IdKey<'_> {
        match self {
            Id::Number(number) => IdKey::Number(*number),
            Id::Text(text) => match text.parse() {
                Ok(number) => IdKey::Number(number),
                Err(_) => IdKey::Text(text),
            },
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Id {}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(number) => f.pad(&number.to_string()),
            Id::Text(text) => f.pad(text),
        }
    }
}

impl From<u64> for Id {
    fn from(number: u64) -> Self {
        Id::Number(number)
    }
}

impl From<&str> for Id {
    fn from(text: &str) -> Self {
        Id::Text(text.to_string())
    }
}

impl FromStr for Id {
    type Err = Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(match text.parse::<u64>() {
            Ok(number) => Id::Number(number),
            Err(_) => Id::Text(text.to_string()),
        })
    }
}

/// Site which app instances are registered against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub kind: ClusterType,
}

/// Grouping of app instances, e.g. Dev, Staging, Prod.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Kind of cluster an app instance lives in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterType {
    #[default]
    Rancher,
    Generic,
}

impl std::fmt::Display for ClusterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClusterType::Rancher => write!(f, "rancher"),
            ClusterType::Generic => write!(f, "generic"),
        }
    }
}

/// A deployable target: one namespace in one cluster.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppInstance {
    pub id: Id,
    pub name: String,
    pub cluster: String,
    pub namespace: String,
    #[serde(default)]
    pub cluster_type: ClusterType,
    pub environment_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rancher_site_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_cluster_site_id: Option<Id>,
}

impl AppInstance {
    /// Label shown in pickers and reviews.
    pub fn label(&self) -> String {
        format!("{} ({}/{})", self.name, self.cluster, self.namespace)
    }
}

/// A workload deployed in one app instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Id,
    pub name: String,
    pub app_instance_id: Id,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub replicas: u32,
    #[serde(default)]
    pub available_replicas: u32,
    #[serde(default)]
    pub image_tag: String,
    #[serde(default)]
    pub workload_type: String,
}

/// ConfigMap snapshot of one app instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSnapshot {
    pub name: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Secret snapshot of one app instance. Values never leave the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretSnapshot {
    pub name: String,
    #[serde(default, rename = "type")]
    pub secret_type: String,
    #[serde(default)]
    pub keys: Vec<String>,
}

/// How a resource differs between source and target.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceType {
    Identical,
    Different,
    MissingInSource,
    MissingInTarget,
    #[serde(other)]
    Unknown,
}

/// Comparison of one named resource across two app instances.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRecord<T> {
    pub name: String,
    pub source: Option<T>,
    pub target: Option<T>,
    #[serde(default)]
    pub difference_type: Option<DifferenceType>,
    /// Field name to "differs" flag.
    #[serde(default)]
    pub differences: BTreeMap<String, bool>,
    /// Older payloads carry a free-form status instead of `differenceType`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Per-classification counts of a comparison.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    #[serde(alias = "totalServices", alias = "totalConfigMaps", alias = "totalSecrets")]
    pub total: usize,
    pub identical: usize,
    pub different: usize,
    pub missing_in_source: usize,
    pub missing_in_target: usize,
}

/// Response of the `compare/by-instance` endpoints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport<T> {
    #[serde(default)]
    pub summary: Option<ComparisonSummary>,
    #[serde(default = "Vec::new")]
    pub comparisons: Vec<ComparisonRecord<T>>,
}

/// Key-level comparison of one ConfigMap entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeyComparison {
    pub key: String,
    pub source_value: Option<String>,
    pub target_value: Option<String>,
    #[serde(default)]
    pub is_different: bool,
    #[serde(default)]
    pub missing_in_source: bool,
    #[serde(default)]
    pub missing_in_target: bool,
    #[serde(default)]
    pub identical: bool,
}

/// Response of `GET /api/configmaps/{name}/details`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapDetails {
    pub name: String,
    #[serde(default)]
    pub keys: Vec<ConfigMapKeyComparison>,
}

/// State of a submitted sync batch.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Partial,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Partial => "partial",
            SyncStatus::Failed => "failed",
            SyncStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Audit record of one sync batch, created by the backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: Id,
    pub source_environment_id: Id,
    pub target_environment_id: Id,
    #[serde(default)]
    pub service_ids: Vec<Id>,
    pub status: SyncStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of syncing one service to one app instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultEntry {
    pub service_id: Id,
    #[serde(default)]
    pub service_name: String,
    pub target_app_instance_id: Id,
    pub status: SyncStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Sync audit record with per-service results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperationDetail {
    #[serde(flatten)]
    pub operation: SyncOperation,
    #[serde(default)]
    pub results: Vec<SyncResultEntry>,
}

/// Body of `POST /api/services/sync`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub source_environment_id: Id,
    pub target_environment_id: Id,
    pub service_ids: Vec<Id>,
    pub target_app_instance_ids: Vec<Id>,
}

/// Body of `POST /api/configmaps/sync-key`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeySyncRequest {
    pub source_app_instance_id: Id,
    pub target_app_instance_id: Id,
    pub config_map_name: String,
    pub key: String,
    pub value: String,
}

/// Body of `POST /api/configmaps/sync-keys`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapKeysSyncRequest {
    pub source_app_instance_id: Id,
    pub target_app_instance_id: Id,
    pub config_map_name: String,
    pub keys: BTreeMap<String, String>,
}

/// Acknowledgement of a ConfigMap sync.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncAck {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Filters accepted by the service listing endpoints.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ServiceFilters {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub workload_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Body for creating or updating an environment.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentForm {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Body for creating or updating an app instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppInstanceForm {
    pub name: String,
    pub cluster: String,
    pub namespace: String,
    pub cluster_type: ClusterType,
    pub environment_id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rancher_site_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_cluster_site_id: Option<Id>,
}

fn required(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return errors::RequiredField { field }.fail();
    }
    Ok(())
}

impl EnvironmentForm {
    /// Check the form before it is submitted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("Environment name", &self.name)
    }
}

impl AppInstanceForm {
    /// Check the form before it is submitted. The site reference must match the cluster type.
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("App instance name", &self.name)?;
        required("Cluster", &self.cluster)?;
        required("Namespace", &self.namespace)?;
        match self.cluster_type {
            ClusterType::Rancher if self.rancher_site_id.is_none() => {
                errors::RequiredField {
                    field: "Rancher site",
                }
                .fail()
            }
            ClusterType::Generic if self.generic_cluster_site_id.is_none() => {
                errors::RequiredField {
                    field: "Generic cluster site",
                }
                .fail()
            }
            _ => Ok(()),
        }
    }
}

/// Error body returned by the backend.
#[derive(Deserialize, Debug, Clone, Default)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn comparison_report_accepts_resource_specific_totals() {
        let report: ComparisonReport<Service> = serde_json::from_value(json!({
            "summary": {
                "totalServices": 2,
                "identical": 1,
                "different": 0,
                "missingInSource": 0,
                "missingInTarget": 1
            },
            "comparisons": [{
                "name": "api",
                "source": {
                    "id": 1, "name": "api", "appInstanceId": 10, "status": "running",
                    "replicas": 2, "availableReplicas": 2, "imageTag": "api:1.0",
                    "workloadType": "deployment"
                },
                "target": null,
                "differenceType": "missing_in_target"
            }]
        }))
        .unwrap();
        assert_eq!(report.summary.unwrap().total, 2);
        assert_eq!(
            report.comparisons[0].difference_type,
            Some(DifferenceType::MissingInTarget)
        );
    }

    #[test]
    fn unknown_wire_values_do_not_fail() {
        let kind: DifferenceType = serde_json::from_value(json!("renamed")).unwrap();
        assert_eq!(kind, DifferenceType::Unknown);
        let status: SyncStatus = serde_json::from_value(json!("queued")).unwrap();
        assert_eq!(status, SyncStatus::Unknown);
    }

    #[test]
    fn app_instance_form_requires_the_matching_site() {
        let mut form = AppInstanceForm {
            name: "shop".to_string(),
            cluster: "east".to_string(),
            namespace: "shop".to_string(),
            cluster_type: ClusterType::Generic,
            environment_id: Id::from(1),
            rancher_site_id: Some(Id::from(2)),
            generic_cluster_site_id: None,
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::RequiredField {
                field: "Generic cluster site".to_string()
            })
        );
        form.generic_cluster_site_id = Some(Id::from(3));
        assert_eq!(form.validate(), Ok(()));

        form.namespace = "  ".to_string();
        assert_eq!(
            form.validate(),
            Err(ValidationError::RequiredField {
                field: "Namespace".to_string()
            })
        );
        assert!(EnvironmentForm::default().validate().is_err());
    }

    #[test]
    fn detailed_history_flattens_the_operation() {
        let detail: SyncOperationDetail = serde_json::from_value(json!({
            "id": 7,
            "sourceEnvironmentId": 1,
            "targetEnvironmentId": 2,
            "serviceIds": [3],
            "status": "partial",
            "startTime": "2024-05-01T10:00:00Z",
            "results": [{
                "serviceId": 3,
                "serviceName": "api",
                "targetAppInstanceId": 20,
                "status": "failed",
                "message": "image pull failed"
            }]
        }))
        .unwrap();
        assert_eq!(detail.operation.status, SyncStatus::Partial);
        assert_eq!(detail.results[0].message.as_deref(), Some("image pull failed"));
    }

    #[test]
    fn ids_keep_their_wire_shape() {
        let service: Service = serde_json::from_value(json!({
            "id": "5f0c6a2e-9d1b-4c44-a1f4-2b7d3c1e8a90",
            "name": "api",
            "appInstanceId": 10
        }))
        .unwrap();
        assert_eq!(service.id, Id::from("5f0c6a2e-9d1b-4c44-a1f4-2b7d3c1e8a90"));
        assert_eq!(service.app_instance_id, Id::from(10));

        let request = SyncRequest {
            source_environment_id: Id::from(1),
            target_environment_id: Id::from("staging"),
            service_ids: vec![service.id],
            target_app_instance_ids: vec![Id::from(20)],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "sourceEnvironmentId": 1,
                "targetEnvironmentId": "staging",
                "serviceIds": ["5f0c6a2e-9d1b-4c44-a1f4-2b7d3c1e8a90"],
                "targetAppInstanceIds": [20]
            })
        );
    }

    #[test]
    fn numeric_text_matches_the_number() {
        assert_eq!("20".parse::<Id>(), Ok(Id::from(20)));
        assert_eq!(Id::from("20"), Id::from(20));
        assert_ne!(Id::from("a20"), Id::from(20));
        assert!(Id::from(9) < Id::from(10));
        assert_eq!(Id::from("x-1").to_string(), "x-1");
        assert_eq!(format!("{:>4}", Id::from(7)), "   7");
    }
}
