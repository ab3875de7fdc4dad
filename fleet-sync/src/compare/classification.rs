use crate::api::models::{
    ComparisonRecord, ComparisonReport, ComparisonSummary, ConfigMapSnapshot, DifferenceType,
    SecretSnapshot, Service,
};
use std::{collections::BTreeMap, fmt};

/// Status shown for one compared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonStatus {
    MissingInSource,
    MissingInTarget,
    Different,
    Identical,
    Unknown,
}

/// Tag color of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagColor {
    Red,
    Orange,
    Blue,
    Green,
    Default,
}

impl ComparisonStatus {
    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            ComparisonStatus::MissingInSource => "Missing in Source",
            ComparisonStatus::MissingInTarget => "Missing in Target",
            ComparisonStatus::Different => "Different",
            ComparisonStatus::Identical => "Identical",
            ComparisonStatus::Unknown => "Unknown",
        }
    }

    /// Fixed color lookup.
    pub fn color(&self) -> TagColor {
        match self {
            ComparisonStatus::MissingInSource => TagColor::Red,
            ComparisonStatus::MissingInTarget => TagColor::Orange,
            ComparisonStatus::Different => TagColor::Blue,
            ComparisonStatus::Identical => TagColor::Green,
            ComparisonStatus::Unknown => TagColor::Default,
        }
    }

    /// True for rows a user can act on.
    pub fn is_actionable(&self) -> bool {
        matches!(
            self,
            ComparisonStatus::MissingInTarget
                | ComparisonStatus::MissingInSource
                | ComparisonStatus::Different
        )
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<DifferenceType> for ComparisonStatus {
    fn from(kind: DifferenceType) -> Self {
        match kind {
            DifferenceType::MissingInSource => ComparisonStatus::MissingInSource,
            DifferenceType::MissingInTarget => ComparisonStatus::MissingInTarget,
            DifferenceType::Different => ComparisonStatus::Different,
            DifferenceType::Identical => ComparisonStatus::Identical,
            DifferenceType::Unknown => ComparisonStatus::Unknown,
        }
    }
}

/// Classify a record. The backend's `differenceType` wins; payloads without it are classified
/// from the presence of each side and the legacy `status` field.
pub fn classify<T>(record: &ComparisonRecord<T>) -> ComparisonStatus {
    match record.difference_type {
        Some(kind) => kind.into(),
        None => derive_status(
            record.source.is_some(),
            record.target.is_some(),
            record.status.as_deref(),
        ),
    }
}

/// Local fallback classification.
fn derive_status(has_source: bool, has_target: bool, status: Option<&str>) -> ComparisonStatus {
    match (has_source, has_target) {
        (false, true) => ComparisonStatus::MissingInSource,
        (true, false) => ComparisonStatus::MissingInTarget,
        _ if status == Some("different") => ComparisonStatus::Different,
        _ => ComparisonStatus::Identical,
    }
}

/// Fields compared between two snapshots of a resource.
pub trait Compared {
    /// Field name to comparable value.
    fn compared_fields(&self) -> Vec<(&'static str, String)>;
}

impl Compared for Service {
    fn compared_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("imageTag", self.image_tag.clone()),
            ("replicas", self.replicas.to_string()),
            ("workloadType", self.workload_type.clone()),
            ("status", self.status.clone()),
        ]
    }
}

impl Compared for ConfigMapSnapshot {
    fn compared_fields(&self) -> Vec<(&'static str, String)> {
        let data = self
            .data
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n");
        vec![("data", data)]
    }
}

impl Compared for SecretSnapshot {
    fn compared_fields(&self) -> Vec<(&'static str, String)> {
        let mut keys = self.keys.clone();
        keys.sort();
        vec![("type", self.secret_type.clone()), ("keys", keys.join(","))]
    }
}

impl<T: Compared> ComparisonRecord<T> {
    /// Build a record from two snapshots of the same logical resource.
    ///
    /// Exactly one difference type results: a missing side wins, otherwise the record is
    /// identical only when every compared field is equal.
    pub fn from_pair(name: impl Into<String>, source: Option<T>, target: Option<T>) -> Self {
        let mut differences = BTreeMap::new();
        let difference_type = match (&source, &target) {
            (None, Some(_)) => DifferenceType::MissingInSource,
            (Some(_), None) => DifferenceType::MissingInTarget,
            (Some(source), Some(target)) => {
                for ((field, left), (_, right)) in source
                    .compared_fields()
                    .into_iter()
                    .zip(target.compared_fields())
                {
                    differences.insert(field.to_string(), left != right);
                }
                if differences.values().any(|differs| *differs) {
                    DifferenceType::Different
                } else {
                    DifferenceType::Identical
                }
            }
            (None, None) => DifferenceType::Identical,
        };
        Self {
            name: name.into(),
            source,
            target,
            difference_type: Some(difference_type),
            differences,
            status: None,
        }
    }
}

impl<T> ComparisonRecord<T> {
    /// Names of the fields flagged as different.
    pub fn changed_fields(&self) -> Vec<&str> {
        self.differences
            .iter()
            .filter(|(_, differs)| **differs)
            .map(|(field, _)| field.as_str())
            .collect()
    }
}

impl ComparisonSummary {
    /// Count records per status. Unknown records only count towards the total.
    pub fn tally<T>(records: &[ComparisonRecord<T>]) -> Self {
        records.iter().fold(
            ComparisonSummary {
                total: records.len(),
                ..Default::default()
            },
            |mut summary, record| {
                match classify(record) {
                    ComparisonStatus::Identical => summary.identical += 1,
                    ComparisonStatus::Different => summary.different += 1,
                    ComparisonStatus::MissingInSource => summary.missing_in_source += 1,
                    ComparisonStatus::MissingInTarget => summary.missing_in_target += 1,
                    ComparisonStatus::Unknown => {}
                }
                summary
            },
        )
    }
}

impl<T> ComparisonReport<T> {
    /// The backend summary, or one computed from the records when it is missing.
    pub fn effective_summary(&self) -> ComparisonSummary {
        self.summary
            .clone()
            .unwrap_or_else(|| ComparisonSummary::tally(&self.comparisons))
    }

    /// Records grouped by status, actionable ones first, names sorted within a group.
    pub fn grouped(&self) -> Vec<(ComparisonStatus, Vec<&ComparisonRecord<T>>)> {
        let order = [
            ComparisonStatus::MissingInTarget,
            ComparisonStatus::MissingInSource,
            ComparisonStatus::Different,
            ComparisonStatus::Identical,
            ComparisonStatus::Unknown,
        ];
        order
            .into_iter()
            .filter_map(|status| {
                let mut records = self
                    .comparisons
                    .iter()
                    .filter(|record| classify(record) == status)
                    .collect::<Vec<_>>();
                records.sort_by(|a, b| a.name.cmp(&b.name));
                (!records.is_empty()).then_some((status, records))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Id;

    fn service(image_tag: &str, replicas: u32) -> Service {
        Service {
            id: Id::from(1),
            name: "api".to_string(),
            app_instance_id: Id::from(10),
            status: "running".to_string(),
            replicas,
            available_replicas: replicas,
            image_tag: image_tag.to_string(),
            workload_type: "deployment".to_string(),
        }
    }

    fn record(
        source: Option<Service>,
        target: Option<Service>,
        kind: Option<DifferenceType>,
        status: Option<&str>,
    ) -> ComparisonRecord<Service> {
        ComparisonRecord {
            name: "api".to_string(),
            source,
            target,
            difference_type: kind,
            differences: BTreeMap::new(),
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn backend_difference_type_wins() {
        // Both sides present, yet the backend says missing: the backend is the source of truth.
        let record = record(
            Some(service("api:1", 1)),
            Some(service("api:1", 1)),
            Some(DifferenceType::MissingInTarget),
            None,
        );
        assert_eq!(classify(&record), ComparisonStatus::MissingInTarget);

        let unknown = ComparisonRecord {
            difference_type: Some(DifferenceType::Unknown),
            ..record
        };
        assert_eq!(classify(&unknown).label(), "Unknown");
        assert_eq!(classify(&unknown).color(), TagColor::Default);
    }

    #[test]
    fn fallback_partition() {
        let a = Some(service("api:1", 1));
        let cases = [
            (None, a.clone(), None, ComparisonStatus::MissingInSource),
            (a.clone(), None, None, ComparisonStatus::MissingInTarget),
            (a.clone(), a.clone(), Some("different"), ComparisonStatus::Different),
            (a.clone(), a.clone(), Some("same"), ComparisonStatus::Identical),
            (a.clone(), a.clone(), None, ComparisonStatus::Identical),
        ];
        for (source, target, status, expected) in cases {
            assert_eq!(classify(&record(source, target, None, status)), expected);
        }
    }

    #[test]
    fn fallback_matches_backend_for_every_difference_type() {
        for (source, target) in [
            (None, Some(service("api:1", 1))),
            (Some(service("api:1", 1)), None),
            (Some(service("api:1", 1)), Some(service("api:2", 1))),
            (Some(service("api:1", 1)), Some(service("api:1", 1))),
        ] {
            let derived = ComparisonRecord::from_pair("api", source.clone(), target.clone());
            let legacy_status = (derived.difference_type == Some(DifferenceType::Different))
                .then_some("different");
            let legacy = record(source, target, None, legacy_status);
            assert_eq!(classify(&legacy), classify(&derived));
        }
    }

    #[test]
    fn labels_and_colors() {
        let expected = [
            (ComparisonStatus::MissingInSource, "Missing in Source", TagColor::Red),
            (ComparisonStatus::MissingInTarget, "Missing in Target", TagColor::Orange),
            (ComparisonStatus::Different, "Different", TagColor::Blue),
            (ComparisonStatus::Identical, "Identical", TagColor::Green),
        ];
        for (status, label, color) in expected {
            assert_eq!(status.label(), label);
            assert_eq!(status.color(), color);
        }
    }

    #[test]
    fn from_pair_flags_changed_fields() {
        let record =
            ComparisonRecord::from_pair("api", Some(service("api:1", 2)), Some(service("api:2", 2)));
        assert_eq!(record.difference_type, Some(DifferenceType::Different));
        assert_eq!(record.changed_fields(), vec!["imageTag"]);

        let same =
            ComparisonRecord::from_pair("api", Some(service("api:1", 2)), Some(service("api:1", 2)));
        assert_eq!(same.difference_type, Some(DifferenceType::Identical));
        assert!(same.changed_fields().is_empty());
    }

    #[test]
    fn secrets_compare_key_sets_not_order() {
        let left = SecretSnapshot {
            name: "db".to_string(),
            secret_type: "Opaque".to_string(),
            keys: vec!["user".to_string(), "password".to_string()],
        };
        let right = SecretSnapshot {
            keys: vec!["password".to_string(), "user".to_string()],
            ..left.clone()
        };
        let record = ComparisonRecord::from_pair("db", Some(left), Some(right));
        assert_eq!(classify(&record), ComparisonStatus::Identical);
    }

    #[test]
    fn summary_and_grouping() {
        let report = ComparisonReport {
            summary: None,
            comparisons: vec![
                ComparisonRecord::from_pair("web", Some(service("web:1", 1)), Some(service("web:1", 1))),
                ComparisonRecord::from_pair("api", Some(service("api:1", 1)), None),
                ComparisonRecord::from_pair("worker", None, Some(service("w:1", 1))),
                ComparisonRecord::from_pair("cron", Some(service("c:1", 1)), Some(service("c:2", 1))),
            ],
        };
        let summary = report.effective_summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.identical, 1);
        assert_eq!(summary.different, 1);
        assert_eq!(summary.missing_in_source, 1);
        assert_eq!(summary.missing_in_target, 1);

        let groups = report
            .grouped()
            .into_iter()
            .map(|(status, records)| (status, records[0].name.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            groups,
            vec![
                (ComparisonStatus::MissingInTarget, "api".to_string()),
                (ComparisonStatus::MissingInSource, "worker".to_string()),
                (ComparisonStatus::Different, "cron".to_string()),
                (ComparisonStatus::Identical, "web".to_string()),
            ]
        );
    }
}
