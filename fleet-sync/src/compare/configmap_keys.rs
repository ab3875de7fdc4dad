use crate::{api::models::ConfigMapKeyComparison, compare::classification::ComparisonStatus};
use std::cmp::Ordering;

/// Classification of one ConfigMap key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyStatus {
    MissingInTarget,
    MissingInSource,
    Different,
    Identical,
}

impl From<KeyStatus> for ComparisonStatus {
    fn from(status: KeyStatus) -> Self {
        match status {
            KeyStatus::MissingInTarget => ComparisonStatus::MissingInTarget,
            KeyStatus::MissingInSource => ComparisonStatus::MissingInSource,
            KeyStatus::Different => ComparisonStatus::Different,
            KeyStatus::Identical => ComparisonStatus::Identical,
        }
    }
}

/// Classify from the values: identical iff both present and equal, missing iff exactly that
/// side is absent, different otherwise.
pub fn key_status(source: Option<&str>, target: Option<&str>) -> KeyStatus {
    match (source, target) {
        (Some(source), Some(target)) if source == target => KeyStatus::Identical,
        (None, Some(_)) => KeyStatus::MissingInSource,
        (Some(_), None) => KeyStatus::MissingInTarget,
        _ => KeyStatus::Different,
    }
}

impl ConfigMapKeyComparison {
    /// Build a comparison with consistent flags.
    pub fn new(key: impl Into<String>, source: Option<String>, target: Option<String>) -> Self {
        let status = key_status(source.as_deref(), target.as_deref());
        Self {
            key: key.into(),
            source_value: source,
            target_value: target,
            is_different: status == KeyStatus::Different,
            missing_in_source: status == KeyStatus::MissingInSource,
            missing_in_target: status == KeyStatus::MissingInTarget,
            identical: status == KeyStatus::Identical,
        }
    }

    /// The key's classification, always derived from the values.
    pub fn status(&self) -> KeyStatus {
        key_status(self.source_value.as_deref(), self.target_value.as_deref())
    }

    /// Recompute the flags from the values so exactly one of them is set.
    pub fn normalized(mut self) -> Self {
        let status = self.status();
        self.is_different = status == KeyStatus::Different;
        self.missing_in_source = status == KeyStatus::MissingInSource;
        self.missing_in_target = status == KeyStatus::MissingInTarget;
        self.identical = status == KeyStatus::Identical;
        self
    }
}

/// Display order: missing in target, missing in source, different, identical, then by key.
pub fn display_order(a: &ConfigMapKeyComparison, b: &ConfigMapKeyComparison) -> Ordering {
    a.status()
        .cmp(&b.status())
        .then_with(|| a.key.cmp(&b.key))
}

/// Normalize and sort key comparisons for display.
pub fn sorted_for_display(keys: Vec<ConfigMapKeyComparison>) -> Vec<ConfigMapKeyComparison> {
    let mut keys = keys
        .into_iter()
        .map(ConfigMapKeyComparison::normalized)
        .collect::<Vec<_>>();
    keys.sort_by(display_order);
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(key: &ConfigMapKeyComparison) -> [bool; 4] {
        [
            key.identical,
            key.missing_in_source,
            key.missing_in_target,
            key.is_different,
        ]
    }

    #[test]
    fn exactly_one_flag_is_set() {
        let values = [None, Some("a"), Some("b")];
        for source in values {
            for target in values {
                let key = ConfigMapKeyComparison::new(
                    "k",
                    source.map(str::to_string),
                    target.map(str::to_string),
                );
                assert_eq!(
                    flags(&key).iter().filter(|flag| **flag).count(),
                    1,
                    "source {source:?} target {target:?}"
                );
            }
        }
    }

    #[test]
    fn classification_is_value_driven() {
        assert_eq!(key_status(Some("a"), Some("a")), KeyStatus::Identical);
        assert_eq!(key_status(None, Some("a")), KeyStatus::MissingInSource);
        assert_eq!(key_status(Some("a"), None), KeyStatus::MissingInTarget);
        assert_eq!(key_status(Some("a"), Some("b")), KeyStatus::Different);
        assert_eq!(key_status(None, None), KeyStatus::Different);
    }

    #[test]
    fn inconsistent_backend_flags_are_normalized() {
        let key = ConfigMapKeyComparison {
            key: "LOG_LEVEL".to_string(),
            source_value: Some("debug".to_string()),
            target_value: Some("info".to_string()),
            is_different: true,
            missing_in_source: false,
            missing_in_target: false,
            identical: true,
        }
        .normalized();
        assert_eq!(flags(&key), [false, false, false, true]);
    }

    #[test]
    fn actionable_keys_sort_first() {
        let keys = vec![
            ConfigMapKeyComparison::new("b_same", Some("1".into()), Some("1".into())),
            ConfigMapKeyComparison::new("z_diff", Some("1".into()), Some("2".into())),
            ConfigMapKeyComparison::new("a_diff", Some("1".into()), Some("2".into())),
            ConfigMapKeyComparison::new("m_new", Some("1".into()), None),
            ConfigMapKeyComparison::new("c_gone", None, Some("1".into())),
            ConfigMapKeyComparison::new("a_same", Some("1".into()), Some("1".into())),
        ];
        let order = sorted_for_display(keys)
            .into_iter()
            .map(|key| key.key)
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["m_new", "c_gone", "a_diff", "z_diff", "a_same", "b_same"]
        );
    }
}
