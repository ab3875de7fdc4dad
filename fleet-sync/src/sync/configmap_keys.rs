use crate::{
    api::models::{ConfigMapKeyComparison, ConfigMapKeySyncRequest, ConfigMapKeysSyncRequest, Id},
    common::errors::{self, ValidationError},
    compare::configmap_keys::{sorted_for_display, KeyStatus},
};
use std::collections::{BTreeMap, BTreeSet};

/// State of the "select all" checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Key-level view of one ConfigMap between two app instances, with row selection.
#[derive(Debug, Clone)]
pub struct KeySyncTable {
    config_map_name: String,
    source_app_instance_id: Id,
    target_app_instance_id: Id,
    rows: Vec<ConfigMapKeyComparison>,
    selected: BTreeSet<String>,
}

impl KeySyncTable {
    pub fn new(
        config_map_name: impl Into<String>,
        source_app_instance_id: Id,
        target_app_instance_id: Id,
        keys: Vec<ConfigMapKeyComparison>,
    ) -> Self {
        Self {
            config_map_name: config_map_name.into(),
            source_app_instance_id,
            target_app_instance_id,
            rows: sorted_for_display(keys),
            selected: BTreeSet::new(),
        }
    }

    pub fn config_map_name(&self) -> &str {
        &self.config_map_name
    }

    /// ConfigMap name with the source and target app instances.
    pub fn identity(&self) -> (String, Id, Id) {
        (
            self.config_map_name.clone(),
            self.source_app_instance_id.clone(),
            self.target_app_instance_id.clone(),
        )
    }

    /// Rows in display order.
    pub fn rows(&self) -> &[ConfigMapKeyComparison] {
        &self.rows
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, key: &str) -> bool {
        self.selected.contains(key)
    }

    /// Replace the rows after a refetch. Selections of vanished keys are dropped.
    pub fn refresh(&mut self, keys: Vec<ConfigMapKeyComparison>) {
        self.rows = sorted_for_display(keys);
        let known = self
            .rows
            .iter()
            .map(|row| row.key.as_str())
            .collect::<BTreeSet<_>>();
        self.selected.retain(|key| known.contains(key.as_str()));
    }

    fn row(&self, key: &str) -> Result<&ConfigMapKeyComparison, ValidationError> {
        self.rows
            .iter()
            .find(|row| row.key == key)
            .ok_or_else(|| ValidationError::UnknownKey {
                key: key.to_string(),
            })
    }

    /// Flip one row. Returns whether it is now selected.
    pub fn toggle(&mut self, key: &str) -> Result<bool, ValidationError> {
        self.row(key)?;
        if self.selected.remove(key) {
            Ok(false)
        } else {
            self.selected.insert(key.to_string());
            Ok(true)
        }
    }

    /// Check or uncheck every row.
    pub fn set_all(&mut self, checked: bool) {
        if checked {
            self.selected = self.rows.iter().map(|row| row.key.clone()).collect();
        } else {
            self.selected.clear();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Checked when every row is selected, indeterminate when only some are.
    pub fn header_state(&self) -> HeaderState {
        match self.selected.len() {
            0 => HeaderState::Unchecked,
            n if n == self.rows.len() => HeaderState::Checked,
            _ => HeaderState::Indeterminate,
        }
    }

    /// Request syncing one key's source value. Identical keys and keys the source lacks are
    /// refused.
    pub fn single_key_request(&self, key: &str) -> Result<ConfigMapKeySyncRequest, ValidationError> {
        let row = self.row(key)?;
        match row.status() {
            KeyStatus::Identical => {
                return errors::KeyIdentical { key }.fail();
            }
            KeyStatus::MissingInSource => {
                return errors::KeyMissingInSource { key }.fail();
            }
            KeyStatus::MissingInTarget | KeyStatus::Different => {}
        }
        let value = row
            .source_value
            .clone()
            .ok_or_else(|| ValidationError::KeyMissingInSource {
                key: key.to_string(),
            })?;
        Ok(ConfigMapKeySyncRequest {
            source_app_instance_id: self.source_app_instance_id.clone(),
            target_app_instance_id: self.target_app_instance_id.clone(),
            config_map_name: self.config_map_name.clone(),
            key: key.to_string(),
            value,
        })
    }

    /// Request syncing every selected key that has a source value.
    pub fn multi_key_request(&self) -> Result<ConfigMapKeysSyncRequest, ValidationError> {
        let keys = self
            .rows
            .iter()
            .filter(|row| self.selected.contains(&row.key))
            .filter_map(|row| {
                row.source_value
                    .as_ref()
                    .map(|value| (row.key.clone(), value.clone()))
            })
            .collect::<BTreeMap<_, _>>();
        if keys.is_empty() {
            return errors::NoKeysSelected.fail();
        }
        Ok(ConfigMapKeysSyncRequest {
            source_app_instance_id: self.source_app_instance_id.clone(),
            target_app_instance_id: self.target_app_instance_id.clone(),
            config_map_name: self.config_map_name.clone(),
            keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KeySyncTable {
        KeySyncTable::new(
            "app-config",
            Id::from(10),
            Id::from(20),
            vec![
                ConfigMapKeyComparison::new("LOG_LEVEL", Some("debug".into()), Some("info".into())),
                ConfigMapKeyComparison::new("REGION", Some("eu".into()), Some("eu".into())),
                ConfigMapKeyComparison::new("FEATURE_X", Some("on".into()), None),
                ConfigMapKeyComparison::new("LEGACY", None, Some("1".into())),
            ],
        )
    }

    #[test]
    fn header_is_tri_state() {
        let mut table = table();
        assert_eq!(table.header_state(), HeaderState::Unchecked);
        table.toggle("LOG_LEVEL").unwrap();
        assert_eq!(table.header_state(), HeaderState::Indeterminate);
        table.set_all(true);
        assert_eq!(table.header_state(), HeaderState::Checked);
        table.set_all(false);
        assert_eq!(table.header_state(), HeaderState::Unchecked);
    }

    #[test]
    fn single_key_sync_sends_the_source_value() {
        let request = table().single_key_request("LOG_LEVEL").unwrap();
        assert_eq!(
            request,
            ConfigMapKeySyncRequest {
                source_app_instance_id: Id::from(10),
                target_app_instance_id: Id::from(20),
                config_map_name: "app-config".to_string(),
                key: "LOG_LEVEL".to_string(),
                value: "debug".to_string(),
            }
        );
        assert!(table().single_key_request("FEATURE_X").is_ok());
    }

    #[test]
    fn single_key_sync_is_refused_when_nothing_to_copy() {
        let table = table();
        assert_eq!(
            table.single_key_request("REGION"),
            Err(ValidationError::KeyIdentical {
                key: "REGION".to_string()
            })
        );
        assert_eq!(
            table.single_key_request("LEGACY"),
            Err(ValidationError::KeyMissingInSource {
                key: "LEGACY".to_string()
            })
        );
        assert_eq!(
            table.single_key_request("NOPE"),
            Err(ValidationError::UnknownKey {
                key: "NOPE".to_string()
            })
        );
    }

    #[test]
    fn multi_key_sync_skips_keys_without_source_value() {
        let mut table = table();
        table.toggle("LOG_LEVEL").unwrap();
        table.toggle("LEGACY").unwrap();
        table.toggle("FEATURE_X").unwrap();

        let request = table.multi_key_request().unwrap();
        assert_eq!(
            request.keys,
            BTreeMap::from([
                ("FEATURE_X".to_string(), "on".to_string()),
                ("LOG_LEVEL".to_string(), "debug".to_string()),
            ])
        );

        table.clear_selection();
        table.toggle("LEGACY").unwrap();
        assert_eq!(table.multi_key_request(), Err(ValidationError::NoKeysSelected));
    }

    #[test]
    fn refresh_keeps_surviving_selections() {
        let mut table = table();
        table.set_all(true);
        table.refresh(vec![ConfigMapKeyComparison::new(
            "LOG_LEVEL",
            Some("debug".into()),
            Some("debug".into()),
        )]);
        assert_eq!(table.rows().len(), 1);
        assert_eq!(table.header_state(), HeaderState::Checked);
    }
}
