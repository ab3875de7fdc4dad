use crate::{
    api::models::Id,
    common::errors::{self, Result},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

/// Client-side preferences that outlive a single invocation.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_site_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_environment_id: Option<Id>,
}

/// Loads and saves [`UiPreferences`] as JSON.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    filepath: PathBuf,
    preferences: UiPreferences,
}

impl PreferencesStore {
    /// Open the store at `filepath`. A missing file yields default preferences, an unreadable
    /// one is reported and replaced by defaults.
    pub fn open(filepath: &Path) -> Self {
        let preferences = match read_preferences(filepath) {
            Ok(preferences) => preferences,
            Err(error) => {
                warn!(%error, "Ignoring stored preferences");
                UiPreferences::default()
            }
        };
        Self {
            filepath: filepath.to_path_buf(),
            preferences,
        }
    }

    pub fn preferences(&self) -> &UiPreferences {
        &self.preferences
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    pub fn set_active_site(&mut self, site_id: Option<Id>) -> Result<()> {
        self.preferences.active_site_id = site_id;
        self.save()
    }

    pub fn set_selected_environment(&mut self, environment_id: Option<Id>) -> Result<()> {
        self.preferences.selected_environment_id = environment_id;
        self.save()
    }

    /// Write the current preferences to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent).context(errors::StateFileIo {
                filepath: parent.to_path_buf(),
            })?;
        }
        let content = serde_json::to_string_pretty(&self.preferences).context(
            errors::StateFileSerialize {
                filepath: self.filepath.clone(),
            },
        )?;
        fs::write(&self.filepath, content).context(errors::StateFileIo {
            filepath: self.filepath.clone(),
        })?;
        debug!(path = %self.filepath.display(), "Saved preferences");
        Ok(())
    }
}

fn read_preferences(filepath: &Path) -> Result<UiPreferences> {
    match fs::read_to_string(filepath) {
        Ok(content) => serde_json::from_str(&content).context(errors::StateFileParse {
            filepath: filepath.to_path_buf(),
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(UiPreferences::default()),
        Err(source) => Err(source).context(errors::StateFileIo {
            filepath: filepath.to_path_buf(),
        }),
    }
}
