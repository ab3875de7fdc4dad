use crate::common::errors::{self, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};
use tracing::{debug, info};

/// On-disk form of the token file.
#[derive(Serialize, Deserialize, Debug, Default)]
struct TokenFile {
    token: Option<String>,
}

/// Bearer token shared by every request of a client.
///
/// The token may come from the command line or the token file. Clearing it removes the file
/// as well, so an expired token is not reused by the next invocation.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
    filepath: Option<PathBuf>,
}

impl Credentials {
    /// Credentials that live only in memory.
    pub fn in_memory(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(token.filter(|t| !t.is_empty()))),
            filepath: None,
        }
    }

    /// Credentials backed by a token file. An explicit token takes precedence over the file
    /// content but is not written to it.
    pub fn load(filepath: &Path, explicit: Option<String>) -> Result<Self> {
        let stored = match explicit.filter(|t| !t.is_empty()) {
            Some(token) => Some(token),
            None => read_token_file(filepath)?,
        };
        Ok(Self {
            token: Arc::new(RwLock::new(stored)),
            filepath: Some(filepath.to_path_buf()),
        })
    }

    /// The current token, if any.
    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|token| token.clone())
    }

    /// Replace the token and persist it.
    pub fn store(&self, token: String) -> Result<()> {
        if let Some(filepath) = &self.filepath {
            write_token_file(filepath, Some(token.clone()))?;
            info!(path = %filepath.display(), "Stored API token");
        }
        if let Ok(mut current) = self.token.write() {
            *current = Some(token);
        }
        Ok(())
    }

    /// Forget the token in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        if let Ok(mut current) = self.token.write() {
            *current = None;
        }
        if let Some(filepath) = &self.filepath {
            match fs::remove_file(filepath) {
                Ok(()) => debug!(path = %filepath.display(), "Removed API token"),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(source).context(errors::StateFileIo {
                        filepath: filepath.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

fn read_token_file(filepath: &Path) -> Result<Option<String>> {
    let content = match fs::read_to_string(filepath) {
        Ok(content) => content,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(source).context(errors::StateFileIo {
                filepath: filepath.to_path_buf(),
            })
        }
    };
    let file: TokenFile = serde_json::from_str(&content).context(errors::StateFileParse {
        filepath: filepath.to_path_buf(),
    })?;
    Ok(file.token.filter(|t| !t.is_empty()))
}

fn write_token_file(filepath: &Path, token: Option<String>) -> Result<()> {
    if let Some(parent) = filepath.parent() {
        fs::create_dir_all(parent).context(errors::StateFileIo {
            filepath: parent.to_path_buf(),
        })?;
    }
    let content =
        serde_json::to_string_pretty(&TokenFile { token }).context(errors::StateFileSerialize {
            filepath: filepath.to_path_buf(),
        })?;
    fs::write(filepath, content).context(errors::StateFileIo {
        filepath: filepath.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::Credentials;

    #[test]
    fn stored_token_survives_reload_and_clear_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");

        let credentials = Credentials::load(&path, None).unwrap();
        assert_eq!(credentials.token(), None);
        credentials.store("secret".to_string()).unwrap();

        let reloaded = Credentials::load(&path, None).unwrap();
        assert_eq!(reloaded.token().as_deref(), Some("secret"));

        reloaded.clear().unwrap();
        assert_eq!(reloaded.token(), None);
        assert!(!path.exists());
        assert_eq!(Credentials::load(&path, None).unwrap().token(), None);
    }

    #[test]
    fn explicit_token_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        Credentials::load(&path, None)
            .unwrap()
            .store("stored".to_string())
            .unwrap();

        let credentials = Credentials::load(&path, Some("flag".to_string())).unwrap();
        assert_eq!(credentials.token().as_deref(), Some("flag"));
    }
}
