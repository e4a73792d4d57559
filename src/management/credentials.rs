use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{config, error::CredentialError};

/// Layout templates for the download tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingTemplates {
    pub path: String,
    pub album_name: String,
    pub disc_path: String,
    pub file_name: String,
}

impl Default for NamingTemplates {
    fn default() -> Self {
        Self {
            path: "%artist%/%albumName%".to_string(),
            album_name: "%album% (%type%)".to_string(),
            disc_path: "%path%/Disc %disc%".to_string(),
            file_name: "%number% %title%".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub arl: Option<String>,
    #[serde(default)]
    pub naming: NamingTemplates,
}

/// Persisted session secret and naming templates (`dzload/config.json`).
pub struct CredentialStore {
    path: PathBuf,
    data: StoredCredentials,
}

impl CredentialStore {
    /// Loads the store from the default location. A missing file yields an
    /// empty store.
    pub async fn load() -> Result<Self, CredentialError> {
        Self::load_from(Self::default_path()).await
    }

    pub async fn load_from(path: PathBuf) -> Result<Self, CredentialError> {
        let data = match async_fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredCredentials::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, data })
    }

    pub async fn persist(&self) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.data)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn arl(&self) -> Option<&str> {
        self.data
            .arl
            .as_deref()
            .filter(|arl| !arl.trim().is_empty())
    }

    pub fn set_arl(&mut self, arl: Option<String>) {
        self.data.arl = arl;
    }

    pub fn naming(&self) -> &NamingTemplates {
        &self.data.naming
    }

    fn default_path() -> PathBuf {
        config::app_dir().join("config.json")
    }
}
