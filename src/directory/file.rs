//! JSON flat-file client directory
//!
//! The whole document is loaded once and rewritten after every mutation.
//! No durability beyond that overwrite.

use super::{ClientDirectory, DirectoryData};
use crate::error::OrchestrationError;
use crate::models::{Customer, LimitRequest};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct FileClientDirectory {
    path: PathBuf,
    data: RwLock<DirectoryData>,
}

impl FileClientDirectory {
    /// Load the directory document at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            OrchestrationError::DirectoryError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let data: DirectoryData = serde_json::from_str(&raw)?;

        info!(
            path = %path.display(),
            customers = data.customers.len(),
            tiers = data.score_tiers.len(),
            "Client directory loaded"
        );

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &DirectoryData) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Failed to write client directory");
            OrchestrationError::DirectoryError(format!("cannot write {}: {}", self.path.display(), e))
        })
    }

    /// Apply `change` to a copy of the document and swap it in only once the
    /// copy is on disk. A failed write leaves memory untouched.
    async fn commit(&self, change: impl FnOnce(&mut DirectoryData) -> Result<()>) -> Result<()> {
        let mut data = self.data.write().await;
        let mut next = data.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *data = next;
        Ok(())
    }
}

#[async_trait]
impl ClientDirectory for FileClientDirectory {
    async fn authenticate(&self, customer_id: &str, birthdate: NaiveDate) -> Result<Option<Customer>> {
        Ok(self.data.read().await.authenticate(customer_id, birthdate))
    }

    async fn get_by_id(&self, customer_id: &str) -> Result<Option<Customer>> {
        Ok(self.data.read().await.find(customer_id).cloned())
    }

    async fn max_limit_for_score(&self, score: f64) -> Result<Option<f64>> {
        Ok(self.data.read().await.max_limit_for_score(score))
    }

    async fn update_limit(&self, customer_id: &str, new_limit: f64) -> Result<()> {
        self.commit(|data| data.set_limit(customer_id, new_limit)).await?;
        info!(customer_id = %customer_id, new_limit, "Credit limit persisted");
        Ok(())
    }

    async fn update_score(&self, customer_id: &str, new_score: f64) -> Result<()> {
        self.commit(|data| data.set_score(customer_id, new_score)).await?;
        info!(customer_id = %customer_id, new_score, "Credit score persisted");
        Ok(())
    }

    async fn record_limit_request(&self, request: LimitRequest) -> Result<()> {
        self.commit(|data| {
            data.limit_requests.push(request);
            Ok(())
        })
        .await
    }
}
