//! Client directory
//!
//! Key-value store of customers keyed by their 11-digit identifier, plus the
//! score tier table and the limit request ledger.

use crate::error::OrchestrationError;
use crate::models::{Customer, LimitRequest};
use crate::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

pub mod file;
pub use file::FileClientDirectory;

/// One row of the score tier table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreTier {
    pub min_score: f64,
    pub max_limit: f64,
}

pub fn default_score_tiers() -> Vec<ScoreTier> {
    [(0.0, 1_000.0), (300.0, 3_000.0), (500.0, 8_000.0), (700.0, 20_000.0), (850.0, 50_000.0)]
        .into_iter()
        .map(|(min_score, max_limit)| ScoreTier { min_score, max_limit })
        .collect()
}

/// Everything a directory holds; also the on-disk JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryData {
    pub customers: Vec<Customer>,
    #[serde(default = "default_score_tiers")]
    pub score_tiers: Vec<ScoreTier>,
    #[serde(default)]
    pub limit_requests: Vec<LimitRequest>,
}

impl DirectoryData {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self {
            customers,
            score_tiers: default_score_tiers(),
            limit_requests: Vec::new(),
        }
    }

    pub fn find(&self, customer_id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == customer_id)
    }

    fn find_mut(&mut self, customer_id: &str) -> Result<&mut Customer> {
        self.customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .ok_or_else(|| OrchestrationError::CustomerNotFound(customer_id.to_string()))
    }

    /// Two-factor match on id and birthdate.
    pub fn authenticate(&self, customer_id: &str, birthdate: NaiveDate) -> Option<Customer> {
        self.find(customer_id)
            .filter(|c| c.birthdate == birthdate)
            .cloned()
    }

    /// The tier with the highest `min_score` not above `score`.
    pub fn max_limit_for_score(&self, score: f64) -> Option<f64> {
        self.score_tiers
            .iter()
            .filter(|tier| tier.min_score <= score)
            .max_by(|a, b| a.min_score.total_cmp(&b.min_score))
            .map(|tier| tier.max_limit)
    }

    pub fn set_limit(&mut self, customer_id: &str, new_limit: f64) -> Result<()> {
        self.find_mut(customer_id)?.credit_limit = new_limit;
        Ok(())
    }

    pub fn set_score(&mut self, customer_id: &str, new_score: f64) -> Result<()> {
        self.find_mut(customer_id)?.credit_score = new_score;
        Ok(())
    }
}

/// Trait for customer lookup and updates
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn authenticate(&self, customer_id: &str, birthdate: NaiveDate) -> Result<Option<Customer>>;

    async fn get_by_id(&self, customer_id: &str) -> Result<Option<Customer>>;

    /// `None` when no tier covers the score.
    async fn max_limit_for_score(&self, score: f64) -> Result<Option<f64>>;

    async fn update_limit(&self, customer_id: &str, new_limit: f64) -> Result<()>;

    async fn update_score(&self, customer_id: &str, new_score: f64) -> Result<()>;

    async fn record_limit_request(&self, request: LimitRequest) -> Result<()>;
}

/// In-memory directory for development & testing
pub struct InMemoryClientDirectory {
    data: Arc<RwLock<DirectoryData>>,
}

impl InMemoryClientDirectory {
    pub fn new(data: DirectoryData) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }

    pub fn with_customers(customers: Vec<Customer>) -> Self {
        Self::new(DirectoryData::new(customers))
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> DirectoryData {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl ClientDirectory for InMemoryClientDirectory {
    async fn authenticate(&self, customer_id: &str, birthdate: NaiveDate) -> Result<Option<Customer>> {
        let data = self.data.read().await;
        Ok(data.authenticate(customer_id, birthdate))
    }

    async fn get_by_id(&self, customer_id: &str) -> Result<Option<Customer>> {
        let data = self.data.read().await;
        Ok(data.find(customer_id).cloned())
    }

    async fn max_limit_for_score(&self, score: f64) -> Result<Option<f64>> {
        let data = self.data.read().await;
        Ok(data.max_limit_for_score(score))
    }

    async fn update_limit(&self, customer_id: &str, new_limit: f64) -> Result<()> {
        let mut data = self.data.write().await;
        data.set_limit(customer_id, new_limit)?;
        info!(customer_id = %customer_id, new_limit, "Credit limit updated");
        Ok(())
    }

    async fn update_score(&self, customer_id: &str, new_score: f64) -> Result<()> {
        let mut data = self.data.write().await;
        data.set_score(customer_id, new_score)?;
        info!(customer_id = %customer_id, new_score, "Credit score updated");
        Ok(())
    }

    async fn record_limit_request(&self, request: LimitRequest) -> Result<()> {
        let mut data = self.data.write().await;
        data.limit_requests.push(request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LimitRequestStatus;
    use chrono::Utc;

    fn customer() -> Customer {
        Customer {
            id: "12345678901".to_string(),
            name: "Ana Souza".to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 5, 15).unwrap(),
            credit_limit: 5000.0,
            credit_score: 750.0,
        }
    }

    #[test]
    fn test_tier_lookup_picks_highest_min_score_not_above() {
        let data = DirectoryData::new(vec![]);
        assert_eq!(data.max_limit_for_score(750.0), Some(20_000.0));
        assert_eq!(data.max_limit_for_score(700.0), Some(20_000.0));
        assert_eq!(data.max_limit_for_score(699.99), Some(8_000.0));
        assert_eq!(data.max_limit_for_score(0.0), Some(1_000.0));
        assert_eq!(data.max_limit_for_score(1000.0), Some(50_000.0));
        assert_eq!(data.max_limit_for_score(-1.0), None);
    }

    #[tokio::test]
    async fn test_authenticate_requires_both_factors() {
        let directory = InMemoryClientDirectory::with_customers(vec![customer()]);
        let right = NaiveDate::from_ymd_opt(1990, 5, 15).unwrap();
        let wrong = NaiveDate::from_ymd_opt(1990, 5, 16).unwrap();

        assert!(directory.authenticate("12345678901", right).await.unwrap().is_some());
        assert!(directory.authenticate("12345678901", wrong).await.unwrap().is_none());
        assert!(directory.authenticate("00000000000", right).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_updates_and_ledger() {
        let directory = InMemoryClientDirectory::with_customers(vec![customer()]);

        directory.update_limit("12345678901", 8000.0).await.unwrap();
        directory.update_score("12345678901", 780.5).await.unwrap();
        directory
            .record_limit_request(LimitRequest {
                customer_id: "12345678901".to_string(),
                requested_at: Utc::now(),
                current_limit: 5000.0,
                requested_limit: 8000.0,
                status: LimitRequestStatus::Approved,
            })
            .await
            .unwrap();

        let updated = directory.get_by_id("12345678901").await.unwrap().unwrap();
        assert_eq!(updated.credit_limit, 8000.0);
        assert_eq!(updated.credit_score, 780.5);
        assert_eq!(directory.snapshot().await.limit_requests.len(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_customer_fails() {
        let directory = InMemoryClientDirectory::with_customers(vec![]);
        let result = directory.update_limit("99999999999", 1000.0).await;
        assert!(matches!(result, Err(OrchestrationError::CustomerNotFound(_))));
    }
}
