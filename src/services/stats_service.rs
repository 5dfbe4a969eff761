//! Aggregate review statistics.

use crate::error::AppError;
use crate::models::StatsResponse;
use crate::store::{bounded, PrStore};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct StatsService {
    prs: Arc<dyn PrStore>,
    store_timeout: Duration,
}

impl StatsService {
    pub fn new(prs: Arc<dyn PrStore>, store_timeout: Duration) -> Self {
        Self { prs, store_timeout }
    }

    pub async fn get_stats(&self) -> Result<StatsResponse, AppError> {
        let limit = self.store_timeout;
        let fail = |operation: &str, e: crate::store::StoreError| {
            log::error!("[stats] {} failed: {}", operation, e);
            AppError::from(e)
        };

        let total_prs_created = bounded(limit, "total_count", self.prs.total_count())
            .await
            .map_err(|e| fail("total_count", e))?;
        let reviews_by_user = bounded(limit, "review_counts", self.prs.review_counts())
            .await
            .map_err(|e| fail("review_counts", e))?;

        Ok(StatsResponse {
            total_prs_created,
            reviews_by_user,
        })
    }
}
