use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::sync::Mutex;

use crate::chain::ChainTable;
use crate::error::RoundingError;
use crate::scheduler::{self, RoundingContext, RoundingOutcome};
use crate::schema::{Catalog, Service};

/// Shared owner of active services.
///
/// Each service sits behind its own lock, so rounding one stay never waits
/// on another. Callers that read a service before deciding to round pass the
/// version they saw; if someone else committed in between the call fails
/// with `VersionConflict` instead of applying a second increment.
pub struct ServiceLedger {
    catalog: Arc<Catalog>,
    chains: Arc<ChainTable>,
    services: Mutex<HashMap<String, Arc<Mutex<Service>>>>,
}

impl ServiceLedger {
    pub fn new(catalog: Arc<Catalog>, chains: Arc<ChainTable>) -> Self {
        Self {
            catalog,
            chains,
            services: Mutex::new(HashMap::new()),
        }
    }

    pub async fn insert(&self, service: Service) {
        self.services
            .lock()
            .await
            .insert(service.id.clone(), Arc::new(Mutex::new(service)));
    }

    pub async fn snapshot(&self, service_id: &str) -> Result<Service, RoundingError> {
        let entry = self.entry(service_id).await?;
        let service = entry.lock().await;
        Ok(service.clone())
    }

    pub async fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn entry(&self, service_id: &str) -> Result<Arc<Mutex<Service>>, RoundingError> {
        self.services
            .lock()
            .await
            .get(service_id)
            .cloned()
            .ok_or_else(|| RoundingError::UnknownService(service_id.to_string()))
    }

    /// Round one service. Returns the outcome and the service's version after it.
    pub async fn round(
        &self,
        service_id: &str,
        expected_version: Option<u64>,
        today: NaiveDate,
    ) -> Result<(RoundingOutcome, u64), RoundingError> {
        let entry = self.entry(service_id).await?;
        let mut service = entry.lock().await;
        check_version(&service, expected_version)?;

        let ctx = RoundingContext::new(&self.catalog, &self.chains);
        let outcome = scheduler::round(&ctx, &mut service, today)?;
        Ok((outcome, service.version))
    }

    pub async fn discharge(
        &self,
        service_id: &str,
        expected_version: Option<u64>,
        requested: NaiveDate,
    ) -> Result<(NaiveDate, u64), RoundingError> {
        let entry = self.entry(service_id).await?;
        let mut service = entry.lock().await;
        check_version(&service, expected_version)?;

        let end = scheduler::discharge(&self.catalog, &mut service, requested)?;
        Ok((end, service.version))
    }

    /// Daily pass over every service still in hospital. Discharged services
    /// are skipped; failures are reported per service.
    pub async fn round_all(
        &self,
        today: NaiveDate,
    ) -> Vec<(String, Result<RoundingOutcome, RoundingError>)> {
        let entries: Vec<(String, Arc<Mutex<Service>>)> = {
            let services = self.services.lock().await;
            let mut entries: Vec<_> = services
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            entries
        };

        let rounds = entries.into_iter().map(|(id, entry)| async move {
            let mut service = entry.lock().await;
            if !service.is_active(&self.catalog) {
                return None;
            }
            let ctx = RoundingContext::new(&self.catalog, &self.chains);
            Some((id, scheduler::round(&ctx, &mut service, today)))
        });

        join_all(rounds).await.into_iter().flatten().collect()
    }
}

fn check_version(service: &Service, expected: Option<u64>) -> Result<(), RoundingError> {
    match expected {
        Some(expected) if expected != service.version => Err(RoundingError::VersionConflict {
            service_id: service.id.clone(),
            expected,
            found: service.version,
        }),
        _ => Ok(()),
    }
}
