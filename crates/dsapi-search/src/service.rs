use crate::gateway::SearchGateway;
use dsapi_core::catalog::{self, CatalogListing, DatasetFields};
use dsapi_core::{
    parse, render, schema, Catalog, DataError, DatasetDescriptor, QueryCriteria, Registry, Result,
    SearchResult,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ties the registry, translator and gateway into the three read operations.
/// Every request works against a single registry snapshot.
#[derive(Clone)]
pub struct DataService {
    registry: Arc<Registry>,
    gateway: SearchGateway,
}

impl DataService {
    pub fn new(registry: Arc<Registry>, gateway: SearchGateway) -> Self {
        Self { registry, gateway }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn gateway(&self) -> &SearchGateway {
        &self.gateway
    }

    pub fn list(&self) -> CatalogListing {
        catalog::list(&self.registry.snapshot())
    }

    pub fn fields(&self, api_key: &str, version: &str) -> Result<DatasetFields> {
        let descriptor = self.registry.get(api_key, version)?;
        Ok(DatasetFields::from(descriptor.as_ref()))
    }

    /// Parses, validates and renders `criteria` for the gateway's backend.
    pub fn translate(&self, descriptor: &DatasetDescriptor, criteria: &str) -> Result<String> {
        let clause = parse(criteria)?;
        schema::validate_field_refs(descriptor, &clause)?;
        Ok(render(&clause, self.gateway.dialect()))
    }

    #[tracing::instrument(
        skip(self, criteria),
        fields(start = criteria.start, rows = criteria.rows)
    )]
    pub async fn records(
        &self,
        api_key: &str,
        version: &str,
        criteria: &QueryCriteria,
    ) -> Result<SearchResult> {
        let (descriptor, query) = self.prepare(api_key, version, criteria)?;
        let result = self
            .gateway
            .execute(&descriptor.backend_index_name, &query, criteria.start, criteria.rows)
            .await?;
        finish(result)
    }

    pub async fn records_cancellable(
        &self,
        api_key: &str,
        version: &str,
        criteria: &QueryCriteria,
        cancel: &CancellationToken,
    ) -> Result<SearchResult> {
        let (descriptor, query) = self.prepare(api_key, version, criteria)?;
        let result = self
            .gateway
            .execute_cancellable(
                &descriptor.backend_index_name,
                &query,
                criteria.start,
                criteria.rows,
                cancel,
            )
            .await?;
        finish(result)
    }

    /// Atomically replaces the catalog; returns the previous snapshot.
    pub fn reload(&self, catalog: Catalog) -> Arc<Catalog> {
        self.registry.replace(catalog)
    }

    fn prepare(
        &self,
        api_key: &str,
        version: &str,
        criteria: &QueryCriteria,
    ) -> Result<(Arc<DatasetDescriptor>, String)> {
        let descriptor = self.registry.get(api_key, version)?;
        let query = self.translate(&descriptor, &criteria.criteria)?;
        tracing::debug!(index = %descriptor.backend_index_name, %query, "translated criteria");
        Ok((descriptor, query))
    }
}

fn finish(result: SearchResult) -> Result<SearchResult> {
    if result.num_found == 0 {
        return Err(DataError::NoRecords);
    }
    Ok(result)
}
