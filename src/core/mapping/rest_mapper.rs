use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::mapping::catalog::Catalog;
use crate::core::mapping::rest_mapping::Mapping;
use crate::core::mapping::schema::{GroupKind, GroupVersionKind, GroupVersionResource};
use crate::errors::ResourceError;

/// Resolves type references against the server's published resource types.
#[async_trait]
pub trait RestMapper: Send + Sync {
    /// Kind served for a (possibly partial) resource coordinate.
    async fn kind_for(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, ResourceError>;

    /// Mapping of a kind, in `version` or in the group's preferred version.
    async fn rest_mapping(&self, gk: &GroupKind, version: Option<&str>) -> Result<Mapping, ResourceError>;
}

/// Anything able to produce the full type catalog.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load(&self) -> Result<Arc<Catalog>, ResourceError>;
}

#[async_trait]
impl CatalogSource for Catalog {
    async fn load(&self) -> Result<Arc<Catalog>, ResourceError> {
        Ok(Arc::new(self.clone()))
    }
}

/// Loads the catalog on first use, then answers from memory.
pub struct DeferredRestMapper {
    source: Arc<dyn CatalogSource>,
    catalog: Mutex<Option<Arc<Catalog>>>,
}

impl DeferredRestMapper {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            catalog: Mutex::new(None),
        }
    }

    pub async fn catalog(&self) -> Result<Arc<Catalog>, ResourceError> {
        let mut guard = self.catalog.lock().await;
        if let Some(catalog) = guard.as_ref() {
            return Ok(catalog.clone());
        }
        let catalog = self.source.load().await?;
        info!("Loaded type catalog with {} resource type(s)", catalog.entries().len());
        *guard = Some(catalog.clone());
        Ok(catalog)
    }

    /// Drops the cached catalog so the next lookup reloads it.
    pub async fn reset(&self) {
        *self.catalog.lock().await = None;
    }
}

#[async_trait]
impl CatalogSource for DeferredRestMapper {
    async fn load(&self) -> Result<Arc<Catalog>, ResourceError> {
        self.catalog().await
    }
}

#[async_trait]
impl RestMapper for DeferredRestMapper {
    async fn kind_for(&self, gvr: &GroupVersionResource) -> Result<GroupVersionKind, ResourceError> {
        self.catalog().await?.kind_for(gvr)
    }

    async fn rest_mapping(&self, gk: &GroupKind, version: Option<&str>) -> Result<Mapping, ResourceError> {
        self.catalog().await?.rest_mapping(gk, version)
    }
}
