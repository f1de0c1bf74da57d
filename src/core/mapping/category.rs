use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::core::mapping::rest_mapper::CatalogSource;
use crate::core::mapping::schema::GroupResource;
use crate::errors::ResourceError;

/// Expands a category name such as `all` into the resources it groups.
pub trait CategoryExpander: Send + Sync {
    fn expand(&self, category: &str) -> Option<Vec<GroupResource>>;
}

/// Builder-owned cache: the expander is obtained from its source on first use
/// and reused for the rest of the resolution.
pub struct CachingCategoryExpander {
    source: Arc<dyn CatalogSource>,
    cached: Mutex<Option<Arc<dyn CategoryExpander>>>,
}

impl CachingCategoryExpander {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
        }
    }

    pub async fn expander(&self) -> Result<Arc<dyn CategoryExpander>, ResourceError> {
        let mut cached = self.cached.lock().await;
        if let Some(expander) = cached.as_ref() {
            return Ok(expander.clone());
        }
        let catalog = self.source.load().await?;
        debug!("Category expander loaded ({} type(s))", catalog.entries().len());
        let expander: Arc<dyn CategoryExpander> = catalog;
        *cached = Some(expander.clone());
        Ok(expander)
    }

    /// Replaces every comma separated token that names a category with the
    /// `resource[.group]` list it expands to. Other tokens are kept as is.
    pub async fn replace_aliases(&self, input: &str) -> Result<String, ResourceError> {
        let expander = self.expander().await?;
        let replaced: Vec<String> = input
            .split(',')
            .map(|arg| match expander.expand(arg) {
                Some(resources) => resources
                    .iter()
                    .map(|gr| gr.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
                None => arg.to_string(),
            })
            .collect();
        Ok(replaced.join(","))
    }
}
