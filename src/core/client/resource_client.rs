use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::DynamicObject;
use crate::core::mapping::rest_mapping::Mapping;
use crate::core::mapping::schema::GroupVersion;
use crate::errors::ResourceError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub label_selector: String,
    pub field_selector: String,
    /// Page size; `None` asks for everything at once.
    pub limit: Option<u32>,
    pub continue_token: Option<String>,
}

/// One page of a list call.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<DynamicObject>,
    pub resource_version: Option<String>,
    pub continue_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRequest {
    pub label_selector: String,
    pub field_selector: String,
    pub resource_version: String,
}

pub type WatchStream = BoxStream<'static, Result<WatchEvent<DynamicObject>, ResourceError>>;

/// Wire client bound to one API group/version.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(
        &self,
        mapping: &Mapping,
        namespace: &str,
        name: &str,
        subresource: Option<&str>,
    ) -> Result<DynamicObject, ResourceError>;

    async fn list(&self, mapping: &Mapping, namespace: &str, request: &ListRequest) -> Result<ListPage, ResourceError>;

    async fn watch(&self, mapping: &Mapping, namespace: &str, request: &WatchRequest) -> Result<WatchStream, ResourceError>;
}

impl fmt::Debug for dyn ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResourceClient")
    }
}

/// Hands out the client serving a group/version.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, gv: &GroupVersion) -> Result<Arc<dyn ResourceClient>, ResourceError>;
}

/// `ResourceClient` backed by dynamic kube-rs `Api` handles.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, mapping: &Mapping, namespace: &str) -> Api<DynamicObject> {
        let ar = mapping.api_resource();
        if mapping.is_namespaced() && !namespace.is_empty() {
            Api::namespaced_with(self.client.clone(), namespace, &ar)
        } else {
            Api::all_with(self.client.clone(), &ar)
        }
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(
        &self,
        mapping: &Mapping,
        namespace: &str,
        name: &str,
        subresource: Option<&str>,
    ) -> Result<DynamicObject, ResourceError> {
        let api = self.api(mapping, namespace);
        let obj = match subresource {
            Some(sub) if !sub.is_empty() => api.get_subresource(sub, name).await?,
            _ => api.get(name).await?,
        };

        debug!("Fetched {} {}/{}", mapping.resource_name(), namespace, name);
        Ok(obj)
    }

    async fn list(&self, mapping: &Mapping, namespace: &str, request: &ListRequest) -> Result<ListPage, ResourceError> {
        let api = self.api(mapping, namespace);
        let mut lp = ListParams::default();
        if !request.label_selector.is_empty() {
            lp = lp.labels(&request.label_selector);
        }
        if !request.field_selector.is_empty() {
            lp = lp.fields(&request.field_selector);
        }
        if let Some(limit) = request.limit {
            lp = lp.limit(limit);
        }
        if let Some(token) = request.continue_token.as_deref() {
            lp = lp.continue_token(token);
        }

        let list = api.list(&lp).await?;
        debug!("Listed {} {}(s) in '{}'", list.items.len(), mapping.resource_name(), namespace);
        Ok(ListPage {
            items: list.items,
            resource_version: list.metadata.resource_version,
            continue_token: list.metadata.continue_.filter(|t| !t.is_empty()),
        })
    }

    async fn watch(&self, mapping: &Mapping, namespace: &str, request: &WatchRequest) -> Result<WatchStream, ResourceError> {
        let api = self.api(mapping, namespace);
        let mut wp = WatchParams::default();
        if !request.label_selector.is_empty() {
            wp = wp.labels(&request.label_selector);
        }
        if !request.field_selector.is_empty() {
            wp = wp.fields(&request.field_selector);
        }

        let version = if request.resource_version.is_empty() {
            "0"
        } else {
            request.resource_version.as_str()
        };
        debug!("Watching {} in '{}' from {}", mapping.resource_name(), namespace, version);
        let stream = api.watch(&wp, version).await?;
        Ok(stream.map_err(ResourceError::from).boxed())
    }
}

/// Every group/version shares one kube-rs client.
#[derive(Clone)]
pub struct KubeClientFactory {
    client: Client,
}

impl KubeClientFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl ClientFactory for KubeClientFactory {
    fn client_for(&self, gv: &GroupVersion) -> Result<Arc<dyn ResourceClient>, ResourceError> {
        debug!("Client requested for {}", gv);
        Ok(Arc::new(KubeResourceClient::new(self.client.clone())))
    }
}
