//! In-memory stand-ins for the cluster, shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::client::kube_resources::{DynamicObject, ObjectMeta, TypeMeta};
use crate::core::client::resource_client::{
    ClientFactory, ListPage, ListRequest, ResourceClient, WatchRequest, WatchStream,
};
use crate::core::mapping::catalog::{Catalog, CatalogEntry};
use crate::core::mapping::rest_mapper::{CatalogSource, DeferredRestMapper};
use crate::core::mapping::rest_mapping::Mapping;
use crate::core::mapping::schema::GroupVersion;
use crate::domain::resource::info_mapper::InfoMapper;
use crate::errors::ResourceError;

pub fn init_test_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_target(true)
        .with_test_writer()
        .try_init();
}

pub fn fake_catalog() -> Catalog {
    Catalog::new(vec![
        CatalogEntry::namespaced("", "v1", "Pod", "pods")
            .short_names(&["po"])
            .categories(&["all"]),
        CatalogEntry::namespaced("", "v1", "Service", "services")
            .short_names(&["svc"])
            .categories(&["all"]),
        CatalogEntry::cluster("", "v1", "Node", "nodes").short_names(&["no"]),
        CatalogEntry::namespaced("apps", "v1", "Deployment", "deployments")
            .short_names(&["deploy"])
            .categories(&["all"]),
        CatalogEntry::namespaced("", "v1", "ConfigMap", "configmaps").short_names(&["cm"]),
        CatalogEntry::cluster("", "v1", "Namespace", "namespaces").short_names(&["ns"]),
    ])
}

/// Mapping of a resource in [`fake_catalog`].
pub fn mapping_of(resource: &str) -> Mapping {
    fake_catalog()
        .entries()
        .iter()
        .find(|e| e.plural == resource)
        .map(|e| e.mapping())
        .unwrap_or_else(|| panic!("{resource} is not in the fake catalog"))
}

pub fn pod(name: &str, namespace: &str, resource_version: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: "v1".into(),
            kind: "Pod".into(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
            resource_version: Some(resource_version.to_string()),
            ..ObjectMeta::default()
        },
        data: json!({}),
    }
}

/// Mapper over [`fake_catalog`] whose clients are all the returned fake.
pub fn fake_mapper() -> (InfoMapper, Arc<FakeResourceClient>) {
    let client = Arc::new(FakeResourceClient::new());
    let rest_mapper = Arc::new(DeferredRestMapper::new(Arc::new(fake_catalog())));
    let mapper = InfoMapper::new(rest_mapper, Arc::new(FakeClientFactory::new(client.clone())));
    (mapper, client)
}

fn not_found(resource: &str, name: &str) -> ResourceError {
    let status = serde_json::from_value(json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": format!("{resource} {name:?} not found"),
        "reason": "NotFound",
        "code": 404
    }))
    .expect("valid status body");
    ResourceError::Kube(Arc::new(kube::Error::Api(status)))
}

/// Catalog source counting how often it is loaded.
pub struct CountingCatalogSource {
    catalog: Option<Catalog>,
    loads: AtomicUsize,
}

impl CountingCatalogSource {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Some(catalog),
            loads: AtomicUsize::new(0),
        }
    }

    /// A source whose every load fails like an unreachable server.
    pub fn failing() -> Self {
        Self {
            catalog: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for CountingCatalogSource {
    async fn load(&self) -> Result<Arc<Catalog>, ResourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.catalog {
            Some(catalog) => Ok(Arc::new(catalog.clone())),
            None => Err(ResourceError::Usage("discovery unavailable: connection refused".into())),
        }
    }
}

/// Serves a fixed set of objects and records the calls made to it.
#[derive(Default)]
pub struct FakeResourceClient {
    objects: Vec<DynamicObject>,
    fail_lists: bool,
    gets: AtomicUsize,
    lists: AtomicUsize,
    last_list: Mutex<Option<ListRequest>>,
}

impl FakeResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, namespace: &str, mut obj: DynamicObject) -> Self {
        obj.metadata.namespace = (!namespace.is_empty()).then(|| namespace.to_string());
        self.objects.push(obj);
        self
    }

    /// Every list call answers 404.
    pub fn failing_lists(mut self) -> Self {
        self.fail_lists = true;
        self
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn last_list(&self) -> Option<ListRequest> {
        self.last_list.lock().ok().and_then(|last| last.clone())
    }

    fn of_kind<'a>(&'a self, mapping: &'a Mapping, namespace: &'a str) -> impl Iterator<Item = &'a DynamicObject> {
        self.objects.iter().filter(move |o| {
            o.types.as_ref().is_some_and(|t| t.kind == mapping.gvk.kind)
                && (namespace.is_empty() || o.metadata.namespace.as_deref() == Some(namespace))
        })
    }
}

#[async_trait]
impl ResourceClient for FakeResourceClient {
    async fn get(
        &self,
        mapping: &Mapping,
        namespace: &str,
        name: &str,
        _subresource: Option<&str>,
    ) -> Result<DynamicObject, ResourceError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.of_kind(mapping, namespace)
            .find(|o| o.metadata.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| not_found(&mapping.resource_name(), name))
    }

    async fn list(&self, mapping: &Mapping, namespace: &str, request: &ListRequest) -> Result<ListPage, ResourceError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_list.lock() {
            *last = Some(request.clone());
        }
        if self.fail_lists {
            return Err(not_found(&mapping.resource_name(), ""));
        }

        let matching: Vec<DynamicObject> = self.of_kind(mapping, namespace).cloned().collect();
        let offset: usize = request
            .continue_token
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);
        let limit = request.limit.map_or(matching.len(), |l| l as usize);
        let end = (offset + limit).min(matching.len());

        Ok(ListPage {
            items: matching[offset..end].to_vec(),
            resource_version: Some("100".into()),
            continue_token: (end < matching.len()).then(|| end.to_string()),
        })
    }

    async fn watch(&self, _mapping: &Mapping, _namespace: &str, _request: &WatchRequest) -> Result<WatchStream, ResourceError> {
        Ok(futures::stream::empty().boxed())
    }
}

/// Hands out one shared client and counts the requests.
pub struct FakeClientFactory {
    client: Arc<FakeResourceClient>,
    calls: AtomicUsize,
}

impl FakeClientFactory {
    pub fn new(client: Arc<FakeResourceClient>) -> Self {
        Self {
            client,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClientFactory for FakeClientFactory {
    fn client_for(&self, _gv: &GroupVersion) -> Result<Arc<dyn ResourceClient>, ResourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.client.clone())
    }
}
