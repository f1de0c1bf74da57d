use std::sync::Arc;

use tracing::debug;

use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::resource_client::{ResourceClient, WatchRequest, WatchStream};
use crate::core::decode::manifest_decoder::is_list;
use crate::core::mapping::rest_mapping::{Mapping, Scope};
use crate::core::mapping::schema::{GroupVersionKind, GroupVersionResource};
use crate::errors::ResourceError;

/// Handle on one remote object: where it lives, how to reach it and, once
/// fetched or decoded, its body.
#[derive(Debug, Clone, Default)]
pub struct Info {
    pub client: Option<Arc<dyn ResourceClient>>,
    pub mapping: Option<Mapping>,
    pub namespace: String,
    pub name: String,
    pub subresource: String,
    /// Where the object was read from (file path, URL, stream label).
    pub source: String,
    pub object: Option<DynamicObject>,
    pub resource_version: String,
}

impl Info {
    /// Addressable object without a body yet.
    pub fn by_name(client: Arc<dyn ResourceClient>, mapping: Mapping, namespace: &str, name: &str) -> Self {
        Self {
            client: Some(client),
            mapping: Some(mapping),
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Builds an Info around an object body, taking identity from its metadata.
    pub fn from_object(obj: DynamicObject, source: &str) -> Self {
        Self {
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            name: obj.metadata.name.clone().unwrap_or_default(),
            resource_version: obj.metadata.resource_version.clone().unwrap_or_default(),
            source: source.to_string(),
            object: Some(obj),
            ..Self::default()
        }
    }

    pub fn with_subresource(mut self, subresource: &str) -> Self {
        self.subresource = subresource.to_string();
        self
    }

    /// With a mapping the scope decides; without one a namespace is taken as
    /// evidence the object is namespaced.
    pub fn namespaced(&self) -> bool {
        match &self.mapping {
            Some(mapping) => mapping.scope == Scope::Namespaced,
            None => !self.namespace.is_empty(),
        }
    }

    /// `resource[.group]/name`, or `kind/name` when no mapping is known.
    pub fn object_name(&self) -> String {
        if let Some(mapping) = &self.mapping {
            return format!("{}/{}", mapping.resource_name(), self.name);
        }
        match self.object.as_ref().and_then(|o| o.types.as_ref()) {
            Some(types) => format!("{}/{}", types.kind.to_lowercase(), self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_list(&self) -> bool {
        self.object.as_ref().is_some_and(is_list)
    }

    pub fn resource(&self) -> Option<&GroupVersionResource> {
        self.mapping.as_ref().map(|m| &m.resource)
    }

    pub fn gvk(&self) -> Option<&GroupVersionKind> {
        self.mapping.as_ref().map(|m| &m.gvk)
    }

    /// Copies `namespace` into the object body, if there is one.
    pub fn update_object_namespace(&mut self) {
        if let Some(obj) = self.object.as_mut() {
            obj.metadata.namespace = if self.namespace.is_empty() {
                None
            } else {
                Some(self.namespace.clone())
            };
        }
    }

    /// Fetches the object from the server and stores it.
    ///
    /// A 404 inside a namespace other than `default` is re-checked against the
    /// namespace itself, so a missing namespace is reported as such.
    pub async fn get(&mut self) -> Result<(), ResourceError> {
        let (client, mapping) = self.remote()?;
        let subresource = (!self.subresource.is_empty()).then_some(self.subresource.as_str());

        match client.get(&mapping, &self.namespace, &self.name, subresource).await {
            Ok(obj) => {
                self.resource_version = obj.metadata.resource_version.clone().unwrap_or_default();
                self.object = Some(obj);
                Ok(())
            }
            Err(err) if err.is_not_found() && !self.namespace.is_empty() && self.namespace != "default" => {
                match client.get(&namespace_mapping(), "", &self.namespace, None).await {
                    Err(ns_err) if ns_err.is_not_found() => {
                        debug!("Namespace '{}' does not exist", self.namespace);
                        Err(ns_err)
                    }
                    _ => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Replaces the body with `obj`, adopting its identity. Unless
    /// `ignore_error` is set, a body without a name is rejected.
    pub fn refresh(&mut self, obj: DynamicObject, ignore_error: bool) -> Result<(), ResourceError> {
        match obj.metadata.name.as_deref() {
            Some(name) => self.name = name.to_string(),
            None if !ignore_error => {
                return Err(ResourceError::Decode {
                    source_name: self.source.clone(),
                    message: "object has no metadata.name".into(),
                })
            }
            None => {}
        }
        self.namespace = obj.metadata.namespace.clone().unwrap_or_default();
        self.resource_version = obj.metadata.resource_version.clone().unwrap_or_default();
        self.object = Some(obj);
        Ok(())
    }

    /// Watches this single object from `resource_version`.
    pub async fn watch(&self, resource_version: &str) -> Result<WatchStream, ResourceError> {
        let (client, mapping) = self.remote()?;
        let request = WatchRequest {
            field_selector: format!("metadata.name={}", self.name),
            resource_version: resource_version.to_string(),
            ..WatchRequest::default()
        };
        client.watch(&mapping, &self.namespace, &request).await
    }

    fn remote(&self) -> Result<(Arc<dyn ResourceClient>, Mapping), ResourceError> {
        match (&self.client, &self.mapping) {
            (Some(client), Some(mapping)) => Ok((client.clone(), mapping.clone())),
            _ => Err(ResourceError::Usage(format!(
                "{} has no server mapping and cannot be fetched",
                self.object_name()
            ))),
        }
    }
}

fn namespace_mapping() -> Mapping {
    Mapping::new(
        GroupVersionResource::new("", "v1", "namespaces"),
        GroupVersionKind::new("", "v1", "Namespace"),
        Scope::Cluster,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mapping_of, pod, FakeResourceClient};

    #[tokio::test]
    async fn get_stores_body_and_version() {
        let client = Arc::new(FakeResourceClient::new().with_object("ns1", pod("web", "ns1", "42")));
        let mut info = Info::by_name(client.clone(), mapping_of("pods"), "ns1", "web");

        info.get().await.unwrap();
        assert_eq!(info.resource_version, "42");
        assert!(info.object.is_some());
        assert_eq!(client.gets(), 1);
    }

    #[tokio::test]
    async fn missing_namespace_is_reported_instead_of_missing_object() {
        let client = Arc::new(FakeResourceClient::new());
        let mut info = Info::by_name(client.clone(), mapping_of("pods"), "ghost", "web");

        let err = info.get().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("ghost"));
        assert_eq!(client.gets(), 2);
    }

    #[tokio::test]
    async fn info_without_mapping_cannot_be_fetched() {
        let mut info = Info::from_object(pod("web", "ns1", "1"), "pod.yaml");
        assert!(info.get().await.is_err());
    }

    #[test]
    fn namespaced_falls_back_to_namespace_presence() {
        let info = Info::from_object(pod("web", "ns1", "1"), "pod.yaml");
        assert!(info.namespaced());

        let mut cluster = Info::by_name(Arc::new(FakeResourceClient::new()), mapping_of("nodes"), "", "n1");
        cluster.namespace = "ignored".into();
        assert!(!cluster.namespaced());
    }

    #[test]
    fn refresh_adopts_the_new_identity() {
        let mut info = Info::from_object(pod("old", "ns1", "1"), "pod.yaml");
        info.refresh(pod("new", "ns2", "7"), false).unwrap();
        assert_eq!((info.name.as_str(), info.namespace.as_str()), ("new", "ns2"));
        assert_eq!(info.resource_version, "7");
    }

    #[test]
    fn update_object_namespace_writes_through() {
        let mut info = Info::from_object(pod("web", "", "1"), "pod.yaml");
        info.namespace = "team".into();
        info.update_object_namespace();
        assert_eq!(
            info.object.unwrap().metadata.namespace.as_deref(),
            Some("team")
        );
    }
}
