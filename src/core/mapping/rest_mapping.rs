use kube::core::ApiResource;

use super::schema::{GroupVersionKind, GroupVersionResource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// The resolved description of one resource type: where it is served and
/// whether its objects live inside a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mapping {
    pub resource: GroupVersionResource,
    pub gvk: GroupVersionKind,
    pub scope: Scope,
}

impl Mapping {
    pub fn new(resource: GroupVersionResource, gvk: GroupVersionKind, scope: Scope) -> Self {
        Self { resource, gvk, scope }
    }

    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// The kube-rs view of this mapping, used to build dynamic `Api` handles.
    pub fn api_resource(&self) -> ApiResource {
        let gvk = kube::core::GroupVersionKind::gvk(&self.gvk.group, &self.gvk.version, &self.gvk.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.resource.resource)
    }

    /// `resource[.group]`, the way type names are echoed back to users.
    pub fn resource_name(&self) -> String {
        self.resource.group_resource().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_resource_carries_plural_and_api_version() {
        let mapping = Mapping::new(
            GroupVersionResource::new("apps", "v1", "deployments"),
            GroupVersionKind::new("apps", "v1", "Deployment"),
            Scope::Namespaced,
        );

        let ar = mapping.api_resource();
        assert_eq!(ar.plural, "deployments");
        assert_eq!(ar.api_version, "apps/v1");
        assert_eq!(mapping.resource_name(), "deployments.apps");
    }
}
