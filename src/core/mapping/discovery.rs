use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;
use kube::Client;
use tracing::{debug, warn};

use crate::core::mapping::catalog::{Catalog, CatalogEntry};
use crate::core::mapping::rest_mapper::CatalogSource;
use crate::core::mapping::rest_mapping::Scope;
use crate::errors::ResourceError;

/// Reads the resource lists a live API server publishes.
#[derive(Clone)]
pub struct KubeDiscovery {
    client: Client,
}

impl KubeDiscovery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogSource for KubeDiscovery {
    async fn load(&self) -> Result<Arc<Catalog>, ResourceError> {
        let mut entries = Vec::new();

        let core = self.client.list_core_api_versions().await?;
        for (i, version) in core.versions.iter().enumerate() {
            let list = self.client.list_core_api_resources(version).await?;
            entries.extend(to_entries("", version, i == 0, &list.resources));
        }

        let groups = self.client.list_api_groups().await?;
        for group in &groups.groups {
            let preferred = group
                .preferred_version
                .as_ref()
                .map(|gv| gv.version.clone())
                .or_else(|| group.versions.first().map(|gv| gv.version.clone()))
                .unwrap_or_default();

            for gv in &group.versions {
                match self.client.list_api_group_resources(&gv.group_version).await {
                    Ok(list) => entries.extend(to_entries(
                        &group.name,
                        &gv.version,
                        gv.version == preferred,
                        &list.resources,
                    )),
                    // One broken aggregated API must not hide every other group.
                    Err(e) => warn!("Skipping {}: discovery failed: {}", gv.group_version, e),
                }
            }
        }

        debug!("Discovered {} resource type(s)", entries.len());
        Ok(Arc::new(Catalog::new(entries)))
    }
}

fn to_entries(group: &str, version: &str, preferred: bool, resources: &[APIResource]) -> Vec<CatalogEntry> {
    resources
        .iter()
        .filter(|r| !r.name.contains('/'))
        .map(|r| {
            let scope = if r.namespaced { Scope::Namespaced } else { Scope::Cluster };
            let mut entry = CatalogEntry::new(group, version, &r.kind, &r.name, scope);
            if !r.singular_name.is_empty() {
                entry.singular = r.singular_name.clone();
            }
            entry.short_names = r.short_names.clone().unwrap_or_default();
            entry.categories = r.categories.clone().unwrap_or_default();
            entry.preferred = preferred;
            entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_resource(name: &str, kind: &str, namespaced: bool) -> APIResource {
        APIResource {
            name: name.to_string(),
            kind: kind.to_string(),
            namespaced,
            singular_name: String::new(),
            short_names: Some(vec!["deploy".into()]),
            categories: Some(vec!["all".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn subresources_are_not_catalogued() {
        let entries = to_entries(
            "apps",
            "v1",
            true,
            &[
                api_resource("deployments", "Deployment", true),
                api_resource("deployments/scale", "Scale", true),
            ],
        );

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.singular, "deployment");
        assert_eq!(entry.short_names, vec!["deploy"]);
        assert_eq!(entry.categories, vec!["all"]);
        assert_eq!(entry.scope, Scope::Namespaced);
    }
}
