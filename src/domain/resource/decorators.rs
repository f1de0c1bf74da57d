//! Per-item hooks run by decorated and filtered visitors.

use std::sync::Arc;

use tracing::debug;

use crate::domain::resource::info::Info;
use crate::domain::resource::label_selector::LabelSelector;
use crate::errors::ResourceError;

/// What a hook decided about the item it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    /// Skip the item without reporting anything.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decorator {
    /// Fills in `namespace` on namespaced items that have none.
    SetNamespace(String),
    /// Like `SetNamespace`, but an item in another namespace is an error.
    RequireNamespace(String),
    /// Clears the namespace of cluster-scoped items and drops namespaced
    /// items outside `namespace` (empty = no restriction).
    FilterNamespace { namespace: String },
    /// Fetches the body of items that have none.
    RetrieveLazy,
    /// Re-fetches every named item from the server.
    RetrieveLatest,
}

impl Decorator {
    pub async fn apply(&self, info: &mut Info) -> Result<Disposition, ResourceError> {
        match self {
            Decorator::SetNamespace(namespace) => {
                if info.namespaced() && info.namespace.is_empty() {
                    info.namespace = namespace.clone();
                    info.update_object_namespace();
                }
                Ok(Disposition::Keep)
            }
            Decorator::RequireNamespace(namespace) => {
                if !info.namespaced() {
                    return Ok(Disposition::Keep);
                }
                if info.namespace.is_empty() {
                    info.namespace = namespace.clone();
                    info.update_object_namespace();
                    return Ok(Disposition::Keep);
                }
                if info.namespace != *namespace {
                    return Err(ResourceError::NamespaceMismatch {
                        object_namespace: info.namespace.clone(),
                        namespace: namespace.clone(),
                    });
                }
                Ok(Disposition::Keep)
            }
            Decorator::FilterNamespace { namespace } => {
                if !info.namespaced() {
                    info.namespace.clear();
                    info.update_object_namespace();
                    return Ok(Disposition::Keep);
                }
                if !namespace.is_empty() && !info.namespace.is_empty() && info.namespace != *namespace {
                    debug!(
                        "Skipping {} in namespace '{}' (expected '{}')",
                        info.object_name(),
                        info.namespace,
                        namespace
                    );
                    return Ok(Disposition::Drop);
                }
                Ok(Disposition::Keep)
            }
            Decorator::RetrieveLazy => {
                if info.object.is_none() {
                    info.get().await?;
                }
                Ok(Disposition::Keep)
            }
            Decorator::RetrieveLatest => {
                if info.is_list() {
                    return Err(ResourceError::Usage(
                        "watch is only supported on individual resources and resource collections, but a list of resources is found".into(),
                    ));
                }
                if info.name.is_empty() {
                    return Ok(Disposition::Keep);
                }
                if info.namespaced() && info.namespace.is_empty() {
                    return Err(ResourceError::MissingNamespace {
                        resource: info.mapping.as_ref().map(|m| m.resource_name()).unwrap_or_default(),
                        name: info.name.clone(),
                    });
                }
                info.get().await?;
                Ok(Disposition::Keep)
            }
        }
    }
}

/// Predicate deciding whether an item reaches the caller.
pub type FilterFunc = Arc<dyn Fn(&Info) -> Result<bool, ResourceError> + Send + Sync>;

/// Keeps items whose labels match `selector`. Items without a body pass.
pub fn filter_by_label_selector(selector: LabelSelector) -> FilterFunc {
    Arc::new(move |info: &Info| {
        let Some(obj) = info.object.as_ref() else {
            return Ok(true);
        };
        let empty = Default::default();
        let labels = obj.metadata.labels.as_ref().unwrap_or(&empty);
        let matched = selector.matches(labels);
        if !matched {
            debug!("Skipping {}: labels do not match selector", info.object_name());
        }
        Ok(matched)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mapping_of, pod, FakeResourceClient};

    fn pod_info(namespace: &str) -> Info {
        let mut info = Info::from_object(pod("web", namespace, "1"), "pod.yaml");
        info.mapping = Some(mapping_of("pods"));
        info.client = Some(Arc::new(FakeResourceClient::new()));
        info
    }

    #[tokio::test]
    async fn set_namespace_only_fills_blanks() {
        let hook = Decorator::SetNamespace("default".into());

        let mut blank = pod_info("");
        hook.apply(&mut blank).await.unwrap();
        assert_eq!(blank.namespace, "default");
        assert_eq!(blank.object.unwrap().metadata.namespace.as_deref(), Some("default"));

        let mut other = pod_info("team");
        hook.apply(&mut other).await.unwrap();
        assert_eq!(other.namespace, "team");
    }

    #[tokio::test]
    async fn require_namespace_rejects_a_mismatch() {
        let err = Decorator::RequireNamespace("ns-a".into())
            .apply(&mut pod_info("ns-b"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::NamespaceMismatch { .. }));
        assert!(err.to_string().contains("--namespace=ns-b"));
    }

    #[tokio::test]
    async fn filter_namespace_drops_a_mismatch_silently() {
        let hook = Decorator::FilterNamespace { namespace: "ns-a".into() };
        assert_eq!(hook.apply(&mut pod_info("ns-b")).await.unwrap(), Disposition::Drop);
        assert_eq!(hook.apply(&mut pod_info("ns-a")).await.unwrap(), Disposition::Keep);
    }

    #[tokio::test]
    async fn filter_namespace_clears_cluster_scoped_items() {
        let mut node = Info::from_object(pod("n1", "stray", "1"), "node.yaml");
        node.mapping = Some(mapping_of("nodes"));

        let outcome = Decorator::FilterNamespace { namespace: "ns-a".into() }
            .apply(&mut node)
            .await
            .unwrap();
        assert_eq!(outcome, Disposition::Keep);
        assert!(node.namespace.is_empty());
        assert!(node.object.unwrap().metadata.namespace.is_none());
    }

    #[tokio::test]
    async fn retrieve_latest_needs_a_namespace() {
        let err = Decorator::RetrieveLatest.apply(&mut pod_info("")).await.unwrap_err();
        assert!(matches!(err, ResourceError::MissingNamespace { .. }));
    }

    #[test]
    fn label_filter_matches_object_labels() {
        let filter = filter_by_label_selector(LabelSelector::parse("app=web").unwrap());
        let mut info = pod_info("a");
        assert!(!filter(&info).unwrap());

        if let Some(obj) = info.object.as_mut() {
            obj.metadata.labels = Some([("app".to_string(), "web".to_string())].into_iter().collect());
        }
        assert!(filter(&info).unwrap());
    }
}
