use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::core::client::kube_resources::{DynamicObject, TypeMeta};
use crate::core::client::resource_client::WatchStream;
use crate::core::decode::manifest_decoder::is_list;
use crate::core::mapping::rest_mapping::Mapping;
use crate::domain::resource::info::Info;
use crate::domain::resource::visitor::{Visitor, VisitorFn};
use crate::errors::{filter_out, ErrMatchFunc, ResourceError};

/// Outcome of [`Builder::resolve`](crate::domain::resource::builder::Builder::resolve):
/// either a configuration error or a visitor ready to be traversed.
pub struct ResourceResult {
    err: Option<ResourceError>,
    visitor: Visitor,
    sources: Vec<Arc<Visitor>>,
    single_item_implied: bool,
    targets_single_items: bool,
    ignore_errors: Vec<ErrMatchFunc>,
    infos: Option<Vec<Info>>,
}

impl ResourceResult {
    pub(crate) fn new(visitor: Visitor, sources: Vec<Arc<Visitor>>) -> Self {
        Self {
            err: None,
            visitor,
            sources,
            single_item_implied: false,
            targets_single_items: false,
            ignore_errors: Vec::new(),
            infos: None,
        }
    }

    pub(crate) fn failed(err: ResourceError) -> Self {
        let mut result = Self::new(Visitor::List(Vec::new()), Vec::new());
        result.err = Some(err);
        result
    }

    pub(crate) fn with_flags(mut self, single_item_implied: bool, targets_single_items: bool) -> Self {
        self.single_item_implied = single_item_implied;
        self.targets_single_items = targets_single_items;
        self
    }

    pub(crate) fn map_visitor(mut self, f: impl FnOnce(Visitor) -> Visitor) -> Self {
        let visitor = std::mem::replace(&mut self.visitor, Visitor::List(Vec::new()));
        self.visitor = f(visitor);
        self
    }

    /// Errors matching any of `matchers` are dropped from traversal results.
    pub fn ignore_errors(mut self, matchers: Vec<ErrMatchFunc>) -> Self {
        self.ignore_errors.extend(matchers);
        self
    }

    /// The resolution error, or the error of the first full traversal.
    pub fn err(&self) -> Option<&ResourceError> {
        self.err.as_ref()
    }

    pub fn single_item_implied(&self) -> bool {
        self.single_item_implied
    }

    /// Whether the input named individual objects rather than whole
    /// collections.
    pub fn targets_single_items(&self) -> bool {
        self.targets_single_items
    }

    pub async fn visit(&self, f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        match self.visitor.visit(f).await {
            Ok(()) => Ok(()),
            Err(err) => filter_out(err, &self.ignore_errors).map_or(Ok(()), Err),
        }
    }

    /// Every item, traversing only on the first call. A traversal error is
    /// kept and returned on every later call as well.
    pub async fn infos(&mut self) -> Result<&[Info], ResourceError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        if self.infos.is_none() {
            let mut collected = Vec::new();
            let outcome = self
                .visitor
                .visit(&mut |item: Result<Info, ResourceError>| -> Result<(), ResourceError> {
                    collected.push(item?);
                    Ok(())
                })
                .await;
            debug!("Materialized {} item(s)", collected.len());
            self.infos = Some(collected);

            if let Some(err) = outcome.err().and_then(|e| filter_out(e, &self.ignore_errors)) {
                self.err = Some(err.clone());
                return Err(err);
            }
        }
        Ok(self.infos.as_deref().unwrap_or_default())
    }

    /// Items collected by the first full traversal, including those visited
    /// before it failed.
    pub fn visited_infos(&self) -> &[Info] {
        self.infos.as_deref().unwrap_or_default()
    }

    /// All objects as one value: the bare object when exactly one was asked
    /// for, an existing list as is, a `v1 List` otherwise.
    pub async fn object(&mut self) -> Result<DynamicObject, ResourceError> {
        let single_item_implied = self.single_item_implied;
        let infos = self.infos().await?;

        let mut versions = BTreeSet::new();
        let mut objects = Vec::new();
        for info in infos {
            if let Some(obj) = &info.object {
                objects.push(obj);
                versions.insert(info.resource_version.as_str());
            }
        }

        if let [only] = objects.as_slice() {
            if single_item_implied || is_list(only) {
                return Ok((*only).clone());
            }
        }

        let version = match versions.len() {
            1 => versions.into_iter().next().unwrap_or_default().to_string(),
            _ => String::new(),
        };
        to_v1_list(&objects, &version)
    }

    /// The single type every source resolves to.
    pub fn resource_mapping(&self) -> Result<Mapping, ResourceError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }

        let mut mappings: Vec<&Mapping> = Vec::new();
        for source in &self.sources {
            let mapping = source.resource_mapping().ok_or_else(|| {
                ResourceError::Usage("a resource mapping could not be loaded from a file, URL or stream source".into())
            })?;
            if !mappings.iter().any(|m| m.resource == mapping.resource) {
                mappings.push(mapping);
            }
        }

        match mappings.as_slice() {
            [only] => Ok((*only).clone()),
            _ => Err(ResourceError::Usage("expected only a single resource type".into())),
        }
    }

    /// Watches the one configured source from `resource_version`.
    pub async fn watch(&mut self, resource_version: &str) -> Result<WatchStream, ResourceError> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        if self.sources.len() != 1 {
            return Err(ResourceError::Usage(
                "you may only watch a single resource or type of resource at a time".into(),
            ));
        }

        if let Some(stream) = self.sources[0].watch(resource_version).await {
            return stream;
        }

        let infos = self.infos().await?;
        match infos {
            [only] => only.watch(resource_version).await,
            many => Err(ResourceError::Usage(format!(
                "watch is only supported on individual resources and resource collections - {} resources were found",
                many.len()
            ))),
        }
    }
}

fn to_v1_list(objects: &[&DynamicObject], version: &str) -> Result<DynamicObject, ResourceError> {
    let items = objects
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<Value>, _>>()
        .map_err(|e| ResourceError::Decode {
            source_name: "List".into(),
            message: e.to_string(),
        })?;

    let mut list = DynamicObject {
        types: Some(TypeMeta {
            api_version: "v1".into(),
            kind: "List".into(),
        }),
        metadata: Default::default(),
        data: json!({ "items": items }),
    };
    if !version.is_empty() {
        list.metadata.resource_version = Some(version.to_string());
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decode::manifest_decoder::list_items;
    use crate::domain::resource::decorators::FilterFunc;
    use crate::test_support::{mapping_of, pod, FakeResourceClient};

    fn info(name: &str, rv: &str) -> Arc<Visitor> {
        let mut info = Info::from_object(pod(name, "a", rv), "pods.yaml");
        info.mapping = Some(mapping_of("pods"));
        Arc::new(Visitor::Info(Box::new(info)))
    }

    fn result_of(children: Vec<Arc<Visitor>>) -> ResourceResult {
        ResourceResult::new(Visitor::List(children.clone()), children)
    }

    #[tokio::test]
    async fn stored_error_short_circuits_everything() {
        let mut result = ResourceResult::failed(ResourceError::MissingResource);
        let mut calls = 0;
        let visited = result
            .visit(&mut |_item: Result<Info, ResourceError>| -> Result<(), ResourceError> {
                calls += 1;
                Ok(())
            })
            .await;
        assert!(visited.unwrap_err().is_usage_error());
        assert_eq!(calls, 0);
        assert!(result.infos().await.is_err());
        assert!(result.object().await.is_err());
    }

    #[tokio::test]
    async fn multiple_objects_fold_into_a_list() {
        let mut result = result_of(vec![info("a", "5"), info("b", "5")]);
        let list = result.object().await.unwrap();
        assert_eq!(list.types.as_ref().unwrap().kind, "List");
        assert_eq!(list.metadata.resource_version.as_deref(), Some("5"));
        assert_eq!(list_items(&list).len(), 2);
    }

    #[tokio::test]
    async fn differing_versions_leave_the_list_version_blank() {
        let mut result = result_of(vec![info("a", "5"), info("b", "6")]);
        let list = result.object().await.unwrap();
        assert!(list.metadata.resource_version.is_none());
    }

    #[tokio::test]
    async fn single_object_is_unwrapped_only_when_implied() {
        let mut implied = result_of(vec![info("a", "1")]).with_flags(true, true);
        assert_eq!(implied.object().await.unwrap().metadata.name.as_deref(), Some("a"));

        let mut not_implied = result_of(vec![info("a", "1")]);
        assert_eq!(not_implied.object().await.unwrap().types.unwrap().kind, "List");
    }

    #[tokio::test]
    async fn ignored_errors_disappear() {
        let fail: FilterFunc = Arc::new(|_| Err(ResourceError::StdinMultiUse));
        let failing = Arc::new(Visitor::Filtered(Box::new(Visitor::Info(Box::default())), vec![fail]));
        let ignore: ErrMatchFunc = Arc::new(|e| matches!(e, ResourceError::StdinMultiUse));
        let mut result = result_of(vec![info("a", "1"), failing]).ignore_errors(vec![ignore]);

        assert_eq!(result.infos().await.unwrap().len(), 1);
    }

    #[test]
    fn resource_mapping_requires_one_type() {
        let result = result_of(vec![info("a", "1"), info("b", "1")]);
        assert_eq!(result.resource_mapping().unwrap().resource.resource, "pods");

        let node = Info::by_name(Arc::new(FakeResourceClient::new()), mapping_of("nodes"), "", "n1");
        let mixed = result_of(vec![info("a", "1"), Arc::new(Visitor::Info(Box::new(node)))]);
        assert!(mixed
            .resource_mapping()
            .unwrap_err()
            .to_string()
            .contains("single resource type"));
    }

    #[tokio::test]
    async fn watch_needs_a_single_source() {
        let mut result = result_of(vec![info("a", "1"), info("b", "1")]);
        let err = result.watch("0").await.err().unwrap();
        assert!(err.to_string().contains("only watch a single resource"));
    }
}
