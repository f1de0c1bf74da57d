use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::core::client::kube_resources::{DynamicObject, TypeMeta};
use crate::core::client::resource_client::{ListPage, ListRequest, ResourceClient, WatchRequest, WatchStream};
use crate::core::mapping::rest_mapping::Mapping;
use crate::domain::resource::info::Info;
use crate::domain::resource::visitor::VisitorFn;
use crate::errors::ResourceError;

/// Lists every object of one type matching label/field selectors, one list
/// item per page.
pub struct SelectorSource {
    client: Arc<dyn ResourceClient>,
    mapping: Mapping,
    namespace: String,
    label_selector: String,
    field_selector: String,
    /// Page size; 0 disables paging.
    limit_chunks: u32,
}

impl SelectorSource {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        mapping: Mapping,
        namespace: &str,
        label_selector: &str,
        field_selector: &str,
        limit_chunks: u32,
    ) -> Self {
        Self {
            client,
            mapping,
            namespace: namespace.to_string(),
            label_selector: label_selector.to_string(),
            field_selector: field_selector.to_string(),
            limit_chunks,
        }
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) async fn visit(&self, f: &mut dyn VisitorFn) -> Result<(), ResourceError> {
        let mut request = ListRequest {
            label_selector: self.label_selector.clone(),
            field_selector: self.field_selector.clone(),
            limit: (self.limit_chunks > 0).then_some(self.limit_chunks),
            continue_token: None,
        };

        loop {
            let page = self
                .client
                .list(&self.mapping, &self.namespace, &request)
                .await
                .map_err(|err| self.enhance_list_error(err))?;
            debug!(
                "Listed page of {} {}(s), continue={}",
                page.items.len(),
                self.mapping.resource_name(),
                page.continue_token.is_some()
            );

            let next = page.continue_token.clone();
            f.call(Ok(self.page_info(page)?)).await?;

            match next {
                Some(token) => request.continue_token = Some(token),
                None => return Ok(()),
            }
        }
    }

    pub async fn watch(&self, resource_version: &str) -> Result<WatchStream, ResourceError> {
        let request = WatchRequest {
            label_selector: self.label_selector.clone(),
            field_selector: self.field_selector.clone(),
            resource_version: resource_version.to_string(),
        };
        self.client.watch(&self.mapping, &self.namespace, &request).await
    }

    /// Wraps one page as a `<Kind>List` object.
    fn page_info(&self, page: ListPage) -> Result<Info, ResourceError> {
        let items = page
            .items
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| ResourceError::Decode {
                source_name: self.mapping.resource_name(),
                message: e.to_string(),
            })?;

        let resource_version = page.resource_version.unwrap_or_default();
        let mut list = DynamicObject {
            types: Some(TypeMeta {
                api_version: self.mapping.gvk.api_version(),
                kind: format!("{}List", self.mapping.gvk.kind),
            }),
            metadata: Default::default(),
            data: json!({ "items": items }),
        };
        if !resource_version.is_empty() {
            list.metadata.resource_version = Some(resource_version.clone());
        }

        Ok(Info {
            client: Some(self.client.clone()),
            mapping: Some(self.mapping.clone()),
            namespace: self.namespace.clone(),
            resource_version,
            object: Some(list),
            ..Info::default()
        })
    }

    fn enhance_list_error(&self, err: ResourceError) -> ResourceError {
        match err {
            ResourceError::Kube(source) if is_bad_request_or_not_found(&source) => ResourceError::NotFoundForSelector {
                resource: self.mapping.resource.to_string(),
                label_selector: self.label_selector.clone(),
                field_selector: self.field_selector.clone(),
                source,
            },
            other => other,
        }
    }
}

fn is_bad_request_or_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 400 || resp.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{mapping_of, pod, FakeResourceClient};

    async fn pages(source: &SelectorSource) -> Result<Vec<Info>, ResourceError> {
        let mut seen = Vec::new();
        source
            .visit(&mut |item: Result<Info, ResourceError>| -> Result<(), ResourceError> {
                seen.push(item?);
                Ok(())
            })
            .await?;
        Ok(seen)
    }

    #[tokio::test]
    async fn follows_continue_tokens_one_info_per_page() {
        let client = Arc::new(
            FakeResourceClient::new()
                .with_object("a", pod("p1", "a", "1"))
                .with_object("a", pod("p2", "a", "2"))
                .with_object("a", pod("p3", "a", "3")),
        );
        let source = SelectorSource::new(client.clone(), mapping_of("pods"), "a", "", "", 2);

        let seen = pages(&source).await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(client.lists(), 2);
        assert!(seen.iter().all(Info::is_list));
        assert_eq!(seen[0].object.as_ref().unwrap().types.as_ref().unwrap().kind, "PodList");
    }

    #[tokio::test]
    async fn unpaged_listing_is_a_single_call() {
        let client = Arc::new(FakeResourceClient::new().with_object("a", pod("p1", "a", "1")));
        let source = SelectorSource::new(client.clone(), mapping_of("pods"), "a", "app=web", "", 0);

        pages(&source).await.unwrap();
        assert_eq!(client.lists(), 1);
        assert_eq!(client.last_list().unwrap().label_selector, "app=web");
    }

    #[tokio::test]
    async fn missing_type_mentions_the_selector() {
        let client = Arc::new(FakeResourceClient::new().failing_lists());
        let source = SelectorSource::new(client, mapping_of("pods"), "a", "app=web", "", 0);

        let err = pages(&source).await.unwrap_err();
        assert!(matches!(err, ResourceError::NotFoundForSelector { .. }));
        assert!(err.to_string().contains("app=web"));
    }
}
