use async_trait::async_trait;

use crate::core::client::kube_resources::DynamicObject;
use crate::core::decode::manifest_decoder::{is_list, list_items, ManifestDecoder};
use crate::core::mapping::schema::GroupVersionKind;
use crate::domain::resource::info::Info;
use crate::domain::resource::info_mapper::InfoMapper;
use crate::domain::resource::visitor::VisitorFn;
use crate::errors::{aggregate, ResourceError};

/// Kind implied for members of a `FooList`.
fn member_kind(list: &DynamicObject) -> Option<GroupVersionKind> {
    let types = list.types.as_ref()?;
    let kind = types.kind.strip_suffix("List")?;
    (!kind.is_empty()).then(|| GroupVersionKind::from_api_version(&types.api_version, kind))
}

/// Non-list members of `list`, descending into nested lists breadth first.
pub fn leaf_objects(decoder: &ManifestDecoder, list: &DynamicObject) -> Result<Vec<DynamicObject>, ResourceError> {
    let mut leaves = Vec::new();
    let mut queue = vec![list.clone()];
    let mut next = 0;

    while next < queue.len() {
        let current = queue[next].clone();
        next += 1;
        if !is_list(&current) {
            leaves.push(current);
            continue;
        }

        let inherited = member_kind(&current);
        let mut errors = Vec::new();
        for item in list_items(&current) {
            match decoder.decode_item(item, inherited.as_ref(), "list item") {
                Ok(obj) => queue.push(obj),
                Err(err) => errors.push(err),
            }
        }
        aggregate(errors)?;
    }
    Ok(leaves)
}

/// Callback adapter expanding list items into their members.
pub(crate) struct FlattenFn<'a> {
    mapper: &'a InfoMapper,
    inner: &'a mut dyn VisitorFn,
}

impl<'a> FlattenFn<'a> {
    pub(crate) fn new(mapper: &'a InfoMapper, inner: &'a mut dyn VisitorFn) -> Self {
        Self { mapper, inner }
    }
}

#[async_trait]
impl<'a> VisitorFn for FlattenFn<'a> {
    async fn call(&mut self, item: Result<Info, ResourceError>) -> Result<(), ResourceError> {
        let info = item?;
        if !info.is_list() {
            return self.inner.call(Ok(info)).await;
        }

        let leaves = match info.object.as_ref() {
            Some(list) => leaf_objects(&self.mapper.decoder, list)?,
            None => Vec::new(),
        };
        let preferred = info.gvk().cloned();
        for obj in leaves {
            let mut member = self.mapper.info_for_object(obj, preferred.as_ref()).await?;
            if !info.resource_version.is_empty() {
                member.resource_version = info.resource_version.clone();
            }
            if !info.source.is_empty() {
                member.source = info.source.clone();
            }
            self.inner.call(Ok(member)).await?;
        }
        Ok(())
    }
}
