use std::sync::Arc;

use serde_json::Value;

use crate::core::client::kube_resources::DynamicObject;
use crate::core::client::resource_client::ClientFactory;
use crate::core::decode::manifest_decoder::{object_gvk, ManifestDecoder};
use crate::core::mapping::rest_mapper::RestMapper;
use crate::core::mapping::schema::GroupVersionKind;
use crate::domain::resource::info::Info;
use crate::errors::ResourceError;

/// Binds decoded objects to their type mapping and wire client.
#[derive(Clone)]
pub struct InfoMapper {
    pub rest_mapper: Arc<dyn RestMapper>,
    pub clients: Arc<dyn ClientFactory>,
    pub decoder: ManifestDecoder,
}

impl InfoMapper {
    pub fn new(rest_mapper: Arc<dyn RestMapper>, clients: Arc<dyn ClientFactory>) -> Self {
        Self {
            rest_mapper,
            clients,
            decoder: ManifestDecoder::new(),
        }
    }

    /// Info for one document read from `source`. List documents are kept as
    /// plain bodies: they are containers, not server resources.
    pub async fn info_for_data(&self, document: Value, source: &str) -> Result<Info, ResourceError> {
        let obj = self.decoder.decode(document, source)?;
        let gvk = object_gvk(&obj);
        let mut info = Info::from_object(obj, source);
        if info.is_list() {
            return Ok(info);
        }

        match gvk {
            Some(gvk) => {
                self.bind(&mut info, &gvk, Some(source)).await?;
                Ok(info)
            }
            None => Err(ResourceError::Decode {
                source_name: source.to_string(),
                message: "Object 'Kind' is missing".into(),
            }),
        }
    }

    /// Info for an object taken out of a list. Members without a type of their
    /// own are read as `preferred`.
    pub async fn info_for_object(
        &self,
        mut obj: DynamicObject,
        preferred: Option<&GroupVersionKind>,
    ) -> Result<Info, ResourceError> {
        let gvk = match (object_gvk(&obj), preferred) {
            (Some(gvk), _) => gvk,
            (None, Some(preferred)) => {
                obj.types = Some(kube::api::TypeMeta {
                    api_version: preferred.api_version(),
                    kind: preferred.kind.clone(),
                });
                preferred.clone()
            }
            (None, None) => {
                return Err(ResourceError::Decode {
                    source_name: obj.metadata.name.clone().unwrap_or_default(),
                    message: "unable to get type info from the object".into(),
                })
            }
        };

        let mut info = Info::from_object(obj, "");
        if info.is_list() {
            return Ok(info);
        }
        self.bind(&mut info, &gvk, None).await?;
        Ok(info)
    }

    async fn bind(&self, info: &mut Info, gvk: &GroupVersionKind, source: Option<&str>) -> Result<(), ResourceError> {
        let mapping = self
            .rest_mapper
            .rest_mapping(&gvk.group_kind(), Some(gvk.version.as_str()))
            .await
            .map_err(|err| match err {
                err if err.is_no_match() => ResourceError::UnrecognizedObject {
                    name: info.name.clone(),
                    namespace: info.namespace.clone(),
                    source_name: source.unwrap_or_default().to_string(),
                    message: err.to_string(),
                },
                other => other,
            })?;

        info.client = Some(self.clients.client_for(&gvk.group_version())?);
        info.mapping = Some(mapping);
        Ok(())
    }
}
