//! Splits manifest bytes into documents and turns documents into dynamic
//! objects.
//!
//! JSON input (first non-blank byte is `{`) may hold several concatenated
//! objects; anything else is read as a YAML stream of `---` separated
//! documents. Empty and `null` documents are skipped.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::client::kube_resources::DynamicObject;
use crate::core::mapping::schema::GroupVersionKind;
use crate::errors::ResourceError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestDecoder;

impl ManifestDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Every non-empty document in `data`. A syntax error anywhere aborts the
    /// whole read, since the document boundaries after it cannot be trusted.
    pub fn split_documents(&self, data: &[u8], source: &str) -> Result<Vec<Value>, ResourceError> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let first = data.iter().find(|b| !b.is_ascii_whitespace());

        let documents = if first == Some(&b'{') {
            serde_json::Deserializer::from_slice(data)
                .into_iter::<Value>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| parse_error(source, e))?
        } else {
            let mut documents = Vec::new();
            for document in serde_yaml::Deserializer::from_slice(data) {
                documents.push(Value::deserialize(document).map_err(|e| parse_error(source, e))?);
            }
            documents
        };

        Ok(documents.into_iter().filter(|d| !d.is_null()).collect())
    }

    /// A top-level document: `apiVersion` and `kind` are mandatory.
    pub fn decode(&self, document: Value, source: &str) -> Result<DynamicObject, ResourceError> {
        let fields = document.as_object().ok_or_else(|| decode_error(source, "expected a map at the top level"))?;
        for required in ["apiVersion", "kind"] {
            let present = fields
                .get(required)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            if !present {
                return Err(decode_error(source, &format!("Object '{required}' is missing")));
            }
        }
        self.to_object(document, source)
    }

    /// A list member: members served by a list call carry no type, so the
    /// caller may supply the kind the enclosing list was read as.
    pub fn decode_item(
        &self,
        document: Value,
        inherited: Option<&GroupVersionKind>,
        source: &str,
    ) -> Result<DynamicObject, ResourceError> {
        let mut obj = self.to_object(document, source)?;
        let typed = obj
            .types
            .as_ref()
            .is_some_and(|t| !t.api_version.is_empty() && !t.kind.is_empty());

        if !typed {
            let gvk = inherited.ok_or_else(|| decode_error(source, "Object 'Kind' is missing"))?;
            obj.types = Some(kube::api::TypeMeta {
                api_version: gvk.api_version(),
                kind: gvk.kind.clone(),
            });
        }
        Ok(obj)
    }

    fn to_object(&self, mut document: Value, source: &str) -> Result<DynamicObject, ResourceError> {
        if let Value::Object(fields) = &mut document {
            let metadata = fields.entry("metadata").or_insert_with(|| Value::Object(Map::new()));
            if metadata.is_null() {
                *metadata = Value::Object(Map::new());
            }
        }
        serde_json::from_value(document).map_err(|e| decode_error(source, &e.to_string()))
    }
}

/// The kind an object declares, if any.
pub fn object_gvk(obj: &DynamicObject) -> Option<GroupVersionKind> {
    obj.types
        .as_ref()
        .filter(|t| !t.kind.is_empty())
        .map(|t| GroupVersionKind::from_api_version(&t.api_version, &t.kind))
}

/// Lists are recognized by shape: a `*List` kind with an `items` array.
pub fn is_list(obj: &DynamicObject) -> bool {
    let list_kind = obj.types.as_ref().is_some_and(|t| t.kind.ends_with("List"));
    list_kind && obj.data.get("items").is_some_and(Value::is_array)
}

/// Members of a list object, as raw documents.
pub fn list_items(obj: &DynamicObject) -> Vec<Value> {
    obj.data
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn parse_error(source: &str, err: impl std::fmt::Display) -> ResourceError {
    ResourceError::Parse {
        source_name: source.to_string(),
        message: err.to_string(),
    }
}

fn decode_error(source: &str, message: &str) -> ResourceError {
    ResourceError::Decode {
        source_name: source.to_string(),
        message: message.to_string(),
    }
}
