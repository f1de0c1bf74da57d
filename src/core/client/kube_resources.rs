/// Re-export the dynamic object types the resolver passes around.
/// This module provides a centralized place for all K8s wire types

pub use kube::api::{DynamicObject, TypeMeta, WatchEvent};

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
