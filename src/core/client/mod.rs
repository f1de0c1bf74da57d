// Kube-rs based Kubernetes client
pub mod kube_client;
pub mod kube_resources;
pub mod resource_client;

// Manifest URLs
pub mod http_fetch;
