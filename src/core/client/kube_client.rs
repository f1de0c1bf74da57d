use anyhow::{Context, Result};
use kube::{Client, Config};
use tracing::debug;

use crate::config::ResolverConfig;

/// Creates a Kubernetes client from the ambient kubeconfig or in-cluster
/// environment, pointed at `KRESOURCE_K8S_API_URL` when that is set.
pub async fn build_kube_client(config: &ResolverConfig) -> Result<Client> {
    let mut kube_config = Config::infer()
        .await
        .context("Failed to infer Kubernetes client configuration")?;

    if let Some(api_url) = config.k8s_api_url.as_deref() {
        debug!("Using custom API URL from KRESOURCE_K8S_API_URL");
        kube_config.cluster_url = api_url
            .parse()
            .with_context(|| format!("Invalid KRESOURCE_K8S_API_URL '{api_url}'"))?;
    } else {
        debug!("Using inferred cluster configuration");
    }

    let client = Client::try_from(kube_config)?;
    debug!("Kubernetes client initialized successfully");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_api_url_never_panics() {
        let config = ResolverConfig {
            k8s_api_url: Some("not a url".into()),
            ..ResolverConfig::default()
        };
        // Fails on config inference or on the URL, depending on the environment.
        assert!(build_kube_client(&config).await.is_err());
    }
}
