// # ConfigMap State Store
//
// Kubernetes-backed implementation of the `StateStore` trait. The last
// observed address lives in a ConfigMap named after the state key:
//
// ```yaml
// apiVersion: v1
// kind: ConfigMap
// metadata:
//   name: dns-tools-gip
// data:
//   globalIPv4: 203.0.113.1
// ```
//
// ## Semantics
//
// - get: ConfigMap not found, or data key missing => `None`
// - upsert: create the ConfigMap when missing, otherwise replace it with
//   the data key set (other keys are kept)
//
// ## Namespace
//
// `POD_NAMESPACE`, else the mounted service-account namespace file, else
// the namespace of the client's kubeconfig context.

use async_trait::async_trait;
use dns_tools_core::traits::StateStore;
use dns_tools_core::{Error, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;

/// Data key holding the address
pub const DATA_KEY: &str = "globalIPv4";

/// Environment variable naming the pod namespace (downward API)
pub const POD_NAMESPACE_ENV: &str = "POD_NAMESPACE";

/// Namespace file mounted into every pod with a service account
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// ConfigMap-backed state store
#[derive(Clone)]
pub struct ConfigMapStateStore {
    api: Api<ConfigMap>,
    namespace: String,
}

impl std::fmt::Debug for ConfigMapStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigMapStateStore")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl ConfigMapStateStore {
    /// Create a store for ConfigMaps in `namespace`
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            api: Api::namespaced(client, &namespace),
            namespace,
        }
    }

    /// Create a store from the ambient cluster configuration
    ///
    /// Uses in-cluster config when running in a pod, the local kubeconfig
    /// otherwise.
    ///
    /// # Returns
    ///
    /// - `Ok(ConfigMapStateStore)`: Client built and namespace resolved
    /// - `Err(Error::Configuration)`: No usable cluster configuration
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default()
            .await
            .map_err(|e| Error::config(format!("Failed to build Kubernetes client: {}", e)))?;

        let namespace = detect_namespace(
            std::env::var(POD_NAMESPACE_ENV).ok(),
            Path::new(SERVICE_ACCOUNT_NAMESPACE_FILE),
        )
        .unwrap_or_else(|| client.default_namespace().to_string());

        tracing::info!("Using ConfigMap state store in namespace {}", namespace);
        Ok(Self::new(client, namespace))
    }

    /// Namespace the ConfigMap lives in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Pick the namespace from the environment or the service-account file
///
/// Returns `None` when neither yields a non-blank value.
pub fn detect_namespace(env_value: Option<String>, namespace_file: &Path) -> Option<String> {
    if let Some(ns) = env_value.map(|v| v.trim().to_string())
        && !ns.is_empty()
    {
        return Some(ns);
    }

    std::fs::read_to_string(namespace_file)
        .ok()
        .map(|contents| contents.trim().to_string())
        .filter(|ns| !ns.is_empty())
}

/// Read the stored address out of a ConfigMap
///
/// A missing data key yields `None`; an unparsable value is malformed data.
pub fn address_from(cm: &ConfigMap) -> Result<Option<IpAddr>> {
    let Some(raw) = cm.data.as_ref().and_then(|d| d.get(DATA_KEY)) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<IpAddr>()
        .map(Some)
        .map_err(|_| Error::malformed(raw.clone(), format!("ConfigMap data key {}", DATA_KEY)))
}

/// Build the ConfigMap to write for `ip`
///
/// With an existing object its metadata (resource version included) and
/// other data keys are carried over, so the result can be sent as a replace.
pub fn configmap_with_address(name: &str, existing: Option<ConfigMap>, ip: IpAddr) -> ConfigMap {
    let mut cm = existing.unwrap_or_else(|| ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        ..ConfigMap::default()
    });

    cm.data
        .get_or_insert_with(BTreeMap::new)
        .insert(DATA_KEY.to_string(), ip.to_string());
    cm
}

#[async_trait]
impl StateStore for ConfigMapStateStore {
    async fn get_previous(&self, key: &str) -> Result<Option<IpAddr>> {
        let cm = self
            .api
            .get_opt(key)
            .await
            .map_err(|e| Error::persistence(key, format!("Error getting ConfigMap: {}", e)))?;

        match cm {
            Some(cm) => address_from(&cm),
            None => {
                tracing::debug!("ConfigMap {}/{} not found", self.namespace, key);
                Ok(None)
            }
        }
    }

    async fn upsert(&self, key: &str, ip: IpAddr) -> Result<()> {
        let existing = self
            .api
            .get_opt(key)
            .await
            .map_err(|e| Error::persistence(key, format!("Error getting ConfigMap: {}", e)))?;

        let exists = existing.is_some();
        let cm = configmap_with_address(key, existing, ip);

        if exists {
            self.api
                .replace(key, &PostParams::default(), &cm)
                .await
                .map_err(|e| Error::persistence(key, format!("Failed to update ConfigMap: {}", e)))?;
            tracing::info!("Updated ConfigMap {}/{}: {}={}", self.namespace, key, DATA_KEY, ip);
        } else {
            self.api
                .create(&PostParams::default(), &cm)
                .await
                .map_err(|e| Error::persistence(key, format!("Failed to create ConfigMap: {}", e)))?;
            tracing::info!("Created ConfigMap {}/{}: {}={}", self.namespace, key, DATA_KEY, ip);
        }

        Ok(())
    }
}
