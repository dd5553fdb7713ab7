//! Ambient process state: the cluster name and local host id are exposed
//! via a small injected context rather than thread-local state or static
//! singletons, so tests can stub them.
//!
//! `SourceContext` is built once at startup and threaded down to the
//! Extractor (as a [`cdc_extract::SourceInfo`]) and the bus client (as the
//! `<localHostId>` component of a producer name).

use uuid::Uuid;

use cdc_extract::SourceInfo;

#[derive(Debug, Clone)]
pub struct SourceContext {
    pub cluster_name: String,
    pub local_host_id: String,
    pub node_uuid: Uuid,
}

impl SourceContext {
    pub fn new(cluster_name: impl Into<String>, local_host_id: impl Into<String>, node_uuid: Uuid) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            local_host_id: local_host_id.into(),
            node_uuid,
        }
    }

    pub fn source_info(&self) -> SourceInfo {
        SourceInfo {
            cluster_name: self.cluster_name.clone(),
            node_uuid: self.node_uuid,
        }
    }
}
