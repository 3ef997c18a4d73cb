//! Declared topology of an NF deployment resource.
//!
//! The topology is the `spec` of the resource: an ordered list of sites, each
//! naming one NF instance, its type, the cluster it lands on and the sites it
//! is connected to. Only id, type, type name, cluster and connectivity are
//! consumed here; vendor and version travel along for hydration.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::types::{NamespacedName, NfType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    pub neighbor_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    #[serde(default)]
    pub nf_type: NfType,
    #[serde(default)]
    pub nf_type_name: String,
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub nf_vendor: String,
    #[serde(default)]
    pub nf_version: String,
    #[serde(default)]
    pub connectivities: Vec<Connectivity>,
}

impl Site {
    pub fn new(id: impl Into<String>, nf_type: NfType) -> Self {
        Self {
            id: id.into(),
            nf_type,
            nf_type_name: String::new(),
            cluster_name: String::new(),
            nf_vendor: String::new(),
            nf_version: String::new(),
            connectivities: Vec::new(),
        }
    }

    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.nf_type_name = name.into();
        self
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster_name = cluster.into();
        self
    }

    pub fn connected_to(mut self, neighbor: impl Into<String>) -> Self {
        self.connectivities.push(Connectivity {
            neighbor_name: neighbor.into(),
        });
        self
    }

    pub fn neighbors(&self) -> impl Iterator<Item = &str> {
        self.connectivities.iter().map(|c| c.neighbor_name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Topology {
    #[serde(default)]
    pub sites: Vec<Site>,
}

impl Topology {
    pub fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == id)
    }

    /// Distinct cluster names, in declaration order.
    pub fn clusters(&self) -> Vec<&str> {
        let mut clusters: Vec<&str> = Vec::new();
        for site in &self.sites {
            if !site.cluster_name.is_empty() && !clusters.contains(&site.cluster_name.as_str()) {
                clusters.push(&site.cluster_name);
            }
        }
        clusters
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceMeta {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub generation: i64,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// An NF deployment resource as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NfDeployResource {
    pub metadata: ResourceMeta,
    #[serde(default)]
    pub spec: Topology,
}

impl NfDeployResource {
    pub fn key(&self) -> NamespacedName {
        NamespacedName::new(&self.metadata.namespace, &self.metadata.name)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse NF deployment resource")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topology file: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid topology file: {}", path.display()))
    }
}
