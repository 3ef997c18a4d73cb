//! In-memory graph of one deployment's NF instances and their connectivity.
//!
//! Nodes are partitioned by NF type. A topology update upserts every declared
//! site, creates the declared edges and only then prunes nodes that are no
//! longer declared (or are declared under a different type), so a node that
//! changed type is re-added under its new type before the stale entry goes.

pub mod node;

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::profile::ProfileRepository;
use crate::topology::{Site, Topology};
use crate::types::NfType;

pub use node::{Edge, NfSpec, Node};

/// Ids added and removed by one topology update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyChange {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl TopologyChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentGraph {
    partitions: BTreeMap<NfType, BTreeMap<String, Node>>,
    edges: Vec<Edge>,
}

impl DeploymentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type under which `id` is tracked, or `Unspecified`.
    pub fn nf_type_of(&self, id: &str) -> NfType {
        self.partitions
            .iter()
            .find(|(_, nodes)| nodes.contains_key(id))
            .map(|(nf_type, _)| *nf_type)
            .unwrap_or(NfType::Unspecified)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.partitions.values().find_map(|nodes| nodes.get(id))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.partitions
            .values_mut()
            .find_map(|nodes| nodes.get_mut(id))
    }

    /// All nodes, partition by partition, ids ascending within a partition.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.partitions.values().flat_map(|nodes| nodes.values())
    }

    pub fn nodes_of_type(&self, nf_type: NfType) -> impl Iterator<Item = &Node> {
        self.partitions
            .get(&nf_type)
            .into_iter()
            .flat_map(|nodes| nodes.values())
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edges.iter().any(|e| e.connects(a, b))
    }

    /// Rebuild the graph from a declared topology.
    pub fn apply_topology(
        &mut self,
        topology: &Topology,
        profiles: &dyn ProfileRepository,
    ) -> TopologyChange {
        let mut change = TopologyChange::default();
        for site in &topology.sites {
            if self.upsert_site(site, profiles) {
                change.added.push(site.id.clone());
            }
        }
        self.connect_declared(topology);
        change.removed = self.prune(topology);
        if !change.removed.is_empty() {
            // Pruning a node whose type changed tears down edges its
            // replacement still declares.
            self.connect_declared(topology);
        }
        change
    }

    /// Create the node for `site` if absent, then refresh its spec.
    ///
    /// Returns whether a new node was created. Sites of untracked types are
    /// skipped. Enrichment failures keep the node with its previous spec.
    pub fn upsert_site(&mut self, site: &Site, profiles: &dyn ProfileRepository) -> bool {
        if !site.nf_type.is_tracked() {
            debug!(nf = %site.id, nf_type = %site.nf_type, "Skipping untracked NF type");
            return false;
        }
        let nodes = self.partitions.entry(site.nf_type).or_default();
        let created = !nodes.contains_key(&site.id);
        let node = nodes
            .entry(site.id.clone())
            .or_insert_with(|| Node::new(site.id.clone(), site.nf_type));
        node.spec.cluster_name = site.cluster_name.clone();

        match profiles.resolve_intent(site.nf_type, &site.nf_type_name) {
            Ok(intent) => node.spec.intent = intent,
            Err(err) => warn!(
                nf = %site.id,
                nf_type = %site.nf_type,
                type_name = %site.nf_type_name,
                "Failed to resolve NF intent: {}",
                err
            ),
        }
        created
    }

    /// Connect `a` and `b` unless an edge between them already exists.
    pub fn create_edge(&mut self, a: &str, b: &str) {
        if self.has_edge(a, b) {
            return;
        }
        self.add_connection(a, b);
        self.add_connection(b, a);
        self.edges.push(Edge::new(a, b));
    }

    /// Remove the edge between `a` and `b`, if any.
    pub fn remove_edge(&mut self, a: &str, b: &str) {
        if let Some(index) = self.edges.iter().position(|e| e.connects(a, b)) {
            self.edges.remove(index);
            self.drop_connection(a, b);
            self.drop_connection(b, a);
        }
    }

    /// Remove nodes absent from `topology` or declared there under another
    /// type, together with every edge touching them.
    pub fn prune(&mut self, topology: &Topology) -> Vec<String> {
        let declared: HashMap<&str, NfType> = topology
            .sites
            .iter()
            .map(|s| (s.id.as_str(), s.nf_type))
            .collect();

        let stale: Vec<(NfType, String)> = self
            .partitions
            .iter()
            .flat_map(|(nf_type, nodes)| nodes.keys().map(move |id| (*nf_type, id.clone())))
            .filter(|(nf_type, id)| declared.get(id.as_str()) != Some(nf_type))
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for (nf_type, id) in stale {
            let Some(nodes) = self.partitions.get_mut(&nf_type) else {
                continue;
            };
            let Some(node) = nodes.remove(&id) else {
                continue;
            };
            for neighbor in &node.connections {
                self.remove_edge(&id, neighbor);
            }
            if !self.contains(&id) {
                let dangling: Vec<Edge> = self
                    .edges
                    .iter()
                    .filter(|e| e.touches(&id))
                    .cloned()
                    .collect();
                for edge in dangling {
                    self.remove_edge(&edge.first, &edge.second);
                }
            }
            debug!(nf = %id, nf_type = %nf_type, "Pruned NF from deployment");
            removed.push(id);
        }
        self.partitions.retain(|_, nodes| !nodes.is_empty());
        removed
    }

    fn contains(&self, id: &str) -> bool {
        self.partitions.values().any(|nodes| nodes.contains_key(id))
    }

    fn connect_declared(&mut self, topology: &Topology) {
        for site in &topology.sites {
            for neighbor in site.neighbors() {
                self.create_edge(&site.id, neighbor);
            }
        }
    }

    fn add_connection(&mut self, id: &str, other: &str) {
        let nf_type = self.nf_type_of(id);
        if let Some(node) = self
            .partitions
            .get_mut(&nf_type)
            .and_then(|nodes| nodes.get_mut(id))
        {
            node.connections.insert(other.to_string());
        }
    }

    fn drop_connection(&mut self, id: &str, other: &str) {
        for nodes in self.partitions.values_mut() {
            if let Some(node) = nodes.get_mut(id) {
                node.connections.remove(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileError;
    use crate::profile::{NfIntent, ProfileSet};

    struct FailingProfiles;

    impl ProfileRepository for FailingProfiles {
        fn resolve_intent(&self, nf_type: NfType, _: &str) -> Result<NfIntent, ProfileError> {
            Err(ProfileError::Unsupported(nf_type))
        }
    }

    fn upf_smf_topology() -> Topology {
        Topology::new(vec![
            Site::new("upf", NfType::Upf).connected_to("smf"),
            Site::new("smf", NfType::Smf).connected_to("upf"),
        ])
    }

    #[test]
    fn nf_type_of_untracked_is_unspecified() {
        let mut graph = DeploymentGraph::new();
        graph.apply_topology(&upf_smf_topology(), &ProfileSet::new());
        assert_eq!(graph.nf_type_of("upf"), NfType::Upf);
        assert_eq!(graph.nf_type_of("smf"), NfType::Smf);
        assert_eq!(graph.nf_type_of("random-name"), NfType::Unspecified);
    }

    #[test]
    fn create_edge_is_idempotent_in_both_directions() {
        let mut graph = DeploymentGraph::new();
        graph.apply_topology(&upf_smf_topology(), &ProfileSet::new());
        assert_eq!(graph.edges().len(), 1);

        graph.create_edge("smf", "upf");
        graph.create_edge("upf", "smf");
        assert_eq!(graph.edges().len(), 1);
        assert!(graph.node("upf").unwrap().is_connected_to("smf"));
        assert!(graph.node("smf").unwrap().is_connected_to("upf"));
    }

    #[test]
    fn create_edge_to_untracked_id_connects_tracked_side_only() {
        let mut graph = DeploymentGraph::new();
        graph.apply_topology(&upf_smf_topology(), &ProfileSet::new());
        graph.create_edge("smf", "amf-1");
        assert_eq!(graph.edges().len(), 2);
        assert!(graph.node("smf").unwrap().is_connected_to("amf-1"));
        assert!(graph.node("amf-1").is_none());
    }

    #[test]
    fn remove_edge_missing_is_noop() {
        let mut graph = DeploymentGraph::new();
        graph.apply_topology(&upf_smf_topology(), &ProfileSet::new());
        graph.remove_edge("upf", "udm");
        assert_eq!(graph.edges().len(), 1);

        graph.remove_edge("smf", "upf");
        assert!(graph.edges().is_empty());
        assert!(!graph.node("upf").unwrap().is_connected_to("smf"));
    }

    #[test]
    fn enrichment_failure_keeps_node() {
        let mut graph = DeploymentGraph::new();
        let site = Site::new("upf", NfType::Upf)
            .with_type_name("unknown")
            .with_cluster("edge-1");
        assert!(graph.upsert_site(&site, &FailingProfiles));
        let node = graph.node("upf").unwrap();
        assert_eq!(node.spec.cluster_name, "edge-1");
        assert_eq!(node.spec.intent, NfIntent::None);
    }

    #[test]
    fn enrichment_failure_keeps_prior_spec() {
        let mut profiles = ProfileSet::new();
        profiles.insert_upf_type("upf-small", "cap");
        profiles.insert_upf_capacity("cap", "2000");
        let site = Site::new("upf", NfType::Upf).with_type_name("upf-small");

        let mut graph = DeploymentGraph::new();
        graph.upsert_site(&site, &profiles);
        assert!(!graph.upsert_site(&site, &FailingProfiles));
        assert_eq!(
            graph.node("upf").unwrap().spec.intent,
            NfIntent::Upf {
                throughput: "2000".to_string()
            }
        );
    }

    #[test]
    fn untracked_types_are_not_nodes() {
        let mut graph = DeploymentGraph::new();
        let topology = Topology::new(vec![
            Site::new("amf", NfType::Amf).connected_to("smf"),
            Site::new("smf", NfType::Smf).connected_to("amf"),
        ]);
        graph.apply_topology(&topology, &ProfileSet::new());
        assert_eq!(graph.len(), 1);
        assert!(graph.node("smf").unwrap().is_connected_to("amf"));
    }

    #[test]
    fn type_change_moves_node_and_keeps_edges() {
        let mut graph = DeploymentGraph::new();
        graph.apply_topology(&upf_smf_topology(), &ProfileSet::new());

        let moved = Topology::new(vec![
            Site::new("upf", NfType::Udm).connected_to("smf"),
            Site::new("smf", NfType::Smf).connected_to("upf"),
        ]);
        let change = graph.apply_topology(&moved, &ProfileSet::new());

        assert_eq!(change.added, vec!["upf".to_string()]);
        assert_eq!(change.removed, vec!["upf".to_string()]);
        assert_eq!(graph.nf_type_of("upf"), NfType::Udm);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges().len(), 1);
        assert!(graph.node("upf").unwrap().is_connected_to("smf"));
        assert!(graph.node("smf").unwrap().is_connected_to("upf"));
    }
}
