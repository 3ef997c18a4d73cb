//! Building deployment graphs from declared topologies and on-disk profiles.

mod support;

use std::fs;

use tempfile::TempDir;

use nfdeploy_core::graph::DeploymentGraph;
use nfdeploy_core::profile::{NfIntent, ProfileSet};
use nfdeploy_core::topology::{NfDeployResource, Site, Topology};
use nfdeploy_core::types::NfType;

use support::resource;

const FREE5GC: &str = r#"
metadata:
  name: free5gc
  namespace: telco
  generation: 2
spec:
  sites:
    - id: upf-edge
      nfType: upf
      nfTypeName: upf-small
      clusterName: edge-1
      connectivities:
        - neighborName: smf-core
    - id: smf-core
      nfType: smf
      nfTypeName: smf-large
      clusterName: core
      connectivities:
        - neighborName: upf-edge
        - neighborName: amf-core
    - id: amf-core
      nfType: amf
      clusterName: core
      connectivities:
        - neighborName: smf-core
    - id: udm-core
      nfType: udm
      clusterName: core
"#;

fn profiles_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("types.yaml"),
        r#"
kind: UpfType
metadata:
  name: upf-small
spec:
  capacityProfile: small
---
kind: SmfType
metadata:
  name: smf-large
spec:
  capacityProfile: large
"#,
    )
    .unwrap();
    fs::create_dir(dir.path().join("capacity")).unwrap();
    fs::write(
        dir.path().join("capacity").join("profiles.yml"),
        r#"
kind: UpfCapacityProfile
metadata:
  name: small
spec:
  throughput: 5G
---
kind: SmfCapacityProfile
metadata:
  name: large
spec:
  maxSessions: "500000"
---
kind: ConfigMap
metadata:
  name: ignored
"#,
    )
    .unwrap();
    fs::write(dir.path().join("README.md"), "not a profile").unwrap();
    dir
}

fn build(topology: &Topology, profiles: &ProfileSet) -> DeploymentGraph {
    let mut graph = DeploymentGraph::new();
    graph.apply_topology(topology, profiles);
    graph
}

#[test]
fn nodes_are_enriched_from_profiles_on_disk() {
    let dir = profiles_dir();
    let profiles = ProfileSet::load_dir(dir.path()).unwrap();
    let resource = resource(FREE5GC);
    let graph = build(&resource.spec, &profiles);

    let upf = graph.node("upf-edge").unwrap();
    assert_eq!(upf.spec.cluster_name, "edge-1");
    assert_eq!(
        upf.spec.intent,
        NfIntent::Upf {
            throughput: "5G".to_string()
        }
    );
    let smf = graph.node("smf-core").unwrap();
    assert_eq!(
        smf.spec.intent,
        NfIntent::Smf {
            max_sessions: "500000".to_string()
        }
    );
    assert_eq!(graph.node("udm-core").unwrap().spec.intent, NfIntent::None);
}

#[test]
fn untracked_sites_are_left_out() {
    let graph = build(&resource(FREE5GC).spec, &ProfileSet::new());

    assert_eq!(graph.len(), 3);
    assert!(graph.node("amf-core").is_none());
    assert_eq!(graph.nf_type_of("amf-core"), NfType::Unspecified);
    assert!(graph.has_edge("upf-edge", "smf-core"));
    // The edge to an untracked NF is kept on the tracked side only.
    assert!(graph.has_edge("smf-core", "amf-core"));
    assert!(graph.node("smf-core").unwrap().is_connected_to("amf-core"));
    assert_eq!(graph.nodes_of_type(NfType::Udm).count(), 1);
}

#[test]
fn reapplying_a_topology_changes_nothing() {
    let dir = profiles_dir();
    let profiles = ProfileSet::load_dir(dir.path()).unwrap();
    let topology = resource(FREE5GC).spec;

    let mut graph = build(&topology, &profiles);
    let first: Vec<_> = graph.nodes().cloned().collect();
    let first_edges = graph.edges().to_vec();

    let change = graph.apply_topology(&topology, &profiles);
    assert!(change.is_empty());
    assert_eq!(graph.nodes().cloned().collect::<Vec<_>>(), first);
    assert_eq!(graph.edges(), first_edges.as_slice());
}

#[test]
fn removed_site_takes_its_edges_along() {
    let mut topology = resource(FREE5GC).spec;
    let mut graph = build(&topology, &ProfileSet::new());

    topology.sites.retain(|site| site.id != "smf-core");
    let change = graph.apply_topology(&topology, &ProfileSet::new());

    assert_eq!(change.removed, vec!["smf-core".to_string()]);
    assert!(change.added.is_empty());
    assert!(graph.edges().is_empty());
    assert!(graph.node("upf-edge").unwrap().connections.is_empty());
}

#[test]
fn site_changing_type_is_moved_between_partitions() {
    let mut topology = Topology::new(vec![
        Site::new("nf-1", NfType::Ausf).connected_to("udm-1"),
        Site::new("udm-1", NfType::Udm).connected_to("nf-1"),
    ]);
    let mut graph = build(&topology, &ProfileSet::new());
    assert_eq!(graph.nf_type_of("nf-1"), NfType::Ausf);

    topology.sites[0].nf_type = NfType::Upf;
    let change = graph.apply_topology(&topology, &ProfileSet::new());

    assert_eq!(change.added, vec!["nf-1".to_string()]);
    assert_eq!(change.removed, vec!["nf-1".to_string()]);
    assert_eq!(graph.nf_type_of("nf-1"), NfType::Upf);
    assert_eq!(graph.nodes_of_type(NfType::Ausf).count(), 0);
    assert_eq!(graph.len(), 2);
    assert!(graph.has_edge("nf-1", "udm-1"));
    assert!(graph.node("udm-1").unwrap().is_connected_to("nf-1"));
}

#[test]
fn clusters_are_listed_once_in_declaration_order() {
    let resource: NfDeployResource = resource(FREE5GC);
    assert_eq!(resource.spec.clusters(), vec!["edge-1", "core"]);
    assert_eq!(resource.key().to_string(), "telco/free5gc");
}

#[test]
fn missing_profile_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(ProfileSet::load_dir(&dir.path().join("absent")).is_err());
}
