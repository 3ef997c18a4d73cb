//! In-memory profile repository loaded from YAML documents on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::{NfIntent, ProfileRepository};
use crate::error::ProfileError;
use crate::types::NfType;

const UPF_TYPE: &str = "UpfType";
const SMF_TYPE: &str = "SmfType";
const UPF_CAPACITY_PROFILE: &str = "UpfCapacityProfile";
const SMF_CAPACITY_PROFILE: &str = "SmfCapacityProfile";

#[derive(Debug, Deserialize)]
struct ProfileDocument {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    metadata: ProfileMeta,
    #[serde(default)]
    spec: serde_yaml::Value,
}

#[derive(Debug, Deserialize, Default)]
struct ProfileMeta {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfTypeSpec {
    pub capacity_profile: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpfCapacitySpec {
    #[serde(default)]
    pub throughput: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmfCapacitySpec {
    #[serde(default)]
    pub max_sessions: String,
}

/// NF type and capacity profiles keyed by `metadata.name`.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    upf_types: HashMap<String, NfTypeSpec>,
    smf_types: HashMap<String, NfTypeSpec>,
    upf_capacity: HashMap<String, UpfCapacitySpec>,
    smf_capacity: HashMap<String, SmfCapacitySpec>,
}

impl ProfileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `.yaml`/`.yml` file below `dir`. Documents of other kinds
    /// are ignored.
    pub fn load_dir(dir: &Path) -> Result<Self, ProfileError> {
        let mut set = Self::new();
        for path in collect_yaml_files(dir)? {
            let content = std::fs::read_to_string(&path).map_err(|source| ProfileError::Io {
                path: path.clone(),
                source,
            })?;
            set.add_documents(&content)
                .map_err(|source| ProfileError::Parse {
                    path: path.clone(),
                    source,
                })?;
        }
        debug!(
            upf_types = set.upf_types.len(),
            smf_types = set.smf_types.len(),
            "Loaded NF profiles from {}",
            dir.display()
        );
        Ok(set)
    }

    /// Parse a (possibly multi-document) YAML string into the set.
    pub fn add_documents(&mut self, content: &str) -> Result<(), serde_yaml::Error> {
        for document in serde_yaml::Deserializer::from_str(content) {
            let doc = ProfileDocument::deserialize(document)?;
            let name = doc.metadata.name;
            match doc.kind.as_str() {
                UPF_TYPE => {
                    self.upf_types.insert(name, serde_yaml::from_value(doc.spec)?);
                }
                SMF_TYPE => {
                    self.smf_types.insert(name, serde_yaml::from_value(doc.spec)?);
                }
                UPF_CAPACITY_PROFILE => {
                    self.upf_capacity
                        .insert(name, serde_yaml::from_value(doc.spec)?);
                }
                SMF_CAPACITY_PROFILE => {
                    self.smf_capacity
                        .insert(name, serde_yaml::from_value(doc.spec)?);
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn insert_upf_type(&mut self, name: &str, capacity_profile: &str) {
        self.upf_types.insert(
            name.to_string(),
            NfTypeSpec {
                capacity_profile: capacity_profile.to_string(),
            },
        );
    }

    pub fn insert_smf_type(&mut self, name: &str, capacity_profile: &str) {
        self.smf_types.insert(
            name.to_string(),
            NfTypeSpec {
                capacity_profile: capacity_profile.to_string(),
            },
        );
    }

    pub fn insert_upf_capacity(&mut self, name: &str, throughput: &str) {
        self.upf_capacity.insert(
            name.to_string(),
            UpfCapacitySpec {
                throughput: throughput.to_string(),
            },
        );
    }

    pub fn insert_smf_capacity(&mut self, name: &str, max_sessions: &str) {
        self.smf_capacity.insert(
            name.to_string(),
            SmfCapacitySpec {
                max_sessions: max_sessions.to_string(),
            },
        );
    }

    fn upf_intent(&self, type_name: &str) -> Result<NfIntent, ProfileError> {
        let nf_type = self
            .upf_types
            .get(type_name)
            .ok_or_else(|| ProfileError::UnknownType {
                kind: UPF_TYPE,
                name: type_name.to_string(),
            })?;
        let capacity = self
            .upf_capacity
            .get(&nf_type.capacity_profile)
            .ok_or_else(|| ProfileError::UnknownCapacityProfile {
                kind: UPF_CAPACITY_PROFILE,
                name: nf_type.capacity_profile.clone(),
            })?;
        Ok(NfIntent::Upf {
            throughput: capacity.throughput.clone(),
        })
    }

    fn smf_intent(&self, type_name: &str) -> Result<NfIntent, ProfileError> {
        let nf_type = self
            .smf_types
            .get(type_name)
            .ok_or_else(|| ProfileError::UnknownType {
                kind: SMF_TYPE,
                name: type_name.to_string(),
            })?;
        let capacity = self
            .smf_capacity
            .get(&nf_type.capacity_profile)
            .ok_or_else(|| ProfileError::UnknownCapacityProfile {
                kind: SMF_CAPACITY_PROFILE,
                name: nf_type.capacity_profile.clone(),
            })?;
        Ok(NfIntent::Smf {
            max_sessions: capacity.max_sessions.clone(),
        })
    }
}

impl ProfileRepository for ProfileSet {
    fn resolve_intent(&self, nf_type: NfType, type_name: &str) -> Result<NfIntent, ProfileError> {
        match nf_type {
            NfType::Upf => self.upf_intent(type_name),
            NfType::Smf => self.smf_intent(type_name),
            NfType::Ausf | NfType::Udm => Ok(NfIntent::None),
            other => Err(ProfileError::Unsupported(other)),
        }
    }
}

fn collect_yaml_files(dir: &Path) -> Result<Vec<PathBuf>, ProfileError> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(|source| ProfileError::Io {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let path = entry
                .map_err(|source| ProfileError::Io {
                    path: current.clone(),
                    source,
                })?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}
