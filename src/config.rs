//! Replay configuration document.
//!
//! ```json
//! {
//!   "participant": "Fluid",
//!   "precice-config": "precice-config.xml",
//!   "startdt": 1,
//!   "meshes": [
//!     {
//!       "mesh": "Fluid-Mesh",
//!       "meshfileprefix": "./fluid/Fluid",
//!       "read-data": { "scalar": [], "vector": ["Forces"] },
//!       "write-data": { "scalar": ["Temperature"], "vector": [] }
//!     }
//!   ]
//! }
//! ```
//!
//! `starttime` is accepted as an alias of `startdt`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coupling::interface::{FieldSpec, InterfaceDescriptor};
use crate::data::mesh_data::DataKind;
use crate::error::EmulatorError;

/// Scalar and vector field names of one direction.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataNames {
    pub scalar: Vec<String>,
    pub vector: Vec<String>,
}

impl DataNames {
    fn names(&self) -> impl Iterator<Item = &String> {
        self.scalar.iter().chain(&self.vector)
    }
}

/// One coupling interface of the replay configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct InterfaceConfig {
    /// Mesh name inside the coupling session.
    #[serde(rename = "mesh")]
    pub mesh_name: String,
    /// Prefix of the snapshot series.
    #[serde(rename = "meshfileprefix")]
    pub mesh_file_prefix: String,
    #[serde(rename = "read-data", default)]
    pub read_data: DataNames,
    #[serde(rename = "write-data", default)]
    pub write_data: DataNames,
}

impl InterfaceConfig {
    /// Field list in declaration order: write vectors, read vectors, write
    /// scalars, read scalars.
    pub fn fields(&self) -> Vec<FieldSpec> {
        let specs = |names: &[String], kind, vector| {
            names
                .iter()
                .map(|name| FieldSpec::named(kind, name.as_str(), vector))
                .collect::<Vec<_>>()
        };
        [
            specs(&self.write_data.vector, DataKind::Write, true),
            specs(&self.read_data.vector, DataKind::Read, true),
            specs(&self.write_data.scalar, DataKind::Write, false),
            specs(&self.read_data.scalar, DataKind::Read, false),
        ]
        .concat()
    }

    pub fn descriptor(&self) -> InterfaceDescriptor {
        InterfaceDescriptor::new(
            self.mesh_name.as_str(),
            self.mesh_file_prefix.as_str(),
            self.fields(),
        )
    }
}

/// Configuration of a replay run.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Configuration file handed to the coupling session.
    #[serde(rename = "precice-config")]
    pub session_config: PathBuf,
    pub participant: String,
    /// Timestep number of the first replayed round; at least 1.
    #[serde(rename = "startdt", alias = "starttime")]
    pub start_round: usize,
    #[serde(rename = "meshes")]
    pub interfaces: Vec<InterfaceConfig>,
}

impl ReplayConfig {
    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, EmulatorError> {
        let text = fs::read_to_string(path).map_err(|e| {
            EmulatorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(text: &str) -> Result<Self, EmulatorError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EmulatorError> {
        if self.start_round < 1 {
            return Err(EmulatorError::Config(
                "start time cannot be smaller than 1".into(),
            ));
        }
        if self.participant.trim().is_empty() {
            return Err(EmulatorError::Config("participant name is empty".into()));
        }
        if self.interfaces.is_empty() {
            return Err(EmulatorError::Config("no meshes configured".into()));
        }
        for (i, iface) in self.interfaces.iter().enumerate() {
            if iface.mesh_name.trim().is_empty() {
                return Err(EmulatorError::Config(format!("mesh {i} has no name")));
            }
            if iface.mesh_file_prefix.trim().is_empty() {
                return Err(EmulatorError::Config(format!(
                    "mesh `{}` has no meshfileprefix",
                    iface.mesh_name
                )));
            }
            let mut names = iface.read_data.names().chain(iface.write_data.names());
            if let Some(empty) = names.position(|n| n.trim().is_empty()) {
                return Err(EmulatorError::Config(format!(
                    "mesh `{}` declares an empty data name (entry {empty})",
                    iface.mesh_name
                )));
            }
        }
        Ok(())
    }

    pub fn descriptors(&self) -> Vec<InterfaceDescriptor> {
        self.interfaces.iter().map(InterfaceConfig::descriptor).collect()
    }
}
