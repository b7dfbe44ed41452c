//! Discovery of snapshot series and rank-aware file naming.
//!
//! # Layout
//! For a prefix `p`, a series is either the single file `p.vtk`, or
//! `[p.init.vtk] p.dt1.vtk … p.dtN.vtk [p.final.vtk]`. Under parallel
//! execution every name carries the rank before the extension, e.g.
//! `p.dt3_2.vtk` for rank 2.
//!
//! # Termination
//! Timestep files are found with a single directory listing rather than
//! probing `dt1, dt2, …` until one is missing. The series must be contiguous
//! from `dt1`: if `dtK` is missing while a later `dtM` exists, discovery fails
//! with [`EmulatorError::SnapshotGap`]. `dt0` is not part of a series and is
//! ignored.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::ExecutionContext;
use crate::error::EmulatorError;

const EXTENSION: &str = ".vtk";

/// Position of a snapshot within its series.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SnapshotKind {
    /// The only file of a stationary series.
    Single,
    /// Initial state before the first timestep.
    Init,
    /// Timestep `n`, starting at 1.
    Step(usize),
    /// Final state after the last timestep.
    Final,
}

/// One mesh-plus-data file of a series.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub kind: SnapshotKind,
    pub path: PathBuf,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn rank_suffix(context: &ExecutionContext) -> String {
    if context.is_parallel() {
        format!("_{}", context.rank)
    } else {
        String::new()
    }
}

/// File name of `prefix` + `infix` for the local rank.
pub fn snapshot_path(prefix: &str, infix: &str, context: &ExecutionContext) -> PathBuf {
    PathBuf::from(format!(
        "{prefix}{infix}{}{EXTENSION}",
        rank_suffix(context)
    ))
}

/// Where the local rank writes final results for `output`.
///
/// Serial runs write `output.vtk`, parallel runs `output_<rank>.vtk`.
pub fn output_path(output: &str, context: &ExecutionContext) -> PathBuf {
    snapshot_path(output, "", context)
}

/// Files in the directory of `prefix` named `{stem}{head}<n>{tail}`, keyed by `n`.
fn numbered_files(
    prefix: &str,
    head: &str,
    tail: &str,
) -> Result<BTreeMap<usize, PathBuf>, EmulatorError> {
    let prefix_path = Path::new(prefix);
    let dir = match prefix_path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Some(stem) = prefix_path.file_name().and_then(|s| s.to_str()) else {
        return Ok(BTreeMap::new());
    };
    if !dir.is_dir() {
        return Ok(BTreeMap::new());
    }
    let head = format!("{stem}{head}");

    let mut found = BTreeMap::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(digits) = name
            .strip_prefix(head.as_str())
            .and_then(|rest| rest.strip_suffix(tail))
        else {
            continue;
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(n) = digits.parse::<usize>() {
            found.insert(n, entry.path());
        }
    }
    Ok(found)
}

/// Timestep numbers present next to `prefix` for the local rank.
fn step_numbers(
    prefix: &str,
    context: &ExecutionContext,
) -> Result<BTreeSet<usize>, EmulatorError> {
    let tail = format!("{}{EXTENSION}", rank_suffix(context));
    let steps = numbered_files(prefix, ".dt", &tail)?;
    Ok(steps.into_keys().filter(|&n| n >= 1).collect())
}

/// Result files of `output` left by earlier runs.
///
/// Serial: `output.vtk` if it exists. Parallel: every `output_<rank>.vtk`,
/// including ranks beyond the current size. Nothing else in the directory is
/// reported.
pub fn existing_outputs(
    output: &str,
    context: &ExecutionContext,
) -> Result<Vec<PathBuf>, EmulatorError> {
    if !context.is_parallel() {
        let path = output_path(output, context);
        return Ok(if path.is_file() { vec![path] } else { Vec::new() });
    }
    Ok(numbered_files(output, "_", EXTENSION)?.into_values().collect())
}

/// Resolve the ordered snapshot series for `prefix` on the local rank.
pub fn find_all(prefix: &str, context: &ExecutionContext) -> Result<Vec<Snapshot>, EmulatorError> {
    let single = snapshot_path(prefix, "", context);
    if single.is_file() {
        log::debug!("Found single mesh {}", single.display());
        return Ok(vec![Snapshot {
            kind: SnapshotKind::Single,
            path: single,
        }]);
    }

    let mut series = Vec::new();
    let init = snapshot_path(prefix, ".init", context);
    if init.is_file() {
        series.push(Snapshot {
            kind: SnapshotKind::Init,
            path: init,
        });
    }

    let steps = step_numbers(prefix, context)?;
    let mut expected = 1;
    for &n in &steps {
        if n != expected {
            return Err(EmulatorError::SnapshotGap {
                prefix: prefix.to_string(),
                missing: expected,
                found: n,
            });
        }
        series.push(Snapshot {
            kind: SnapshotKind::Step(n),
            path: snapshot_path(prefix, &format!(".dt{n}"), context),
        });
        expected += 1;
    }

    let fin = snapshot_path(prefix, ".final", context);
    if fin.is_file() {
        series.push(Snapshot {
            kind: SnapshotKind::Final,
            path: fin,
        });
    }

    if series.is_empty() {
        return Err(EmulatorError::NoSnapshots {
            prefix: prefix.to_string(),
        });
    }
    log::debug!("Total number of detected meshes for {prefix}: {}", series.len());
    Ok(series)
}

/// Index of the snapshot for timestep `start`, matched by exact number.
pub fn start_position(series: &[Snapshot], start: usize) -> Option<usize> {
    series
        .iter()
        .position(|s| s.kind == SnapshotKind::Step(start))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_carry_rank_only_in_parallel() {
        let serial = ExecutionContext::default();
        let par = ExecutionContext::new(2, 4);
        assert_eq!(
            snapshot_path("out/mesh", ".dt3", &serial),
            PathBuf::from("out/mesh.dt3.vtk")
        );
        assert_eq!(
            snapshot_path("out/mesh", ".dt3", &par),
            PathBuf::from("out/mesh.dt3_2.vtk")
        );
        assert_eq!(output_path("result", &par), PathBuf::from("result_2.vtk"));
    }

    #[test]
    fn start_position_uses_exact_step_numbers() {
        let series: Vec<Snapshot> = [SnapshotKind::Init]
            .into_iter()
            .chain((1..=12).map(SnapshotKind::Step))
            .map(|kind| Snapshot {
                kind,
                path: PathBuf::new(),
            })
            .collect();
        assert_eq!(start_position(&series, 1), Some(1));
        assert_eq!(start_position(&series, 10), Some(10));
        assert_eq!(start_position(&series, 13), None);
    }

    #[test]
    fn existing_outputs_only_lists_rank_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["mapped_0.vtk", "mapped_3.vtk", "mapped.vtk", "mapped_x.vtk", "B_0.vtk"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let output = dir.path().join("mapped");
        let output = output.to_str().unwrap();

        let parallel = existing_outputs(output, &ExecutionContext::new(0, 2)).unwrap();
        assert_eq!(
            parallel,
            vec![dir.path().join("mapped_0.vtk"), dir.path().join("mapped_3.vtk")]
        );
        let serial = existing_outputs(output, &ExecutionContext::default()).unwrap();
        assert_eq!(serial, vec![dir.path().join("mapped.vtk")]);
        let none = dir.path().join("other");
        assert!(existing_outputs(none.to_str().unwrap(), &ExecutionContext::default())
            .unwrap()
            .is_empty());
    }
}
