//! State persistence
//!
//! Writes [`ArchipelagoState`] snapshots to disk and reads them back, in a
//! human-readable JSON form or a compact binary form. Binary files carry
//! magic bytes and a version header so the reader can detect the format and
//! refuse files from a newer library.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::state::{ArchipelagoState, STATE_VERSION};
use crate::error::CheckpointError;

const MAGIC: &[u8; 4] = b"PLGO";

/// On-disk format of a state file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StateFormat {
    /// Human-readable JSON
    Json,
    /// Compact binary with a magic/version header
    #[default]
    Binary,
}

/// Write a state snapshot to `path`
pub fn save_state(
    path: impl AsRef<Path>,
    state: &ArchipelagoState,
    format: StateFormat,
) -> Result<(), CheckpointError> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    match format {
        StateFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
        StateFormat::Binary => {
            writer.write_all(&STATE_VERSION.to_le_bytes())?;
            writer.write_all(MAGIC)?;
            bincode::serialize_into(&mut writer, state)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read a state snapshot from `path`, detecting the format
pub fn load_state(path: impl AsRef<Path>) -> Result<ArchipelagoState, CheckpointError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut header = [0u8; 8];
    match reader.read_exact(&mut header) {
        Ok(()) if &header[4..8] == MAGIC => {
            let version = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            if version > STATE_VERSION {
                return Err(CheckpointError::VersionMismatch {
                    expected: STATE_VERSION,
                    found: version,
                });
            }
            read_bincode(&mut reader)
        }
        _ => {
            // No binary header: re-read the whole file as JSON.
            let file = File::open(path)?;
            serde_json::from_reader(BufReader::new(file))
                .map_err(|e| CheckpointError::Deserialization(e.to_string()))
        }
    }
}

fn read_bincode<T: Serialize + DeserializeOwned>(
    reader: &mut impl Read,
) -> Result<T, CheckpointError> {
    bincode::deserialize_from(reader).map_err(|e| CheckpointError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{Algorithm, NullAlgorithm};
    use crate::archipelago::Archipelago;
    use crate::problem::benchmarks::Sphere;
    use crate::problem::Problem;
    use tempfile::tempdir;

    fn sample_state() -> ArchipelagoState {
        Archipelago::builder()
            .islands(2)
            .algorithm(Algorithm::new(NullAlgorithm))
            .problem(Problem::new(Sphere::new(2)).unwrap())
            .pop_size(3)
            .seed(42)
            .build()
            .unwrap()
            .state()
            .unwrap()
    }

    #[test]
    fn test_save_load_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archi.json");
        let state = sample_state();
        save_state(&path, &state, StateFormat::Json).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_save_load_binary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archi.state");
        let state = sample_state();
        save_state(&path, &state, StateFormat::Binary).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let r = load_state(dir.path().join("absent.state"));
        assert!(matches!(r, Err(CheckpointError::Io(_))));
    }

    #[test]
    fn test_load_garbage_fails_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.state");
        std::fs::write(&path, b"definitely not a state file").unwrap();
        let r = load_state(&path);
        assert!(matches!(r, Err(CheckpointError::Deserialization(_))));
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.state");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(STATE_VERSION + 1).to_le_bytes());
        bytes.extend_from_slice(MAGIC);
        std::fs::write(&path, bytes).unwrap();
        let r = load_state(&path);
        assert!(matches!(r, Err(CheckpointError::VersionMismatch { .. })));
    }
}
