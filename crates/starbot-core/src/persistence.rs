//! Load/save of [`Memory`] around a tick
//!
//! The host keeps memory as a JSON document between ticks. A [`MemoryStore`]
//! makes that boundary explicit: the controller loads before the scheduling
//! pass and saves after it. Binary checkpoints of the same data use bincode
//! with a format version, for replays and offline inspection.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::memory::Memory;

/// Version number for checkpoint format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serialized memory above this size is reported; the host truncates near it.
pub const MEMORY_SIZE_WARN_BYTES: usize = 1_048_576;

/// Where memory lives between ticks
pub trait MemoryStore {
    fn load(&mut self) -> Result<Memory, SaveError>;
    fn save(&mut self, memory: &Memory) -> Result<(), SaveError>;
}

fn to_json(memory: &Memory) -> Result<Vec<u8>, SaveError> {
    let bytes = serde_json::to_vec(memory)?;
    if bytes.len() > MEMORY_SIZE_WARN_BYTES {
        log::warn!(
            "Memory is {} bytes, above the {} byte limit",
            bytes.len(),
            MEMORY_SIZE_WARN_BYTES
        );
    }
    Ok(bytes)
}

/// Memory kept as a JSON file in the host layout
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemoryStore for JsonFileStore {
    fn load(&mut self) -> Result<Memory, SaveError> {
        if !self.path.exists() {
            log::info!("No memory at {}, starting fresh", self.path.display());
            return Ok(Memory::default());
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&mut self, memory: &Memory) -> Result<(), SaveError> {
        let bytes = to_json(memory)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }
}

/// Memory kept as JSON bytes in process
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    bytes: Option<Vec<u8>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing JSON document
    pub fn from_json(json: &str) -> Self {
        Self {
            bytes: Some(json.as_bytes().to_vec()),
        }
    }

    /// The last saved document, if any
    pub fn as_json(&self) -> Option<&str> {
        self.bytes
            .as_deref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

impl MemoryStore for InMemoryStore {
    fn load(&mut self) -> Result<Memory, SaveError> {
        match &self.bytes {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(Memory::default()),
        }
    }

    fn save(&mut self, memory: &Memory) -> Result<(), SaveError> {
        self.bytes = Some(to_json(memory)?);
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    tick: u64,
    memory: Memory,
}

/// A binary checkpoint read back by [`load_snapshot`]
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Host time the checkpoint was taken at
    pub tick: u64,
    pub memory: Memory,
}

/// Write a versioned binary checkpoint of `memory`
pub fn save_snapshot<W: Write>(writer: W, tick: u64, memory: &Memory) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        tick,
        memory: memory.clone(),
    };
    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

pub fn load_snapshot<R: Read>(reader: R) -> Result<Checkpoint, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    Ok(Checkpoint {
        tick: save_data.tick,
        memory: save_data.memory,
    })
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<serde_json::Error> for SaveError {
    fn from(e: serde_json::Error) -> Self {
        SaveError::Json(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Json(e) => write!(f, "Memory format error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::{IdGenerator, Task};

    fn sample() -> Memory {
        let mut ids = IdGenerator::new(Some(3));
        let mut memory = Memory::new();
        let mut task = Task::harvest(&mut ids, 2, "Cuprum", "metal", 25, Some(9), 2);
        task.ship_ids.push(14);
        memory.ship_mut(14).task_id = Some(task.id.clone());
        memory.ship_mut(14).working = true;
        memory.structure_mut(9);
        memory
            .galaxy_mut(2)
            .task_list
            .push(Task::build(&mut ids, 2, "Terra", "factory", 1));
        memory.galaxy_mut(2).task_list.push(task);
        memory
    }

    #[test]
    fn test_in_memory_store_starts_empty() {
        let mut store = InMemoryStore::new();
        assert_eq!(store.load().unwrap(), Memory::default());
        assert!(store.as_json().is_none());
    }

    #[test]
    fn test_in_memory_store_keeps_host_layout() {
        let mut store = InMemoryStore::new();
        let memory = sample();
        store.save(&memory).unwrap();

        let json: serde_json::Value = serde_json::from_str(store.as_json().unwrap()).unwrap();
        assert_eq!(json["myShips"]["14"]["working"], true);
        assert!(json["myStructures"]["9"].is_object());
        let tasks = json["myGalaxies"]["2"]["taskList"].as_array().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1]["shipIds"][0], 14);
        assert_eq!(tasks[1]["kind"]["harvest"]["storageId"], 9);

        assert_eq!(store.load().unwrap(), memory);
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let path = std::env::temp_dir().join(format!("starbot-memory-{}.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let mut store = JsonFileStore::new(&path);

        // Missing file is an empty memory
        assert_eq!(store.load().unwrap(), Memory::default());

        let memory = sample();
        store.save(&memory).unwrap();
        assert_eq!(store.load().unwrap(), memory);

        std::fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(store.load(), Err(SaveError::Json(_))));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let memory = sample();
        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, 77, &memory).expect("Save failed");

        let checkpoint = load_snapshot(&buffer[..]).expect("Load failed");
        assert_eq!(checkpoint.tick, 77);
        assert_eq!(checkpoint.memory, memory);
    }

    #[test]
    fn test_checkpoint_version_mismatch() {
        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, 1, &Memory::new()).unwrap();
        // Version is the leading little-endian u32
        buffer[0] = 99;

        match load_snapshot(&buffer[..]) {
            Err(SaveError::VersionMismatch { expected, found }) => {
                assert_eq!(expected, SAVE_VERSION);
                assert_eq!(found, 99);
            }
            other => panic!("expected version mismatch, got {:?}", other.map(|c| c.tick)),
        }
    }
}
