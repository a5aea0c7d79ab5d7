//! Save files: full world snapshots as pretty JSON or compact bincode.

use serde::{Deserialize, Serialize};
use sim_core::World;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Version written into every save; loading anything else is refused.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON save: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed binary save: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("save schema version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Json,
    Bincode,
}

impl SaveFormat {
    /// `.json` files are JSON, anything else is binary.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SaveFormat::Json,
            _ => SaveFormat::Bincode,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveFile {
    pub schema_version: u32,
    pub world: World,
}

#[derive(Serialize)]
struct SaveFileRef<'a> {
    schema_version: u32,
    world: &'a World,
}

/// Default location of the main save.
pub fn default_save_path() -> &'static str {
    "./saves/main.json"
}

fn checked(save: SaveFile) -> Result<World, PersistenceError> {
    if save.schema_version != SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: save.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(save.world)
}

pub fn encode(world: &World, format: SaveFormat) -> Result<Vec<u8>, PersistenceError> {
    let save = SaveFileRef {
        schema_version: SCHEMA_VERSION,
        world,
    };
    Ok(match format {
        SaveFormat::Json => serde_json::to_vec_pretty(&save)?,
        SaveFormat::Bincode => bincode::serialize(&save)?,
    })
}

pub fn decode(bytes: &[u8], format: SaveFormat) -> Result<World, PersistenceError> {
    let save: SaveFile = match format {
        SaveFormat::Json => serde_json::from_slice(bytes)?,
        SaveFormat::Bincode => bincode::deserialize(bytes)?,
    };
    checked(save)
}

/// Write a snapshot, creating parent directories; the format follows the
/// file extension.
pub fn save_world(world: &World, path: &Path) -> Result<(), PersistenceError> {
    let format = SaveFormat::from_path(path);
    let bytes = encode(world, format)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), ?format, bytes = bytes.len(), date = world.date, "world saved");
    Ok(())
}

pub fn load_world(path: &Path) -> Result<World, PersistenceError> {
    let format = SaveFormat::from_path(path);
    let bytes = std::fs::read(path)?;
    let world = decode(&bytes, format)?;
    info!(path = %path.display(), ?format, date = world.date, "world loaded");
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::scenario::demo_world;
    use sim_core::{Catalog, SimConfig};

    fn demo() -> World {
        demo_world(&Catalog::standard(), &SimConfig::default()).unwrap()
    }

    #[test]
    fn both_formats_restore_the_same_world() {
        let world = demo();
        let from_json = decode(&encode(&world, SaveFormat::Json).unwrap(), SaveFormat::Json).unwrap();
        let from_bin =
            decode(&encode(&world, SaveFormat::Bincode).unwrap(), SaveFormat::Bincode).unwrap();
        let reference = bincode::serialize(&world).unwrap();
        assert_eq!(bincode::serialize(&from_json).unwrap(), reference);
        assert_eq!(bincode::serialize(&from_bin).unwrap(), reference);
    }

    #[test]
    fn unknown_schema_is_refused() {
        let world = World::new(365);
        let json = serde_json::json!({ "schema_version": 99, "world": world });
        let err = decode(json.to_string().as_bytes(), SaveFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::UnsupportedVersion {
                found: 99,
                expected: SCHEMA_VERSION
            }
        ));
    }

    #[test]
    fn garbage_is_an_error_not_a_panic() {
        assert!(matches!(
            decode(b"{ nope", SaveFormat::Json),
            Err(PersistenceError::Json(_))
        ));
        assert!(matches!(
            decode(&[1, 2, 3], SaveFormat::Bincode),
            Err(PersistenceError::Bincode(_))
        ));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = std::env::temp_dir().join(format!("sector-saves-{}", std::process::id()));
        let path = dir.join("nested").join("world.bin");
        let world = demo();
        save_world(&world, &path).unwrap();
        let loaded = load_world(&path).unwrap();
        assert_eq!(loaded.date, world.date);
        assert_eq!(loaded.world_money(), world.world_money());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn extension_picks_the_format() {
        assert_eq!(SaveFormat::from_path(Path::new("a/b.JSON")), SaveFormat::Json);
        assert_eq!(SaveFormat::from_path(Path::new("a/b.bin")), SaveFormat::Bincode);
        assert_eq!(SaveFormat::from_path(Path::new("save")), SaveFormat::Bincode);
    }
}
