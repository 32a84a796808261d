use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;
use tracing::info;

pub const CONSTS_FILE_NAME: &str = "0consts.lua";
pub const AREA_FILE_NAME: &str = "area.lua";
pub const FOUNTAIN_ENTITY_NAME: &str = "FOUNTAIN";

const TILE_CONST_PATTERN: &str = r"local\s+TT_(\w+)\s*=\s*(\d+)";
const ENTITY_CONST_PATTERN: &str = r"local\s+ET_(\w+)\s*=\s*(\d+)";
const TILE_RECIPE_PATTERN: &str = r"\[TT_(\w+)\]\s*=\s*\{[^}]*flags\s*=\s*([^,}]*)";
const CLEAR_FLAG: &str = "TF_CLEAR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileTypeInfo {
    pub name: String,
    /// Units may stand on the tile; also the flag compared across area borders.
    pub is_clear: bool,
}

#[derive(Debug, Default, Clone)]
pub struct TileRegistry {
    tiles: BTreeMap<u32, TileTypeInfo>,
}

impl TileRegistry {
    pub fn from_entries(entries: impl IntoIterator<Item = (u32, TileTypeInfo)>) -> Self {
        Self {
            tiles: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&TileTypeInfo> {
        self.tiles.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.tiles.contains_key(&id)
    }

    /// Unknown ids are never clear.
    pub fn is_clear(&self, id: u32) -> bool {
        self.tiles.get(&id).is_some_and(|info| info.is_clear)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn clear_count(&self) -> usize {
        self.tiles.values().filter(|info| info.is_clear).count()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    fn id_by_name(&self, name: &str) -> Option<u32> {
        self.tiles
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, _)| *id)
    }
}

#[derive(Debug, Default, Clone)]
pub struct EntityTypeRegistry {
    ids_by_name: HashMap<String, u32>,
}

impl EntityTypeRegistry {
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, u32)>) -> Self {
        Self {
            ids_by_name: pairs
                .into_iter()
                .map(|(name, id)| (name.into(), id))
                .collect(),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.ids_by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids_by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids_by_name.is_empty()
    }
}

/// Lookup tables the compiler reads for the whole build.
#[derive(Debug, Default, Clone)]
pub struct MapRegistries {
    pub tiles: TileRegistry,
    pub entities: EntityTypeRegistry,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read constants file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid constant pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("constant TT_{name} value '{value}' does not fit a tile id")]
    InvalidTileId { name: String, value: String },
    #[error("constant ET_{name} value '{value}' does not fit an entity id")]
    InvalidEntityId { name: String, value: String },
}

/// Parses `local TT_*` / `local ET_*` definitions and the `TF_CLEAR` recipe flags.
pub fn parse_registries(consts_src: &str, area_src: &str) -> Result<MapRegistries, RegistryError> {
    let mut tiles = BTreeMap::<u32, TileTypeInfo>::new();
    let tile_pattern = Regex::new(TILE_CONST_PATTERN)?;
    for caps in tile_pattern.captures_iter(consts_src) {
        let name = caps[1].to_string();
        let id = caps[2]
            .parse::<u32>()
            .map_err(|_| RegistryError::InvalidTileId {
                name: name.clone(),
                value: caps[2].to_string(),
            })?;
        tiles.insert(
            id,
            TileTypeInfo {
                name,
                is_clear: false,
            },
        );
    }

    let mut entity_ids = HashMap::<String, u32>::new();
    let entity_pattern = Regex::new(ENTITY_CONST_PATTERN)?;
    for caps in entity_pattern.captures_iter(consts_src) {
        let name = caps[1].to_string();
        let id = caps[2]
            .parse::<u32>()
            .map_err(|_| RegistryError::InvalidEntityId {
                name: name.clone(),
                value: caps[2].to_string(),
            })?;
        entity_ids.insert(name, id);
    }

    let mut tiles = TileRegistry { tiles };
    let recipe_pattern = Regex::new(TILE_RECIPE_PATTERN)?;
    for caps in recipe_pattern.captures_iter(area_src) {
        if !caps[2].trim().contains(CLEAR_FLAG) {
            continue;
        }
        // Recipes for tiles with no TT_ constant are ignored.
        if let Some(id) = tiles.id_by_name(&caps[1]) {
            if let Some(info) = tiles.tiles.get_mut(&id) {
                info.is_clear = true;
            }
        }
    }

    Ok(MapRegistries {
        tiles,
        entities: EntityTypeRegistry {
            ids_by_name: entity_ids,
        },
    })
}

/// Raw text of the two constants files, kept so callers can hash exactly what
/// was parsed.
#[derive(Debug, Clone)]
pub struct RegistrySources {
    pub consts_path: PathBuf,
    pub area_path: PathBuf,
    pub consts_src: String,
    pub area_src: String,
}

impl RegistrySources {
    pub fn read(consts_dir: &Path) -> Result<Self, RegistryError> {
        let consts_path = consts_dir.join(CONSTS_FILE_NAME);
        let area_path = consts_dir.join(AREA_FILE_NAME);
        let consts_src = read_source(&consts_path)?;
        let area_src = read_source(&area_path)?;
        Ok(Self {
            consts_path,
            area_path,
            consts_src,
            area_src,
        })
    }

    pub fn parse(&self) -> Result<MapRegistries, RegistryError> {
        let registries = parse_registries(&self.consts_src, &self.area_src)?;
        info!(
            consts_path = %self.consts_path.display(),
            area_path = %self.area_path.display(),
            tile_type_count = registries.tiles.len(),
            clear_tile_count = registries.tiles.clear_count(),
            entity_type_count = registries.entities.len(),
            "map_registry_loaded"
        );
        Ok(registries)
    }
}

pub fn load_registries(consts_dir: &Path) -> Result<MapRegistries, RegistryError> {
    RegistrySources::read(consts_dir)?.parse()
}

pub fn has_consts_files(dir: &Path) -> bool {
    dir.join(CONSTS_FILE_NAME).is_file() && dir.join(AREA_FILE_NAME).is_file()
}

fn read_source(path: &Path) -> Result<String, RegistryError> {
    fs::read_to_string(path).map_err(|source| RegistryError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}
