use thiserror::Error;
use tracing::{debug, info};

use crate::encoder::encode_area;
use crate::error::AreaCompileError;
use crate::grid::{AreaCoord, EntityGrid, MapDimensions, TileGrid, AREA_HEIGHT, AREA_WIDTH};
use crate::registry::MapRegistries;
use crate::validator::GridValidator;

#[derive(Debug, Error)]
pub enum CompileMapError {
    #[error(
        "map dimensions ({width}x{height}) must be multiples of area size ({}x{})",
        AREA_WIDTH,
        AREA_HEIGHT
    )]
    UnalignedDimensions { width: u32, height: u32 },
    #[error(
        "entity layer is {entities_width}x{entities_height} but tile layer is {tiles_width}x{tiles_height}"
    )]
    LayerSizeMismatch {
        tiles_width: u32,
        tiles_height: u32,
        entities_width: u32,
        entities_height: u32,
    },
    #[error(transparent)]
    Area(#[from] AreaCompileError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMap {
    pub dimensions: MapDimensions,
    /// Encoded areas in scan order (area-Y outer, area-X inner).
    pub areas: Vec<(AreaCoord, String)>,
}

impl CompiledMap {
    pub fn area(&self, coord: AreaCoord) -> Option<&str> {
        self.areas
            .iter()
            .find(|(area, _)| *area == coord)
            .map(|(_, encoded)| encoded.as_str())
    }

    pub fn encoded_len(&self) -> usize {
        self.areas.iter().map(|(_, encoded)| encoded.len()).sum()
    }
}

/// Validates then encodes every area. The first failure aborts the whole map.
pub fn compile_map(
    tiles: &TileGrid,
    entities: &EntityGrid,
    registries: &MapRegistries,
) -> Result<CompiledMap, CompileMapError> {
    if tiles.width() != entities.width() || tiles.height() != entities.height() {
        return Err(CompileMapError::LayerSizeMismatch {
            tiles_width: tiles.width(),
            tiles_height: tiles.height(),
            entities_width: entities.width(),
            entities_height: entities.height(),
        });
    }
    let dimensions = MapDimensions::from_tiles(tiles.width(), tiles.height()).ok_or(
        CompileMapError::UnalignedDimensions {
            width: tiles.width(),
            height: tiles.height(),
        },
    )?;

    let validator = GridValidator::new(tiles, entities, registries, dimensions);
    let mut areas = Vec::with_capacity(dimensions.area_count());
    for area in dimensions.areas() {
        validator.validate_area(area)?;
        let encoded = encode_area(tiles, entities, area)?;
        debug!(
            area = %area.key(),
            encoded_len = encoded.len(),
            "map_area_compiled"
        );
        areas.push((area, encoded));
    }

    let compiled = CompiledMap { dimensions, areas };
    info!(
        width_areas = dimensions.width_areas,
        height_areas = dimensions.height_areas,
        area_count = compiled.areas.len(),
        entity_count = entities.count_nonzero(),
        encoded_bytes = compiled.encoded_len(),
        "map_compile_summary"
    );
    Ok(compiled)
}
