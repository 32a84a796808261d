use crate::error::{AreaCompileError, AreaErrorCode};
use crate::grid::{
    AreaCoord, EntityGrid, MapDimensions, TileGrid, WorldPos, AREA_HEIGHT, AREA_WIDTH,
    ENT_ETYPE_BASE,
};
use crate::registry::{MapRegistries, FOUNTAIN_ENTITY_NAME};

const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BorderEdge {
    Right,
    Bottom,
}

impl BorderEdge {
    fn label(self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::Bottom => "bottom",
        }
    }
}

/// Read-only checker for the structural rules every area must satisfy
/// before it can be encoded.
///
/// Each area checks only its right and bottom borders, so every shared
/// border is compared exactly once over a full row-major pass.
#[derive(Debug, Clone, Copy)]
pub struct GridValidator<'a> {
    tiles: &'a TileGrid,
    entities: &'a EntityGrid,
    registries: &'a MapRegistries,
    dimensions: MapDimensions,
}

impl<'a> GridValidator<'a> {
    pub fn new(
        tiles: &'a TileGrid,
        entities: &'a EntityGrid,
        registries: &'a MapRegistries,
        dimensions: MapDimensions,
    ) -> Self {
        Self {
            tiles,
            entities,
            registries,
            dimensions,
        }
    }

    pub fn validate_area(&self, area: AreaCoord) -> Result<(), AreaCompileError> {
        for local_y in 0..AREA_HEIGHT {
            for local_x in 0..AREA_WIDTH {
                let pos = area.world_of(local_x, local_y);
                let tile = self.tiles.get(pos.x, pos.y);
                let ent = self.entities.get(pos.x, pos.y);

                self.check_tile(tile, pos, area)?;
                self.check_entity(ent, pos, area)?;

                if ent >= ENT_ETYPE_BASE && ent - ENT_ETYPE_BASE == self.fountain_id(area)? {
                    self.check_fountain_surroundings(pos, area)?;
                }
            }
        }

        if self.dimensions.has_right_neighbor(area) {
            let this_x = area.origin().x + AREA_WIDTH as i32 - 1;
            for local_y in 0..AREA_HEIGHT {
                let y = area.origin().y + local_y as i32;
                self.check_border(
                    WorldPos { x: this_x, y },
                    WorldPos { x: this_x + 1, y },
                    area,
                    BorderEdge::Right,
                )?;
            }
        }

        if self.dimensions.has_bottom_neighbor(area) {
            let this_y = area.origin().y + AREA_HEIGHT as i32 - 1;
            for local_x in 0..AREA_WIDTH {
                let x = area.origin().x + local_x as i32;
                self.check_border(
                    WorldPos { x, y: this_y },
                    WorldPos { x, y: this_y + 1 },
                    area,
                    BorderEdge::Bottom,
                )?;
            }
        }

        Ok(())
    }

    /// Validates every area in scan order and stops at the first failure.
    pub fn validate_all(&self) -> Result<(), AreaCompileError> {
        for area in self.dimensions.areas() {
            self.validate_area(area)?;
        }
        Ok(())
    }

    fn fountain_id(&self, area: AreaCoord) -> Result<u32, AreaCompileError> {
        self.registries
            .entities
            .id_of(FOUNTAIN_ENTITY_NAME)
            .ok_or_else(|| {
                AreaCompileError::in_area(
                    AreaErrorCode::MissingRegistryEntry,
                    format!(
                        "entity type {FOUNTAIN_ENTITY_NAME} is not defined in the entity registry"
                    ),
                    area,
                )
            })
    }

    fn check_tile(
        &self,
        tile: u32,
        pos: WorldPos,
        area: AreaCoord,
    ) -> Result<(), AreaCompileError> {
        if tile >= ENT_ETYPE_BASE {
            return Err(AreaCompileError::at(
                AreaErrorCode::InvalidTile,
                format!(
                    "invalid tile value {tile} at ({},{}); must be in range 0-{}",
                    pos.x,
                    pos.y,
                    ENT_ETYPE_BASE - 1
                ),
                area,
                pos,
            ));
        }
        if !self.registries.tiles.contains(tile) {
            return Err(AreaCompileError::at(
                AreaErrorCode::InvalidTile,
                format!(
                    "unknown tile type {tile} at ({},{}); not defined in the tile registry",
                    pos.x, pos.y
                ),
                area,
                pos,
            ));
        }
        Ok(())
    }

    fn check_entity(
        &self,
        ent: u32,
        pos: WorldPos,
        area: AreaCoord,
    ) -> Result<(), AreaCompileError> {
        if ent != 0 && ent < ENT_ETYPE_BASE {
            return Err(AreaCompileError::at(
                AreaErrorCode::InvalidEntity,
                format!(
                    "invalid entity value {ent} at ({},{}); must be 0 or >= {ENT_ETYPE_BASE}",
                    pos.x, pos.y
                ),
                area,
                pos,
            ));
        }
        Ok(())
    }

    fn check_fountain_surroundings(
        &self,
        pos: WorldPos,
        area: AreaCoord,
    ) -> Result<(), AreaCompileError> {
        for (dx, dy) in NEIGHBOR_OFFSETS {
            let neighbor = pos.offset(dx, dy);
            if !self.is_clear(neighbor) {
                return Err(AreaCompileError::at(
                    AreaErrorCode::FountainSurroundingViolation,
                    format!(
                        "fountain at ({},{}) has non-clear tile at neighbor ({},{})",
                        pos.x, pos.y, neighbor.x, neighbor.y
                    ),
                    area,
                    pos,
                ));
            }
            let neighbor_ent = self.entities.get(neighbor.x, neighbor.y);
            if neighbor_ent != 0 {
                return Err(AreaCompileError::at(
                    AreaErrorCode::FountainSurroundingViolation,
                    format!(
                        "fountain at ({},{}) has entity {neighbor_ent} at neighbor ({},{})",
                        pos.x, pos.y, neighbor.x, neighbor.y
                    ),
                    area,
                    pos,
                ));
            }
        }
        Ok(())
    }

    fn check_border(
        &self,
        this: WorldPos,
        next: WorldPos,
        area: AreaCoord,
        edge: BorderEdge,
    ) -> Result<(), AreaCompileError> {
        let this_clear = self.is_clear(this);
        let next_clear = self.is_clear(next);
        if this_clear != next_clear {
            return Err(AreaCompileError::at(
                AreaErrorCode::BorderMismatch,
                format!(
                    "border clearness mismatch at {} edge: tile ({},{}) clear={this_clear} vs adjacent tile ({},{}) clear={next_clear}",
                    edge.label(),
                    this.x,
                    this.y,
                    next.x,
                    next.y
                ),
                area,
                this,
            ));
        }
        Ok(())
    }

    fn is_clear(&self, pos: WorldPos) -> bool {
        self.registries.tiles.is_clear(self.tiles.get(pos.x, pos.y))
    }
}

pub fn validate_area(
    tiles: &TileGrid,
    entities: &EntityGrid,
    registries: &MapRegistries,
    area: AreaCoord,
    dimensions: MapDimensions,
) -> Result<(), AreaCompileError> {
    GridValidator::new(tiles, entities, registries, dimensions).validate_area(area)
}
