use thiserror::Error;

/// Width of an area in tiles.
pub const AREA_WIDTH: u32 = 16;
/// Height of an area in tiles.
pub const AREA_HEIGHT: u32 = 12;
/// Entity code corresponding to entity type 0. Smaller non-zero codes are tiles.
pub const ENT_ETYPE_BASE: u32 = 36;

const MAX_MAP_SIDE: u32 = i32::MAX as u32;

/// Dense row-major layer of a map.
///
/// Convention:
/// - `(0,0)` is the top-left cell, `x` grows right and `y` grows down.
/// - Reads outside the layer resolve to 0 (no tile / no entity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGrid {
    width: u32,
    height: u32,
    cells: Vec<u32>,
}

pub type TileGrid = LayerGrid;
pub type EntityGrid = LayerGrid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("cell count mismatch: expected {expected}, got {actual}")]
    CellCountMismatch { expected: usize, actual: usize },
}

impl LayerGrid {
    pub fn new(width: u32, height: u32, cells: Vec<u32>) -> Result<Self, GridError> {
        let expected = width as usize * height as usize;
        let actual = cells.len();
        if expected != actual {
            return Err(GridError::CellCountMismatch { expected, actual });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// Builds a layer from 1-based editor ids, where editor 0 means "empty".
    pub fn from_editor_ids(width: u32, height: u32, raw: &[i64]) -> Result<Self, GridError> {
        let cells = raw
            .iter()
            .map(|&value| value.saturating_sub(1).clamp(0, u32::MAX as i64) as u32)
            .collect::<Vec<_>>();
        Self::new(width, height, cells)
    }

    pub fn filled(width: u32, height: u32, value: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_of(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: i32, y: i32) -> u32 {
        self.index_of(x, y)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(0)
    }

    pub fn set(&mut self, x: i32, y: i32, value: u32) -> bool {
        match self.index_of(x, y) {
            Some(index) => {
                self.cells[index] = value;
                true
            }
            None => false,
        }
    }

    pub fn count_nonzero(&self) -> usize {
        self.cells.iter().filter(|&&value| value != 0).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AreaCoord {
    pub x: u32,
    pub y: u32,
}

impl AreaCoord {
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    pub fn origin(&self) -> WorldPos {
        WorldPos {
            x: (self.x * AREA_WIDTH) as i32,
            y: (self.y * AREA_HEIGHT) as i32,
        }
    }

    pub fn world_of(&self, local_x: u32, local_y: u32) -> WorldPos {
        let origin = self.origin();
        WorldPos {
            x: origin.x + local_x as i32,
            y: origin.y + local_y as i32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
}

impl WorldPos {
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Size of the map measured in areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDimensions {
    pub width_areas: u32,
    pub height_areas: u32,
}

impl MapDimensions {
    /// Returns `None` unless both sides are exact multiples of the area size
    /// and every cell plus one neighbour step fits an `i32` world coordinate.
    pub fn from_tiles(width: u32, height: u32) -> Option<Self> {
        if width % AREA_WIDTH != 0 || height % AREA_HEIGHT != 0 {
            return None;
        }
        if width >= MAX_MAP_SIDE || height >= MAX_MAP_SIDE {
            return None;
        }
        Some(Self {
            width_areas: width / AREA_WIDTH,
            height_areas: height / AREA_HEIGHT,
        })
    }

    pub fn area_count(&self) -> usize {
        self.width_areas as usize * self.height_areas as usize
    }

    /// Area-Y outer, area-X inner.
    pub fn areas(&self) -> impl Iterator<Item = AreaCoord> + '_ {
        (0..self.height_areas)
            .flat_map(move |y| (0..self.width_areas).map(move |x| AreaCoord { x, y }))
    }

    pub fn has_right_neighbor(&self, area: AreaCoord) -> bool {
        area.x + 1 < self.width_areas
    }

    pub fn has_bottom_neighbor(&self, area: AreaCoord) -> bool {
        area.y + 1 < self.height_areas
    }
}
