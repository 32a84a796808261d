use crate::error::{AreaCompileError, AreaErrorCode};
use crate::grid::{AreaCoord, EntityGrid, TileGrid, AREA_HEIGHT, AREA_WIDTH, ENT_ETYPE_BASE};

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Runs of this length or shorter are emitted as literals.
const MAX_LITERAL_RUN: usize = 4;
/// Runs shorter than this get a zero-padded length field.
const TWO_DIGIT_RUN: usize = 10;
/// The run-length field is two decimal digits wide.
const MAX_RUN: usize = 99;

const RUN_MARKER: char = '*';
const ENTITY_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedEntity {
    pub local_x: u32,
    pub local_y: u32,
    pub etype: u32,
}

/// Linearized contents of one area, ready to be encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaCells {
    pub tiles: Vec<u32>,
    pub entities: Vec<PlacedEntity>,
}

impl AreaCells {
    /// Tiles row-major; entities in the same scan order.
    pub fn collect(tiles: &TileGrid, entities: &EntityGrid, area: AreaCoord) -> Self {
        let mut tile_ids = Vec::with_capacity((AREA_WIDTH * AREA_HEIGHT) as usize);
        let mut placed = Vec::new();
        for local_y in 0..AREA_HEIGHT {
            for local_x in 0..AREA_WIDTH {
                let pos = area.world_of(local_x, local_y);
                tile_ids.push(tiles.get(pos.x, pos.y));
                let ent = entities.get(pos.x, pos.y);
                if ent >= ENT_ETYPE_BASE {
                    placed.push(PlacedEntity {
                        local_x,
                        local_y,
                        etype: ent - ENT_ETYPE_BASE,
                    });
                }
            }
        }
        Self {
            tiles: tile_ids,
            entities: placed,
        }
    }
}

/// Encodes one validated area as `<rle tiles>[|<entity triplets>]`.
pub fn encode_area(
    tiles: &TileGrid,
    entities: &EntityGrid,
    area: AreaCoord,
) -> Result<String, AreaCompileError> {
    let cells = AreaCells::collect(tiles, entities, area);
    let mut output = encode_tile_runs(&cells.tiles)
        .map_err(|tile| range_error(area, format!("tile value {tile} has no base-36 digit")))?;

    if !cells.entities.is_empty() {
        output.push(ENTITY_SEPARATOR);
    }
    for ent in &cells.entities {
        let etype = base36_digit(ent.etype).ok_or_else(|| {
            range_error(
                area,
                format!(
                    "entity type {} at local ({},{}) has no base-36 digit",
                    ent.etype, ent.local_x, ent.local_y
                ),
            )
        })?;
        let x = base36_digit(ent.local_x).ok_or_else(|| {
            range_error(
                area,
                format!("entity x coordinate {} has no base-36 digit", ent.local_x),
            )
        })?;
        let y = base36_digit(ent.local_y).ok_or_else(|| {
            range_error(
                area,
                format!("entity y coordinate {} has no base-36 digit", ent.local_y),
            )
        })?;
        output.push(etype);
        output.push(x);
        output.push(y);
    }

    Ok(output)
}

/// Run-length encodes a tile stream. On failure returns the first value that
/// has no base-36 digit.
pub fn encode_tile_runs(tiles: &[u32]) -> Result<String, u32> {
    let mut output = String::with_capacity(tiles.len());
    let mut index = 0usize;
    while index < tiles.len() {
        let value = tiles[index];
        let code = base36_digit(value).ok_or(value)?;
        let run = run_length(tiles, index, MAX_RUN);
        if run > MAX_LITERAL_RUN && run < TWO_DIGIT_RUN {
            output.push(RUN_MARKER);
            output.push('0');
            output.push_str(&run.to_string());
            output.push(code);
        } else if run >= TWO_DIGIT_RUN {
            output.push(RUN_MARKER);
            output.push_str(&run.to_string());
            output.push(code);
        } else {
            for _ in 0..run {
                output.push(code);
            }
        }
        index += run;
    }
    Ok(output)
}

pub fn base36_digit(value: u32) -> Option<char> {
    BASE36_DIGITS.get(value as usize).map(|&byte| byte as char)
}

/// Number of equal values starting at `index`, at most `max_len`.
fn run_length(values: &[u32], index: usize, max_len: usize) -> usize {
    let value = values[index];
    values[index..]
        .iter()
        .take(max_len)
        .take_while(|&&other| other == value)
        .count()
}

fn range_error(area: AreaCoord, message: String) -> AreaCompileError {
    AreaCompileError::in_area(AreaErrorCode::EncodingRangeError, message, area)
}
