use std::fmt;

use crate::grid::{AreaCoord, WorldPos};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaErrorCode {
    InvalidTile,
    InvalidEntity,
    BorderMismatch,
    FountainSurroundingViolation,
    MissingRegistryEntry,
    EncodingRangeError,
}

/// First violation found while compiling an area. Always fatal for the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaCompileError {
    pub code: AreaErrorCode,
    pub message: String,
    pub area: AreaCoord,
    pub location: Option<WorldPos>,
}

impl AreaCompileError {
    pub(crate) fn at(
        code: AreaErrorCode,
        message: String,
        area: AreaCoord,
        location: WorldPos,
    ) -> Self {
        Self {
            code,
            message,
            area,
            location: Some(location),
        }
    }

    pub(crate) fn in_area(code: AreaErrorCode, message: String, area: AreaCoord) -> Self {
        Self {
            code,
            message,
            area,
            location: None,
        }
    }
}

impl fmt::Display for AreaCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(pos) => write!(
                f,
                "{:?}: {} (area={},{}, tile={},{})",
                self.code, self.message, self.area.x, self.area.y, pos.x, pos.y
            ),
            None => write!(
                f,
                "{:?}: {} (area={},{})",
                self.code, self.message, self.area.x, self.area.y
            ),
        }
    }
}

impl std::error::Error for AreaCompileError {}
