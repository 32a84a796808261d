use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::info;

use crate::grid::{EntityGrid, GridError, LayerGrid, TileGrid};

pub const TILES_LAYER: &str = "Tiles";
pub const ENTITIES_LAYER: &str = "Entities";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Error)]
pub enum TmxError {
    #[error("failed to read TMX file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed TMX XML at line {}, column {}: {message}", .location.line, .location.column)]
    XmlMalformed {
        message: String,
        location: SourceLocation,
    },
    #[error("invalid TMX file format: missing layer dimensions")]
    MissingDimensions,
    #[error("layer attribute {attribute}='{value}' is not a valid size (line {}, column {})", .location.line, .location.column)]
    InvalidDimension {
        attribute: &'static str,
        value: String,
        location: SourceLocation,
    },
    #[error("no layer named '{layer}' found in the TMX file")]
    MissingLayer { layer: &'static str },
    #[error("no CSV data found in layer '{layer}' (line {}, column {})", .location.line, .location.column)]
    MissingCsvData {
        layer: &'static str,
        location: SourceLocation,
    },
    #[error("layer '{layer}' CSV entry {index} ('{value}') is not an integer")]
    InvalidCsvValue {
        layer: &'static str,
        index: usize,
        value: String,
    },
    #[error("layer '{layer}' CSV data does not match layer dimensions: {source}")]
    CsvLength {
        layer: &'static str,
        #[source]
        source: GridError,
    },
}

/// Tile and entity layers of a TMX export, already shifted to 0-based ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmxMap {
    pub width: u32,
    pub height: u32,
    pub tiles: TileGrid,
    pub entities: EntityGrid,
}

pub fn load_tmx(path: &Path) -> Result<TmxMap, TmxError> {
    let raw = read_tmx_source(path)?;
    parse_tmx_from(path, &raw)
}

pub fn read_tmx_source(path: &Path) -> Result<String, TmxError> {
    fs::read_to_string(path).map_err(|source| TmxError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses TMX text already read from `path`; the path is only used for logging.
pub fn parse_tmx_from(path: &Path, raw: &str) -> Result<TmxMap, TmxError> {
    let map = parse_tmx(raw)?;
    info!(
        path = %path.display(),
        width = map.width,
        height = map.height,
        entity_count = map.entities.count_nonzero(),
        "map_tmx_loaded"
    );
    Ok(map)
}

/// Dimensions come from the first `<layer>`; the `Tiles` and `Entities`
/// layers must each carry CSV-encoded `<data>`.
pub fn parse_tmx(raw: &str) -> Result<TmxMap, TmxError> {
    let doc = Document::parse(raw).map_err(|error| TmxError::XmlMalformed {
        message: error.to_string(),
        location: SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        },
    })?;

    let first_layer = doc
        .descendants()
        .find(|node| node.has_tag_name("layer"))
        .ok_or(TmxError::MissingDimensions)?;
    let width = dimension_attr(&doc, first_layer, "width")?;
    let height = dimension_attr(&doc, first_layer, "height")?;

    let tiles = read_layer(&doc, TILES_LAYER, width, height)?;
    let entities = read_layer(&doc, ENTITIES_LAYER, width, height)?;

    Ok(TmxMap {
        width,
        height,
        tiles,
        entities,
    })
}

fn dimension_attr(
    doc: &Document<'_>,
    layer: Node<'_, '_>,
    attribute: &'static str,
) -> Result<u32, TmxError> {
    let value = layer
        .attribute(attribute)
        .ok_or(TmxError::MissingDimensions)?;
    value
        .trim()
        .parse::<u32>()
        .map_err(|_| TmxError::InvalidDimension {
            attribute,
            value: value.to_string(),
            location: location_of(doc, layer),
        })
}

fn read_layer(
    doc: &Document<'_>,
    layer_name: &'static str,
    width: u32,
    height: u32,
) -> Result<LayerGrid, TmxError> {
    let layer = doc
        .descendants()
        .find(|node| node.has_tag_name("layer") && node.attribute("name") == Some(layer_name))
        .ok_or(TmxError::MissingLayer { layer: layer_name })?;

    let text = layer
        .children()
        .find(|node| node.has_tag_name("data") && node.attribute("encoding") == Some("csv"))
        .and_then(|data| data.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or(TmxError::MissingCsvData {
            layer: layer_name,
            location: location_of(doc, layer),
        })?;

    let raw = parse_csv_values(layer_name, text)?;
    LayerGrid::from_editor_ids(width, height, &raw).map_err(|source| TmxError::CsvLength {
        layer: layer_name,
        source,
    })
}

fn parse_csv_values(layer_name: &'static str, text: &str) -> Result<Vec<i64>, TmxError> {
    text.split(',')
        .map(str::trim)
        .enumerate()
        .map(|(index, value)| {
            value
                .parse::<i64>()
                .map_err(|_| TmxError::InvalidCsvValue {
                    layer: layer_name,
                    index,
                    value: value.to_string(),
                })
        })
        .collect()
}

fn location_of(doc: &Document<'_>, node: Node<'_, '_>) -> SourceLocation {
    let pos = doc.text_pos_at(node.range().start);
    SourceLocation {
        line: pos.row as usize,
        column: pos.col as usize,
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn tmx(width: u32, height: u32, tiles_csv: &str, ents_csv: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="{width}" height="{height}" tilewidth="8" tileheight="8">
 <tileset firstgid="1" source="tiles.tsx"/>
 <layer id="1" name="Tiles" width="{width}" height="{height}">
  <data encoding="csv">
{tiles_csv}
</data>
 </layer>
 <layer id="2" name="Entities" width="{width}" height="{height}">
  <data encoding="csv">
{ents_csv}
</data>
 </layer>
</map>"#
        )
    }

    #[test]
    fn parses_layers_and_shifts_ids() {
        let raw = tmx(2, 2, "1,2,\n3,4", "0,0,\n37,0");
        let map = parse_tmx(&raw).expect("parse");
        assert_eq!(map.width, 2);
        assert_eq!(map.height, 2);
        assert_eq!(map.tiles.get(0, 0), 0);
        assert_eq!(map.tiles.get(1, 1), 3);
        assert_eq!(map.entities.get(0, 1), 36);
        assert_eq!(map.entities.count_nonzero(), 1);
    }

    #[test]
    fn layer_order_in_file_does_not_matter() {
        let raw = r#"<map>
 <layer name="Entities" width="1" height="1"><data encoding="csv">0</data></layer>
 <layer name="Tiles" width="1" height="1"><data encoding="csv">5</data></layer>
</map>"#;
        let map = parse_tmx(raw).expect("parse");
        assert_eq!(map.tiles.get(0, 0), 4);
    }

    #[test]
    fn missing_entities_layer_is_reported() {
        let raw = r#"<map><layer name="Tiles" width="1" height="1"><data encoding="csv">1</data></layer></map>"#;
        let err = parse_tmx(raw).expect_err("err");
        assert!(matches!(
            err,
            TmxError::MissingLayer {
                layer: ENTITIES_LAYER
            }
        ));
    }

    #[test]
    fn non_csv_data_is_reported() {
        let raw = r#"<map>
 <layer name="Tiles" width="1" height="1"><data encoding="base64">AQAAAA==</data></layer>
 <layer name="Entities" width="1" height="1"><data encoding="csv">0</data></layer>
</map>"#;
        let err = parse_tmx(raw).expect_err("err");
        match err {
            TmxError::MissingCsvData { layer, location } => {
                assert_eq!(layer, TILES_LAYER);
                assert_eq!(location.line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_length_mismatch_is_reported() {
        let raw = tmx(2, 2, "1,1,1", "0,0,0,0");
        let err = parse_tmx(&raw).expect_err("err");
        assert!(matches!(
            err,
            TmxError::CsvLength {
                layer: TILES_LAYER,
                source: GridError::CellCountMismatch {
                    expected: 4,
                    actual: 3
                }
            }
        ));
    }

    #[test]
    fn non_numeric_csv_is_reported() {
        let raw = tmx(2, 1, "1,x", "0,0");
        let err = parse_tmx(&raw).expect_err("err");
        assert!(matches!(
            err,
            TmxError::InvalidCsvValue { index: 1, .. }
        ));
    }

    #[test]
    fn layer_without_size_is_reported() {
        let raw = r#"<map><layer name="Tiles"><data encoding="csv">1</data></layer></map>"#;
        let err = parse_tmx(raw).expect_err("err");
        assert!(matches!(err, TmxError::MissingDimensions));
    }

    #[test]
    fn malformed_xml_reports_location() {
        let err = parse_tmx("<map><layer></map>").expect_err("err");
        assert!(matches!(err, TmxError::XmlMalformed { .. }));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("world.tmx");
        fs::write(&path, tmx(1, 1, "2", "0")).expect("write");
        let map = load_tmx(&path).expect("load");
        assert_eq!(map.tiles.get(0, 0), 1);

        let err = load_tmx(&temp.path().join("missing.tmx")).expect_err("err");
        assert!(matches!(err, TmxError::ReadFile { .. }));
    }
}
