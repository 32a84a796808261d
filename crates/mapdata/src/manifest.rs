use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub(crate) const MAP_FORMAT_VERSION: u16 = 1;

/// Build record written next to the Lua output. Informational only; builds
/// never consult it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuildManifest {
    pub map_format_version: u16,
    pub compiler_version: String,
    pub source_name: String,
    pub width: u32,
    pub height: u32,
    pub width_areas: u32,
    pub height_areas: u32,
    pub area_count: usize,
    pub entity_count: usize,
    pub input_hash_sha256_hex: String,
    pub consts_hash_sha256_hex: String,
    pub area_consts_hash_sha256_hex: String,
}

pub fn manifest_path_for(output_path: &Path) -> PathBuf {
    let file_name = output_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("mapdata");
    output_path.with_file_name(format!("{file_name}.manifest.json"))
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

pub fn read_manifest(path: &Path) -> Option<BuildManifest> {
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}
