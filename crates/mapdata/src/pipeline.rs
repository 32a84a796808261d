use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::atomic_io::write_text_atomic;
use crate::compiler::{compile_map, CompileMapError, CompiledMap};
use crate::document::render_lua_document;
use crate::manifest::{manifest_path_for, sha256_hex, BuildManifest, MAP_FORMAT_VERSION};
use crate::registry::{RegistryError, RegistrySources};
use crate::tmx::{parse_tmx_from, read_tmx_source, TmxError};

#[derive(Debug, Clone)]
pub struct MapBuildRequest {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub consts_dir: PathBuf,
    pub write_manifest: bool,
    pub compiler_version: String,
}

#[derive(Debug, Clone)]
pub struct MapBuildSummary {
    pub source_name: String,
    pub compiled: CompiledMap,
    pub output_path: PathBuf,
    pub manifest_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum MapBuildError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Tmx(#[from] TmxError),
    #[error(transparent)]
    Compile(#[from] CompileMapError),
    #[error("failed to encode build manifest {path}: {source}")]
    EncodeManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove stale manifest {path}: {source}")]
    RemoveManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Loads the registries and TMX input, compiles every area and writes the
/// Lua document. Nothing is written unless the whole map compiles.
///
/// Without a manifest, any manifest left by an earlier build is removed so it
/// cannot describe a different document.
pub fn build_map_file(request: &MapBuildRequest) -> Result<MapBuildSummary, MapBuildError> {
    let sources = RegistrySources::read(&request.consts_dir)?;
    let registries = sources.parse()?;
    let tmx_src = read_tmx_source(&request.input_path)?;
    let tmx = parse_tmx_from(&request.input_path, &tmx_src)?;
    let compiled = compile_map(&tmx.tiles, &tmx.entities, &registries)?;

    let source_name = source_name_of(&request.input_path);
    let document = render_lua_document(&source_name, &compiled);
    write_text_atomic(&request.output_path, &document).map_err(|source| {
        MapBuildError::WriteOutput {
            path: request.output_path.clone(),
            source,
        }
    })?;
    info!(
        output_path = %request.output_path.display(),
        bytes = document.len(),
        "map_output_written"
    );

    let manifest_path = if request.write_manifest {
        let manifest = BuildManifest {
            map_format_version: MAP_FORMAT_VERSION,
            compiler_version: request.compiler_version.clone(),
            source_name: source_name.clone(),
            width: tmx.width,
            height: tmx.height,
            width_areas: compiled.dimensions.width_areas,
            height_areas: compiled.dimensions.height_areas,
            area_count: compiled.areas.len(),
            entity_count: tmx.entities.count_nonzero(),
            input_hash_sha256_hex: sha256_hex(tmx_src.as_bytes()),
            consts_hash_sha256_hex: sha256_hex(sources.consts_src.as_bytes()),
            area_consts_hash_sha256_hex: sha256_hex(sources.area_src.as_bytes()),
        };
        Some(write_manifest(&request.output_path, &manifest)?)
    } else {
        remove_stale_manifest(&request.output_path)?;
        None
    };

    Ok(MapBuildSummary {
        source_name,
        compiled,
        output_path: request.output_path.clone(),
        manifest_path,
    })
}

fn write_manifest(output_path: &Path, manifest: &BuildManifest) -> Result<PathBuf, MapBuildError> {
    let path = manifest_path_for(output_path);
    let text = serde_json::to_string_pretty(manifest).map_err(|source| {
        MapBuildError::EncodeManifest {
            path: path.clone(),
            source,
        }
    })?;
    write_text_atomic(&path, &text).map_err(|source| MapBuildError::WriteOutput {
        path: path.clone(),
        source,
    })?;
    info!(
        manifest_path = %path.display(),
        input_hash = %manifest.input_hash_sha256_hex,
        "map_manifest_written"
    );
    Ok(path)
}

fn remove_stale_manifest(output_path: &Path) -> Result<(), MapBuildError> {
    let path = manifest_path_for(output_path);
    match fs::remove_file(&path) {
        Ok(()) => {
            info!(manifest_path = %path.display(), "map_manifest_removed");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(MapBuildError::RemoveManifest { path, source }),
    }
}

fn source_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
