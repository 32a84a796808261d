use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

mod atomic_io;
pub mod compiler;
pub mod document;
pub mod encoder;
mod error;
pub mod grid;
pub mod manifest;
pub mod pipeline;
pub mod registry;
pub mod tmx;
pub mod validator;

pub use compiler::{compile_map, CompileMapError, CompiledMap};
pub use document::render_lua_document;
pub use encoder::{encode_area, encode_tile_runs, AreaCells, PlacedEntity};
pub use error::{AreaCompileError, AreaErrorCode};
pub use grid::{
    AreaCoord, EntityGrid, GridError, LayerGrid, MapDimensions, TileGrid, WorldPos, AREA_HEIGHT,
    AREA_WIDTH, ENT_ETYPE_BASE,
};
pub use manifest::{manifest_path_for, read_manifest, BuildManifest};
pub use pipeline::{build_map_file, MapBuildError, MapBuildRequest, MapBuildSummary};
pub use registry::{
    load_registries, parse_registries, EntityTypeRegistry, MapRegistries, RegistryError,
    RegistrySources, TileRegistry, TileTypeInfo,
};
pub use tmx::{load_tmx, parse_tmx, parse_tmx_from, read_tmx_source, TmxError, TmxMap};
pub use validator::{validate_area, GridValidator};

pub const CONSTS_DIR_ENV_VAR: &str = "MAP_BUILD_CONSTS_DIR";

#[derive(Debug, Error)]
pub enum ConstsDirError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("constants directory {path} must contain 0consts.lua and area.lua")]
    InvalidConstsDir { path: PathBuf },
    #[error(
        "Could not find 0consts.lua and area.lua by walking upward from {start_dir}\n\
Pass --consts-dir or set {env_var}, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/game\""
    )]
    NotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Picks the directory holding `0consts.lua` and `area.lua`: an explicit
/// path first, then `MAP_BUILD_CONSTS_DIR`, then the nearest ancestor of the
/// input file that has both.
pub fn resolve_consts_dir(
    explicit: Option<&Path>,
    input_path: &Path,
) -> Result<PathBuf, ConstsDirError> {
    resolve_consts_dir_with(explicit, env::var(CONSTS_DIR_ENV_VAR), input_path)
}

fn resolve_consts_dir_with(
    explicit: Option<&Path>,
    env_value: Result<String, env::VarError>,
    input_path: &Path,
) -> Result<PathBuf, ConstsDirError> {
    if let Some(dir) = explicit {
        return checked_consts_dir(dir);
    }
    match env_value {
        Ok(value) => checked_consts_dir(Path::new(&value)),
        Err(env::VarError::NotPresent) => search_consts_dir(input_path),
        Err(source) => Err(ConstsDirError::EnvVar {
            var: CONSTS_DIR_ENV_VAR,
            source,
        }),
    }
}

fn checked_consts_dir(dir: &Path) -> Result<PathBuf, ConstsDirError> {
    let normalized = normalize_path(dir);
    if registry::has_consts_files(&normalized) {
        Ok(normalized)
    } else {
        Err(ConstsDirError::InvalidConstsDir { path: normalized })
    }
}

fn search_consts_dir(input_path: &Path) -> Result<PathBuf, ConstsDirError> {
    let absolute = normalize_path(input_path);
    let start_dir = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    for candidate in start_dir.ancestors() {
        if registry::has_consts_files(candidate) {
            return Ok(normalize_path(candidate));
        }
    }

    Err(ConstsDirError::NotFound {
        start_dir,
        env_var: CONSTS_DIR_ENV_VAR,
    })
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write_consts(dir: &Path) {
        fs::create_dir_all(dir).expect("mkdir");
        fs::write(dir.join(registry::CONSTS_FILE_NAME), "local TT_WATER = 0").expect("consts");
        fs::write(dir.join(registry::AREA_FILE_NAME), "").expect("area");
    }

    #[test]
    fn explicit_dir_must_hold_both_files() {
        let temp = TempDir::new().expect("temp");
        let input = temp.path().join("world.tmx");
        let err = resolve_consts_dir(Some(temp.path()), &input).expect_err("err");
        assert!(matches!(err, ConstsDirError::InvalidConstsDir { .. }));

        write_consts(temp.path());
        let dir = resolve_consts_dir(Some(temp.path()), &input).expect("dir");
        assert_eq!(dir, normalize_path(temp.path()));
    }

    #[test]
    fn env_var_dir_is_used_before_search() {
        let temp = TempDir::new().expect("temp");
        let near = temp.path().join("maps");
        write_consts(&near);
        let configured = temp.path().join("configured");
        write_consts(&configured);
        let input = near.join("world.tmx");
        let env_value = Ok(configured.display().to_string());

        let dir = resolve_consts_dir_with(None, env_value, &input).expect("dir");
        assert_eq!(dir, normalize_path(&configured));
    }

    #[test]
    fn env_var_dir_must_hold_both_files() {
        let temp = TempDir::new().expect("temp");
        write_consts(temp.path());
        let input = temp.path().join("world.tmx");
        let env_value = Ok(temp.path().join("empty").display().to_string());

        let err = resolve_consts_dir_with(None, env_value, &input).expect_err("err");
        assert!(matches!(err, ConstsDirError::InvalidConstsDir { .. }));
    }

    #[test]
    fn explicit_dir_wins_over_env_var() {
        let temp = TempDir::new().expect("temp");
        write_consts(temp.path());
        let input = temp.path().join("world.tmx");
        let env_value = Ok(temp.path().join("empty").display().to_string());

        let dir = resolve_consts_dir_with(Some(temp.path()), env_value, &input).expect("dir");
        assert_eq!(dir, normalize_path(temp.path()));
    }

    #[test]
    fn unset_env_var_falls_back_to_search() {
        let temp = TempDir::new().expect("temp");
        write_consts(temp.path());
        let input = temp.path().join("maps").join("world.tmx");

        let dir = resolve_consts_dir_with(None, Err(env::VarError::NotPresent), &input)
            .expect("dir");
        assert_eq!(dir, normalize_path(temp.path()));
    }

    #[test]
    fn search_walks_upward_from_input() {
        let temp = TempDir::new().expect("temp");
        write_consts(temp.path());
        let maps = temp.path().join("maps").join("overworld");
        fs::create_dir_all(&maps).expect("mkdir maps");
        let input = maps.join("world.tmx");
        fs::write(&input, "<map/>").expect("tmx");
        let dir = search_consts_dir(&input).expect("found");
        assert_eq!(dir, normalize_path(temp.path()));
    }

    #[test]
    fn search_prefers_nearest_ancestor() {
        let temp = TempDir::new().expect("temp");
        write_consts(temp.path());
        let nested = temp.path().join("mods").join("extra");
        write_consts(&nested);
        let input = nested.join("world.tmx");
        fs::write(&input, "<map/>").expect("tmx");
        let dir = search_consts_dir(&input).expect("found");
        assert_eq!(dir, normalize_path(&nested));
    }
}
