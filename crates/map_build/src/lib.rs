use std::path::{Path, PathBuf};

use mapdata::{build_map_file, resolve_consts_dir, MapBuildRequest, MapBuildSummary};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub consts_dir: Option<PathBuf>,
    pub write_manifest: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            consts_dir: None,
            write_manifest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Help,
    Build {
        input: PathBuf,
        output: PathBuf,
        options: BuildOptions,
    },
}

pub fn parse_args(args: &[String]) -> Result<CliCommand, String> {
    if args.is_empty() {
        return Err(usage_text());
    }

    let mut options = BuildOptions::default();
    let mut positional = Vec::<PathBuf>::new();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "-h" | "--help" => return Ok(CliCommand::Help),
            "--consts-dir" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --consts-dir".to_string())?;
                options.consts_dir = Some(PathBuf::from(value));
                index += 2;
            }
            "--no-manifest" => {
                options.write_manifest = false;
                index += 1;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option '{flag}'"));
            }
            value => {
                positional.push(PathBuf::from(value));
                index += 1;
            }
        }
    }

    let mut positional = positional.into_iter();
    let input = positional
        .next()
        .ok_or_else(|| "missing input TMX file".to_string())?;
    let output = positional
        .next()
        .ok_or_else(|| "missing output Lua file".to_string())?;
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument '{}'", extra.display()));
    }

    Ok(CliCommand::Build {
        input,
        output,
        options,
    })
}

pub fn run_build(
    input: &Path,
    output: &Path,
    options: &BuildOptions,
) -> Result<MapBuildSummary, String> {
    let consts_dir = resolve_consts_dir(options.consts_dir.as_deref(), input)
        .map_err(|error| error.to_string())?;
    info!(
        input_path = %input.display(),
        output_path = %output.display(),
        consts_dir = %consts_dir.display(),
        write_manifest = options.write_manifest,
        "map_build_started"
    );

    let request = MapBuildRequest {
        input_path: input.to_path_buf(),
        output_path: output.to_path_buf(),
        consts_dir,
        write_manifest: options.write_manifest,
        compiler_version: env!("CARGO_PKG_VERSION").to_string(),
    };
    build_map_file(&request).map_err(|error| error.to_string())
}

pub fn usage_text() -> String {
    [
        "map_build - compile a Tiled TMX map into area-encoded Lua map data",
        "",
        "Usage:",
        "  map_build [--consts-dir <dir>] [--no-manifest] <input.tmx> <output.lua>",
        "",
        "Constants directory (holds 0consts.lua and area.lua):",
        "  --consts-dir <dir>, else $MAP_BUILD_CONSTS_DIR,",
        "  else the nearest ancestor of the input file containing both files",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn parses_positional_paths_with_defaults() {
        let command = parse_args(&args(&["world.tmx", "world.lua"])).expect("parse");
        assert_eq!(
            command,
            CliCommand::Build {
                input: PathBuf::from("world.tmx"),
                output: PathBuf::from("world.lua"),
                options: BuildOptions::default(),
            }
        );
    }

    #[test]
    fn parses_options_in_any_position() {
        let command = parse_args(&args(&[
            "world.tmx",
            "--no-manifest",
            "world.lua",
            "--consts-dir",
            "game",
        ]))
        .expect("parse");
        let CliCommand::Build { options, .. } = command else {
            panic!("expected build command");
        };
        assert!(!options.write_manifest);
        assert_eq!(options.consts_dir, Some(PathBuf::from("game")));
    }

    #[test]
    fn help_wins_over_other_arguments() {
        assert_eq!(
            parse_args(&args(&["world.tmx", "--help"])).expect("parse"),
            CliCommand::Help
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&[]).is_err());
        assert_eq!(
            parse_args(&args(&["world.tmx"])).expect_err("err"),
            "missing output Lua file"
        );
        assert_eq!(
            parse_args(&args(&["a.tmx", "b.lua", "c"])).expect_err("err"),
            "unexpected argument 'c'"
        );
        assert_eq!(
            parse_args(&args(&["--verbose", "a.tmx", "b.lua"])).expect_err("err"),
            "unknown option '--verbose'"
        );
        assert_eq!(
            parse_args(&args(&["a.tmx", "b.lua", "--consts-dir"])).expect_err("err"),
            "missing value for --consts-dir"
        );
    }

    #[test]
    fn run_build_compiles_with_explicit_consts_dir() {
        let temp = TempDir::new().expect("temp");
        let game = temp.path().join("game");
        fs::create_dir_all(&game).expect("mkdir");
        fs::write(game.join("0consts.lua"), "local TT_GRASS = 0\n").expect("consts");
        fs::write(game.join("area.lua"), "[TT_GRASS] = { flags = TF_CLEAR },\n").expect("area");
        let cells = vec!["1"; 16 * 12].join(",");
        let ents = vec!["0"; 16 * 12].join(",");
        let input = temp.path().join("tiny.tmx");
        fs::write(
            &input,
            format!(
                r#"<map><layer name="Tiles" width="16" height="12"><data encoding="csv">{cells}</data></layer><layer name="Entities" width="16" height="12"><data encoding="csv">{ents}</data></layer></map>"#
            ),
        )
        .expect("tmx");
        let output = temp.path().join("tiny.lua");
        let options = BuildOptions {
            consts_dir: Some(game),
            write_manifest: false,
        };

        let summary = run_build(&input, &output, &options).expect("build");
        assert_eq!(summary.compiled.area(mapdata::AreaCoord { x: 0, y: 0 }), Some("*990*930"));
        let text = fs::read_to_string(&output).expect("output");
        assert!(text.contains("[\"0,0\"] = \"*990*930\","));
    }

    #[test]
    fn run_build_reports_missing_consts_dir() {
        let temp = TempDir::new().expect("temp");
        let options = BuildOptions {
            consts_dir: Some(temp.path().join("nope")),
            write_manifest: true,
        };
        let err = run_build(
            &temp.path().join("a.tmx"),
            &temp.path().join("a.lua"),
            &options,
        )
        .expect_err("err");
        assert!(err.contains("must contain 0consts.lua and area.lua"));
    }
}
