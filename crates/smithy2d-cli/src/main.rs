//! smithy2d — command-line front end for Smithy2D projects.
//!
//! Every command opens the project, does one thing, and saves. Useful for
//! scripted pipelines (sync + export on CI) and for poking at a project
//! without the editor.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use smithy2d::component::parser::parse_script_inputs;
use smithy2d::error::SmithyError;
use smithy2d::persist::fs::DiskFs;
use smithy2d::persist::paths::AssetPath;
use smithy2d::prelude::*;

/// Exit code for failures that may succeed when retried (a file was locked).
const EXIT_RETRYABLE: u8 = 2;
/// Exit code for refused operations on protected paths.
const EXIT_PROTECTED: u8 = 3;

#[derive(Parser, Debug)]
#[command(name = "smithy2d", version, about = "Smithy2D project tool", long_about = None)]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short = 'p', long = "project", value_name = "DIR", default_value = ".")]
    project: PathBuf,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    /// Override the configured pixels per world unit
    #[arg(long = "ppu", value_name = "PIXELS", global = true)]
    pixels_per_unit: Option<f32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the scene / room / variant tree
    Tree,

    /// Reconcile the project with scripts added or renamed on disk
    Sync,

    /// Write scenes.lua and components.lua
    Export {
        /// Output directory (defaults to the configured export dir)
        #[arg(long = "out", value_name = "DIR")]
        out: Option<PathBuf>,
    },

    /// Create a scene with a default room and variant
    NewScene { name: String },

    /// Create a room in SCENE
    NewRoom { scene: String, name: String },

    /// Create a variant in SCENE/ROOM
    NewVariant {
        scene: String,
        room: String,
        name: String,
    },

    /// Make a scene (and optionally a room and variant) active
    Switch {
        scene: String,
        room: Option<String>,
        variant: Option<String>,
    },

    /// Rename the scene, room or variant at an asset path
    Rename {
        #[arg(value_name = "ASSET_PATH")]
        path: String,
        name: String,
    },

    /// Archive the item or component script at an asset path
    Delete {
        #[arg(value_name = "ASSET_PATH")]
        path: String,
    },

    /// Parse a component script and list its inputs
    Check {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("Error: {err:#}");
            match err.downcast_ref::<SmithyError>() {
                Some(e) if e.is_retryable() => ExitCode::from(EXIT_RETRYABLE),
                Some(SmithyError::ProtectedPath(_)) => ExitCode::from(EXIT_PROTECTED),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    if let Command::Check { script } = &cli.command {
        return check(script);
    }

    let mut config = ProjectConfig::load(&cli.project)
        .with_context(|| format!("reading config in {}", cli.project.display()))?;
    if let Some(ppu) = cli.pixels_per_unit {
        config = config.with_pixels_per_unit(ppu);
    }
    let mut project = Project::open_with(&cli.project, config, Box::new(DiskFs))
        .with_context(|| format!("opening project at {}", cli.project.display()))?;

    match cli.command {
        Command::Tree => {
            print_tree(&project);
            return Ok(());
        }
        Command::Sync => {
            let report = project.sync_with_disk()?;
            for path in &report.renamed {
                println!("renamed  {path}");
            }
            for path in &report.added {
                println!("added    {path}");
            }
            if report.bound > 0 {
                println!("bound    {} item(s)", report.bound);
            }
        }
        Command::Export { out } => {
            let summary = project.export(out.as_deref())?;
            println!(
                "{} scene(s), {} object(s) -> {}",
                summary.scenes,
                summary.objects,
                summary.scenes_file.display()
            );
        }
        Command::NewScene { name } => {
            let s = project.add_scene(&name)?;
            println!("{}", project.document().asset_path(NodeRef::Scene(s))?);
        }
        Command::NewRoom { scene, name } => {
            let s = scene_index(&project, &scene)?;
            let r = project.add_room(s, &name)?;
            println!("{}", project.document().asset_path(NodeRef::Room(s, r))?);
        }
        Command::NewVariant { scene, room, name } => {
            let s = scene_index(&project, &scene)?;
            let r = room_index(&project, s, &room)?;
            let v = project.add_variant(s, r, &name)?;
            println!("{}", project.document().asset_path(NodeRef::Variant(s, r, v))?);
        }
        Command::Switch {
            scene,
            room,
            variant,
        } => {
            let s = scene_index(&project, &scene)?;
            let report = match (room, variant) {
                (None, _) => project.set_active_scene(Some(s))?,
                (Some(room), None) => {
                    let r = room_index(&project, s, &room)?;
                    project.set_active_room(s, Some(r))?
                }
                (Some(room), Some(variant)) => {
                    let r = room_index(&project, s, &room)?;
                    let v = project
                        .document()
                        .room(s, r)
                        .and_then(|x| x.variant_index(&variant))
                        .with_context(|| format!("no variant '{variant}' in {scene}/{room}"))?;
                    project.set_active_variant(s, r, Some(v))?
                }
            };
            for warning in &report.warnings {
                println!("warning: {warning}");
            }
            println!(
                "{} loaded, {} deactivated",
                report.loaded, report.deactivated
            );
        }
        Command::Rename { path, name } => {
            let node = resolve(&project, &path)?;
            let given = project.rename(node, &name)?;
            println!("{} -> {}", path, project.document().asset_path(node)?);
            if given != name {
                println!("(name taken, used '{given}')");
            }
        }
        Command::Delete { path } => {
            project.delete_asset_path(&path)?;
            println!("archived {path}");
        }
        Command::Check { .. } => unreachable!("handled before opening the project"),
    }

    project.save()?;
    Ok(())
}

fn check(script: &std::path::Path) -> Result<()> {
    let parsed = parse_script_inputs(script)
        .with_context(|| format!("reading {}", script.display()))?;
    for input in &parsed.inputs {
        println!(
            "{:<16} {:<7} {}",
            input.name,
            input.datatype().as_str(),
            input.value.to_string_value()
        );
    }
    if !parsed.errors.is_empty() {
        bail!("{} declaration error(s):\n{}", parsed.errors.len(), parsed.err_log());
    }
    Ok(())
}

fn print_tree(project: &Project) {
    let doc = project.document();
    let mark = |active: bool| if active { "*" } else { " " };
    for (s, scene) in doc.scenes().iter().enumerate() {
        let dirty = if scene.dirty { " (dirty)" } else { "" };
        println!(
            "{} {}{dirty}  {}",
            mark(doc.active_scene_index() == Some(s)),
            scene.name(),
            scene.guid()
        );
        for (r, room) in scene.rooms().iter().enumerate() {
            println!(
                "  {} {}  {}",
                mark(scene.active_room_index() == Some(r)),
                room.name(),
                room.guid()
            );
            for (v, variant) in room.variants().iter().enumerate() {
                println!(
                    "    {} {} ({} objects)  {}",
                    mark(room.active_variant_index() == Some(v)),
                    variant.name(),
                    variant.object_states.len(),
                    variant.guid()
                );
            }
        }
    }
}

fn scene_index(project: &Project, name: &str) -> Result<usize> {
    project
        .document()
        .scene_index(name)
        .with_context(|| format!("no scene named '{name}'"))
}

fn room_index(project: &Project, scene: usize, name: &str) -> Result<usize> {
    project
        .document()
        .scene(scene)
        .and_then(|s| s.room_index(name))
        .with_context(|| format!("no room named '{name}'"))
}

fn resolve(project: &Project, path: &str) -> Result<NodeRef> {
    let parsed = AssetPath::parse(path)?;
    if parsed.is_protected() {
        return Err(SmithyError::ProtectedPath(path.to_string()).into());
    }
    match project.document().resolve(&parsed) {
        Some(node) => Ok(node),
        None => bail!("'{path}' is not a scene, room or variant of this project"),
    }
}
