//! Component Scripts — declare inputs in a script, attach, edit, reload.
//!
//! Writes a component script with a `--$` declaration block, attaches it to
//! an entity, overrides an input, then edits the script and polls so the
//! merged inputs show the new schema with the override kept.
//!
//! Run with: `RUST_LOG=debug cargo run -p smithy2d --example component_scripts`

use smithy2d::persist::paths::{asset_abspath, global_component_script};
use smithy2d::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let root = std::env::temp_dir().join("smithy2d-component-scripts");
    if root.exists() {
        std::fs::remove_dir_all(&root).map_err(|e| SmithyError::from_io(&root, e))?;
    }
    let mut project = Project::open(&root)?;
    project.add_scene("Arena")?;

    let script = asset_abspath(&root, &global_component_script("Spawner"));
    write(
        &script,
        "--$rate(float, 1.5, min=0, max=10)\n\
         --$mode(enum, ['burst', 'steady'], 'burst')\n\
         --$target(object)\n\
         local Spawner = {}\nreturn Spawner\n",
    )?;

    let entity = project.world_mut().spawn("Gate")?;
    let spawner = project.add_component(entity, "Spawner", true)?;
    spawner.set_input("rate", &InputValue::float(4.0));
    print_inputs(&project, entity);

    // A new input appears, `mode` loses an item.
    write(
        &script,
        "--$rate(float, 1.5, min=0, max=10)\n\
         --$mode(enum, ['steady'])\n\
         --$target(object)\n\
         --$burst_size(int, 3)\n\
         local Spawner = {}\nreturn Spawner\n",
    )?;
    project.tick();
    project.tick();
    print_inputs(&project, entity);
    Ok(())
}

fn write(path: &std::path::Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SmithyError::from_io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| SmithyError::from_io(path, e))
}

fn print_inputs(project: &Project, entity: Entity) {
    let Some(data) = project.world().get(entity) else {
        return;
    };
    for component in data.components.iter() {
        println!("{} (valid: {})", component.name, component.is_valid());
        for input in &component.inputs {
            println!("  {}", input.encode());
        }
    }
}
