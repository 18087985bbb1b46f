//! Room Switching — build a small project and walk between variants.
//!
//! Creates a throwaway project with one scene, two rooms and a night variant,
//! spawns a few entities, and switches around so the save/load protocol is
//! visible in the log.
//!
//! Run with: `RUST_LOG=info cargo run -p smithy2d --example room_switching`

use smithy2d::prelude::*;

fn main() -> Result<()> {
    env_logger::init();

    let root = std::env::temp_dir().join("smithy2d-room-switching");
    if root.exists() {
        std::fs::remove_dir_all(&root).map_err(|e| SmithyError::from_io(&root, e))?;
    }
    let mut project = Project::open(&root)?;

    let forest = project.add_scene("Forest")?;
    let night = project.add_variant(forest, 0, "Night")?;
    let cave = project.add_room(forest, "Cave")?;

    // Day: a ship with a turret on top.
    let world = project.world_mut();
    let ship = world.spawn("Ship")?;
    let turret = world.spawn("Turret")?;
    world.set_parent(turret, Some(ship))?;
    if let Some(data) = world.get_mut(ship) {
        data.matrix_local = Transform::from_xy(3.0, 1.0).matrix();
        data.bounds = Bounds::from_size(2.0, 1.0);
    }

    // Night starts empty; a lantern goes in.
    project.set_active_variant(forest, 0, Some(night))?;
    project.world_mut().spawn("Lantern")?;
    print_world("night", &project);

    // The cave has nothing yet.
    project.set_active_room(forest, Some(cave))?;
    print_world("cave", &project);

    // Back to day: the ship and turret come back, the lantern goes.
    let report = project.set_active_variant(forest, 0, Some(0))?;
    println!("day: {} loaded, {} deactivated", report.loaded, report.deactivated);
    print_world("day", &project);

    project.rename(NodeRef::Variant(forest, 0, night), "Dusk")?;
    project.save()?;
    let summary = project.export(None)?;
    println!("exported to {}", summary.scenes_file.display());
    Ok(())
}

fn print_world(label: &str, project: &Project) {
    let world = project.world();
    let names: Vec<String> = world
        .active_entities()
        .map(|(entity, data)| match world.parent_name(entity) {
            Some(parent) => format!("{}<{parent}", data.name()),
            None => data.name().to_string(),
        })
        .collect();
    println!("{label}: [{}]", names.join(", "));
}
