//! End-to-end scenarios for worker buildings driven through the engine.

use colony_core::building::BuildingState;
use colony_core::command_queue::Command;
use colony_core::dock::{DockPosition, SHIP_COMPLETE_THRESHOLD};
use colony_core::engine::{Engine, EngineConfig};
use colony_core::event::{Event, EventKind};
use colony_core::geometry::{Direction, TilePosition};
use colony_core::id::*;
use colony_core::material::*;
use colony_core::test_utils::*;

// ===========================================================================
// Lifecycle
// ===========================================================================

#[test]
fn full_lifecycle_of_a_producer() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let registry = test_registry();
    let pos = TilePosition::new(10, 10);
    let id = engine.add_building(&registry, toolsmith(), PlayerId(0), pos).unwrap();

    engine.commands.push(Command::FinishConstruction { building: id });
    engine.step(&mut world.ctx());
    assert_eq!(world.grid.worker_requests, vec![(WorkerKind::Smith, id)]);

    let worker = world.new_worker();
    engine.commands.push(Command::OccupyBuilding { building: id, worker });
    engine.step(&mut world.ctx());
    let building = engine.building(id).unwrap();
    assert!(building.is_occupied());
    assert!(building.is_flag_shown());
    assert_eq!(world.grid.flags, vec![(pos, MapObjectKind::FlagRoof, true)]);

    // Carriers fill the stacks; the worker consumes.
    assert_eq!(engine.deliver_material(id, MaterialKind::Plank, 10).unwrap(), 2);
    assert_eq!(engine.deliver_material(id, MaterialKind::Iron, 1).unwrap(), 0);
    assert_eq!(
        engine.where_is_material_available(id, MaterialKind::Iron),
        Some(TilePosition::new(12, 11))
    );
    assert!(engine.pop_material(id, MaterialKind::Iron));
    assert!(!engine.pop_material(id, MaterialKind::Iron));
    assert_eq!(engine.where_is_material_available(id, MaterialKind::Iron), None);

    // Worker leaves: flag hidden, leftovers dropped, new worker requested.
    engine.commands.push(Command::LeaveBuilding { building: id, worker });
    engine.step(&mut world.ctx());
    let building = engine.building(id).unwrap();
    assert!(!building.is_occupied());
    assert!(!building.is_flag_shown());
    assert_eq!(world.grid.dropped, vec![(TilePosition::new(8, 11), MaterialKind::Plank, 8)]);
    assert_eq!(world.grid.worker_requests.len(), 2);

    engine.commands.push(Command::Destroy { building: id });
    engine.step(&mut world.ctx());
    assert_eq!(engine.building(id).unwrap().state(), BuildingState::Destroyed);
    // No worker inside, so nobody is told.
    assert!(world.workers.destroyed_notices.is_empty());
}

#[test]
fn destruction_notifies_worker_and_runs_cleanups_once() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let id = add_active_building(&mut engine, &mut world, toolsmith(), TilePosition::new(0, 0));
    let worker = world.new_worker();
    engine.occupy_building(id, worker, &mut world.ctx()).unwrap();

    let pig = TilePosition::new(3, 3);
    let wheat = TilePosition::new(4, 3);
    assert!(engine.add_cleanup_position(id, pig, MapObjectKind::Pig));
    assert!(engine.add_cleanup_position(id, wheat, MapObjectKind::Wheat));
    assert!(!engine.add_cleanup_position(id, pig, MapObjectKind::Pig));

    engine.commands.push(Command::Destroy { building: id });
    engine.commands.push(Command::Destroy { building: id });
    let result = engine.step(&mut world.ctx());

    assert_eq!(result.commands_applied, 1);
    assert_eq!(result.commands_rejected, 1);
    assert_eq!(world.workers.destroyed_notices, vec![worker]);
    assert_eq!(
        world.grid.removed,
        vec![(pig, MapObjectKind::Pig), (wheat, MapObjectKind::Wheat)]
    );
    assert!(!engine.add_cleanup_position(id, TilePosition::new(9, 9), MapObjectKind::Vine));
}

// ===========================================================================
// Orders
// ===========================================================================

#[test]
fn production_order_walks_through_materials() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let id = add_active_building(&mut engine, &mut world, toolsmith(), TilePosition::new(0, 0));

    engine.commands.push(Command::SetOrder {
        building: id,
        materials: vec![MaterialKind::Axe, MaterialKind::Pick, MaterialKind::Sword],
    });
    engine.step(&mut world.ctx());

    let mut produced = Vec::new();
    while let Some(material) = engine.ordered_material(id) {
        produced.push(material);
        engine.reduce_order(id).unwrap();
    }
    assert_eq!(produced, vec![MaterialKind::Axe, MaterialKind::Pick, MaterialKind::Sword]);
    assert!(engine.reduce_order(id).is_err());
}

#[test]
fn material_production_settings_come_from_grid() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    world
        .grid
        .settings
        .set_absolute(MaterialKind::Sword, 3);
    let id = add_active_building(&mut engine, &mut world, toolsmith(), TilePosition::new(0, 0));
    let settings = engine.building(id).unwrap().material_production(&world.grid);
    assert_eq!(settings.absolute(MaterialKind::Sword), 3);
}

// ===========================================================================
// Dockyard
// ===========================================================================

#[test]
fn ferry_cycle_spawns_progresses_and_launches() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (id, _) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));

    engine.step(&mut world.ctx());
    let first = world.units.spawned[0];
    let unit = world.units.get(first).unwrap();
    assert_eq!(unit.kind, MovableKind::Ferry);
    assert_eq!(unit.position, TilePosition::new(15, 0));
    assert_eq!(unit.direction, Some(Direction::SouthEast));

    for _ in 0..23 {
        engine.step(&mut world.ctx());
        assert!(engine.building(id).unwrap().ferry().unwrap().ship().is_some());
    }
    engine.step(&mut world.ctx());
    assert!(engine.building(id).unwrap().ferry().unwrap().ship().is_none());
    assert!(world.units.state_progress(first) >= SHIP_COMPLETE_THRESHOLD);

    // Next tick starts another ferry.
    engine.step(&mut world.ctx());
    assert_eq!(world.units.spawned.len(), 2);
    assert!(!world.units.is_killed(first));
}

#[test]
fn moving_the_dock_scraps_the_half_built_ferry() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (id, _) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    engine.advance(5, &mut world.ctx());
    let ferry = world.units.spawned[0];

    engine.commands.push(Command::SetDock {
        building: id,
        dock: [0, 20, 0, 1],
    });
    engine.step(&mut world.ctx());

    assert!(world.units.is_killed(ferry));
    let new_dock = DockPosition::new(TilePosition::new(0, 20), Direction::SouthWest);
    assert_eq!(engine.dock(id), Some(new_dock));
    // Old dock off, new dock on, for the owner.
    let last_two: Vec<_> = world.grid.docks.iter().rev().take(2).collect();
    assert_eq!(*last_two[0], (new_dock, true, PlayerId(0)));
    assert_eq!(*last_two[1], (east_dock(10, 0), false, PlayerId(0)));

    // The same tick already spawned a ferry at the new dock.
    let replacement = *world.units.spawned.last().unwrap();
    assert_eq!(world.units.get(replacement).unwrap().position, TilePosition::new(0, 25));
    assert_eq!(world.units.direction(replacement), Some(Direction::West));
}

#[test]
fn destroying_a_dockyard_kills_ferry_and_releases_dock() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (id, worker) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    engine.advance(3, &mut world.ctx());

    let teardown = engine.destroy(id, &mut world.ctx()).unwrap();
    assert_eq!(teardown.notified_worker, Some(worker));
    assert_eq!(teardown.destroyed_ship, Some(world.units.spawned[0]));
    assert_eq!(world.units.alive_count(), 0);
    assert_eq!(world.grid.docks.last(), Some(&(east_dock(10, 0), false, PlayerId(0))));

    let r = engine.advance(10, &mut world.ctx());
    assert_eq!(r.ship_actions, 0);
}

#[test]
fn producer_ignores_dock_placement() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let id = add_active_building(&mut engine, &mut world, toolsmith(), TilePosition::new(0, 0));
    engine.commands.push(Command::SetDock {
        building: id,
        dock: [5, 5, 1, 0],
    });
    let r = engine.step(&mut world.ctx());
    assert_eq!(r.commands_rejected, 1);
    assert!(world.grid.docks.is_empty());
    assert_eq!(engine.dock(id), None);
}

// ===========================================================================
// Events
// ===========================================================================

#[test]
fn events_follow_transitions_in_order() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (id, worker) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    engine.step(&mut world.ctx());

    let kinds: Vec<EventKind> = engine.event_bus.history().iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::BuildingPlaced,
            EventKind::BuildingCompleted,
            EventKind::WorkerRequested,
            EventKind::WorkerArrived,
            EventKind::DockPlaced,
            EventKind::ShipSpawned,
        ]
    );
    assert!(engine.event_bus.history().iter().all(|e| e.building() == id));
    assert!(engine.event_bus.history().iter().any(|e| matches!(
        e,
        Event::WorkerArrived { worker: w, .. } if *w == worker
    )));
}

#[test]
fn suppressed_progress_events_keep_history_small() {
    let mut engine = Engine::with_config(EngineConfig {
        event_capacity: 8,
        command_history: 4,
    });
    engine.suppress_event(EventKind::ShipProgressed);
    let mut world = MockWorld::default();
    add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    engine.advance(26, &mut world.ctx());

    let history = engine.event_bus.history();
    assert!(history.iter().all(|e| e.kind() != EventKind::ShipProgressed));
    assert!(history.iter().any(|e| e.kind() == EventKind::ShipLaunched));
}

// ===========================================================================
// Determinism and persistence
// ===========================================================================

fn scripted_run(save_at: Option<u64>) -> Vec<u64> {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (yard, _) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    let smithy = add_active_building(&mut engine, &mut world, toolsmith(), TilePosition::new(30, 0));
    let smith = world.new_worker();

    let mut hashes = Vec::new();
    for tick in 0..60u64 {
        match tick {
            3 => engine.commands.push(Command::OccupyBuilding {
                building: smithy,
                worker: smith,
            }),
            10 => engine.commands.push(Command::SetOrder {
                building: yard,
                materials: vec![MaterialKind::Plank],
            }),
            20 => engine.commands.push(Command::SetOrder {
                building: yard,
                materials: vec![],
            }),
            40 => engine.commands.push(Command::Destroy { building: smithy }),
            _ => {}
        }
        if save_at == Some(tick) {
            let data = engine.serialize().unwrap();
            engine = Engine::deserialize(&data).unwrap();
        }
        engine.step(&mut world.ctx());
        hashes.push(engine.state_hash());
    }
    hashes
}

#[test]
fn identical_runs_produce_identical_hashes() {
    assert_eq!(scripted_run(None), scripted_run(None));
}

#[test]
fn save_and_load_mid_run_is_invisible() {
    assert_eq!(scripted_run(None), scripted_run(Some(15)));
    assert_eq!(scripted_run(None), scripted_run(Some(40)));
}
