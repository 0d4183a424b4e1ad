//! Shipyard example: a dockyard building ferries.
//!
//! Places a dockyard, finishes it, lets a shipwright move in, places a dock
//! and runs the simulation until two ferries have left. Every building event
//! is printed as it is delivered.
//!
//! Run with: `RUST_LOG=colony_core=debug cargo run -p colony-core --example shipyard`

use colony_core::command_queue::Command;
use colony_core::engine::Engine;
use colony_core::event::{Event, EventKind};
use colony_core::geometry::TilePosition;
use colony_core::id::PlayerId;
use colony_core::test_utils::{MockWorld, dockyard, test_registry};
use std::cell::Cell;
use std::rc::Rc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let registry = test_registry();
    let mut engine = Engine::new();
    let mut world = MockWorld::default();

    for kind in [
        EventKind::WorkerRequested,
        EventKind::DockPlaced,
        EventKind::ShipSpawned,
        EventKind::ShipLaunched,
    ] {
        engine.on_passive(kind, Box::new(|event: &Event| println!("  {event:?}")));
    }

    let yard = engine
        .add_building(&registry, dockyard(), PlayerId(0), TilePosition::new(40, 40))
        .unwrap();
    let shipwright = world.new_worker();

    engine.commands.push_batch([
        Command::FinishConstruction { building: yard },
        Command::OccupyBuilding {
            building: yard,
            worker: shipwright,
        },
        Command::SetDock {
            building: yard,
            dock: [50, 40, 1, 0],
        },
    ]);

    let launched = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&launched);
    engine.on_passive(
        EventKind::ShipLaunched,
        Box::new(move |_: &Event| counter.set(counter.get() + 1)),
    );

    while launched.get() < 2 {
        engine.step(&mut world.ctx());
    }

    println!(
        "tick {}: {} ferries launched, {} units spawned, hash 0x{:016X}",
        engine.sim_state.tick,
        launched.get(),
        world.units.spawned.len(),
        engine.state_hash()
    );
}
