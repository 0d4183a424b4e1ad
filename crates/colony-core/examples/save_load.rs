//! Save/load example: serialization round-trip.
//!
//! Runs a dockyard for 10 ticks, serializes the engine, deserializes it into
//! a new engine, and verifies the state hash matches.
//!
//! Run with: `cargo run -p colony-core --example save_load`

use colony_core::engine::Engine;
use colony_core::geometry::TilePosition;
use colony_core::test_utils::{MockWorld, add_working_dockyard};

fn main() {
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let (yard, _) = add_working_dockyard(&mut engine, &mut world, TilePosition::new(0, 0));
    engine.advance(10, &mut world.ctx());

    let data = engine.serialize().unwrap();
    println!("snapshot: {} bytes at tick {}", data.len(), engine.sim_state.tick);

    let restored = Engine::deserialize(&data).unwrap();
    assert_eq!(restored.state_hash(), engine.state_hash());

    let ship = restored.building(yard).and_then(|b| b.ferry()).and_then(|f| f.ship());
    println!("restored hash 0x{:016X}, ferry under construction: {ship:?}", restored.state_hash());
}
