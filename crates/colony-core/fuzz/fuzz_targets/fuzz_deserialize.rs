#![no_main]
use colony_core::engine::Engine;
use colony_core::material::MaterialKind;
use colony_core::test_utils::MockWorld;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic; returning Err is fine.
    let Ok(mut engine) = Engine::deserialize(data) else {
        return;
    };

    // A snapshot that decodes must also be safe to run.
    let mut world = MockWorld::default();
    let ids: Vec<_> = engine.buildings().map(|(id, _)| id).collect();
    for id in ids {
        let _ = engine.deliver_material(id, MaterialKind::Plank, 3);
        let _ = engine.pop_material(id, MaterialKind::Iron);
        let _ = engine.reduce_order(id);
    }
    engine.advance(4, &mut world.ctx());
});
