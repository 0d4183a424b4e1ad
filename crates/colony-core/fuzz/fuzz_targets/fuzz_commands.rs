#![no_main]
use arbitrary::Arbitrary;
use colony_core::command_queue::Command;
use colony_core::engine::Engine;
use colony_core::geometry::TilePosition;
use colony_core::id::*;
use colony_core::material::{MapObjectKind, MaterialKind};
use colony_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

/// A structured building command for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Place { dockyard: bool },
    Finish { building: u8 },
    Occupy { building: u8, worker: u8 },
    Leave { building: u8, worker: u8 },
    Order { building: u8, len: u8 },
    Reduce { building: u8 },
    Dock { building: u8, x: i32, y: i32, dx: i8, dy: i8 },
    Cleanup { building: u8, x: i8, y: i8 },
    Deliver { building: u8, quantity: u8 },
    Pop { building: u8 },
    Destroy { building: u8 },
    Compact,
    Step,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn pick<T: Copy>(items: &[T], index: u8) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[index as usize % items.len()])
    }
}

fuzz_target!(|input: FuzzInput| {
    let registry = test_registry();
    let mut engine = Engine::new();
    let mut world = MockWorld::default();
    let workers: Vec<WorkerId> = (0..4).map(|_| world.new_worker()).collect();
    let mut buildings: Vec<BuildingId> = Vec::new();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(300);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::Place { dockyard: yard } => {
                let type_id = if yard { dockyard() } else { toolsmith() };
                let pos = TilePosition::new(buildings.len() as i32 * 12, 0);
                if let Ok(id) = engine.add_building(&registry, type_id, PlayerId(0), pos) {
                    buildings.push(id);
                }
            }
            FuzzOp::Finish { building } => {
                if let Some(b) = pick(&buildings, building) {
                    engine.commands.push(Command::FinishConstruction { building: b });
                }
            }
            FuzzOp::Occupy { building, worker } => {
                if let (Some(b), Some(w)) = (pick(&buildings, building), pick(&workers, worker)) {
                    engine.commands.push(Command::OccupyBuilding { building: b, worker: w });
                }
            }
            FuzzOp::Leave { building, worker } => {
                if let (Some(b), Some(w)) = (pick(&buildings, building), pick(&workers, worker)) {
                    engine.commands.push(Command::LeaveBuilding { building: b, worker: w });
                }
            }
            FuzzOp::Order { building, len } => {
                if let Some(b) = pick(&buildings, building) {
                    let materials = vec![MaterialKind::Axe; (len % 8) as usize];
                    engine.commands.push(Command::SetOrder { building: b, materials });
                }
            }
            FuzzOp::Reduce { building } => {
                if let Some(b) = pick(&buildings, building) {
                    let _ = engine.reduce_order(b);
                }
            }
            FuzzOp::Dock { building, x, y, dx, dy } => {
                if let Some(b) = pick(&buildings, building) {
                    let dock = [x, y, dx.into(), dy.into()];
                    engine.commands.push(Command::SetDock { building: b, dock });
                }
            }
            FuzzOp::Cleanup { building, x, y } => {
                if let Some(b) = pick(&buildings, building) {
                    engine.commands.push(Command::AddCleanupPosition {
                        building: b,
                        position: TilePosition::new(x.into(), y.into()),
                        kind: MapObjectKind::Pig,
                    });
                }
            }
            FuzzOp::Deliver { building, quantity } => {
                if let Some(b) = pick(&buildings, building) {
                    let _ = engine.deliver_material(b, MaterialKind::Plank, quantity.into());
                }
            }
            FuzzOp::Pop { building } => {
                if let Some(b) = pick(&buildings, building) {
                    let _ = engine.pop_material(b, MaterialKind::Plank);
                }
            }
            FuzzOp::Destroy { building } => {
                if let Some(b) = pick(&buildings, building) {
                    engine.commands.push(Command::Destroy { building: b });
                }
            }
            FuzzOp::Compact => {
                engine.compact();
            }
            FuzzOp::Step => {
                engine.step(&mut world.ctx());
            }
        }
    }

    engine.step(&mut world.ctx());
});
