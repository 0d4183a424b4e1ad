//! Colony Core -- the worker-building production subsystem of a deterministic
//! tile-grid strategy simulation.
//!
//! A worker building is placed under construction, becomes active, requests a
//! worker of its template's kind, keeps per-material request stacks for its
//! inputs, steps through a production order, and on destruction hands its
//! worker back, drops leftover material and clears map objects it left
//! behind. Dockyards additionally own a dock where they build ferries one
//! fixed-point step per tick.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] runs:
//!
//! 1. **Commands** -- Apply queued [`command_queue::Command`]s in order.
//! 2. **Ferries** -- One ship action per eligible dockyard, in key order.
//! 3. **Post-tick** -- Deliver buffered events to listeners.
//! 4. **Bookkeeping** -- Increment tick counter and compute the state hash.
//!
//! # Collaborators
//!
//! The map grid, the worker registry and the movable-unit grid live outside
//! this crate. Every operation that touches them takes a
//! [`context::Context`] borrowing all three:
//!
//! ```rust,ignore
//! let id = engine.add_building(&registry, dockyard, PlayerId(0), pos)?;
//! engine.commands.push(Command::FinishConstruction { building: id });
//! engine.step(&mut Context::new(&mut grid, &mut workers, &mut units));
//! ```
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Building table and pipeline orchestrator.
//! - [`building::WorkerBuilding`] -- Lifecycle state machine of one building.
//! - [`request_stack::RequestStacks`] -- Per-material input queues.
//! - [`worker_slot::WorkerSlot`] -- At most one worker per building.
//! - [`production_order::ProductionOrder`] -- Cursor over ordered materials.
//! - [`dock::DockFerryController`] -- Dock registration and ferry building.
//! - [`cleanup::CleanupRegistry`] -- Map objects removed on destruction.
//! - [`registry::Registry`] -- Immutable building templates.
//! - [`serialize`] -- Versioned snapshots via bitcode.

pub mod building;
pub mod cleanup;
pub mod command_queue;
pub mod context;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod dock;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod geometry;
pub mod id;
pub mod material;
pub mod production_order;
pub mod registry;
pub mod replay;
pub mod request_stack;
pub mod serialize;
pub mod sim;
pub mod worker_slot;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
