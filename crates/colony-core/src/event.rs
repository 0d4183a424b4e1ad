//! Building events with a pre-allocated ring buffer.
//!
//! The engine emits an [`Event`] for every observable building transition
//! while it applies commands and runs the ferry phase. Events are buffered
//! during the tick and delivered in one batch at its end: passive listeners
//! see them in emission order, then they move into a fixed-capacity history
//! ring buffer (oldest dropped first).
//!
//! Event kinds can be suppressed via [`EventBus::suppress`]; suppressed kinds
//! are never buffered or delivered.

use crate::fixed::{Fixed64, Ticks};
use crate::geometry::TilePosition;
use crate::id::{BuildingId, BuildingTypeId, UnitId, WorkerId};
use crate::material::WorkerKind;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A building event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BuildingPlaced {
        building: BuildingId,
        building_type: BuildingTypeId,
        tick: Ticks,
    },
    BuildingCompleted {
        building: BuildingId,
        tick: Ticks,
    },
    WorkerRequested {
        building: BuildingId,
        kind: WorkerKind,
        tick: Ticks,
    },
    WorkerArrived {
        building: BuildingId,
        worker: WorkerId,
        tick: Ticks,
    },
    WorkerLeft {
        building: BuildingId,
        worker: WorkerId,
        tick: Ticks,
    },
    DockPlaced {
        building: BuildingId,
        dock: [i32; 4],
        tick: Ticks,
    },
    ShipSpawned {
        building: BuildingId,
        unit: UnitId,
        position: TilePosition,
        tick: Ticks,
    },
    ShipProgressed {
        building: BuildingId,
        unit: UnitId,
        progress: Fixed64,
        tick: Ticks,
    },
    ShipLaunched {
        building: BuildingId,
        unit: UnitId,
        tick: Ticks,
    },
    ShipAbandoned {
        building: BuildingId,
        unit: UnitId,
        tick: Ticks,
    },
    BuildingDestroyed {
        building: BuildingId,
        cleanups: usize,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BuildingPlaced,
    BuildingCompleted,
    WorkerRequested,
    WorkerArrived,
    WorkerLeft,
    DockPlaced,
    ShipSpawned,
    ShipProgressed,
    ShipLaunched,
    ShipAbandoned,
    BuildingDestroyed,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 11;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BuildingPlaced { .. } => EventKind::BuildingPlaced,
            Event::BuildingCompleted { .. } => EventKind::BuildingCompleted,
            Event::WorkerRequested { .. } => EventKind::WorkerRequested,
            Event::WorkerArrived { .. } => EventKind::WorkerArrived,
            Event::WorkerLeft { .. } => EventKind::WorkerLeft,
            Event::DockPlaced { .. } => EventKind::DockPlaced,
            Event::ShipSpawned { .. } => EventKind::ShipSpawned,
            Event::ShipProgressed { .. } => EventKind::ShipProgressed,
            Event::ShipLaunched { .. } => EventKind::ShipLaunched,
            Event::ShipAbandoned { .. } => EventKind::ShipAbandoned,
            Event::BuildingDestroyed { .. } => EventKind::BuildingDestroyed,
        }
    }

    /// The building the event is about.
    pub fn building(&self) -> BuildingId {
        match *self {
            Event::BuildingPlaced { building, .. }
            | Event::BuildingCompleted { building, .. }
            | Event::WorkerRequested { building, .. }
            | Event::WorkerArrived { building, .. }
            | Event::WorkerLeft { building, .. }
            | Event::DockPlaced { building, .. }
            | Event::ShipSpawned { building, .. }
            | Event::ShipProgressed { building, .. }
            | Event::ShipLaunched { building, .. }
            | Event::ShipAbandoned { building, .. }
            | Event::BuildingDestroyed { building, .. } => building,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    /// Pre-allocated storage.
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    /// Number of events currently stored (may be less than capacity).
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event into the ring buffer. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events that were dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Iterate over events in order from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head points to the next write position, which is the oldest entry
            self.head
        };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over events in an [`EventBuffer`], from oldest to newest.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Buffers events during a tick and delivers them at its end.
pub struct EventBus {
    /// Events emitted this tick, in emission order.
    pending: Vec<Event>,
    /// Delivered events.
    history: EventBuffer,
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: Vec<(EventKind, PassiveListener)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending)
            .field("history", &self.history)
            .field("suppressed", &self.suppressed)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Create a bus whose history keeps the last `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: EventBuffer::new(capacity),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Vec::new(),
        }
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Register a read-only listener for one event kind.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.listeners.push((kind, listener));
    }

    /// Buffer an event for delivery at the end of the tick.
    pub fn emit(&mut self, event: Event) {
        if !self.is_suppressed(event.kind()) {
            self.pending.push(event);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Deliver buffered events to listeners (registration order per event),
    /// then move them into the history buffer.
    pub fn deliver(&mut self) {
        for event in self.pending.drain(..) {
            let kind = event.kind();
            for (k, listener) in &mut self.listeners {
                if *k == kind {
                    listener(&event);
                }
            }
            self.history.push(event);
        }
    }

    /// Delivered events, oldest first.
    pub fn history(&self) -> &EventBuffer {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
