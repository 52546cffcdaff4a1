use std::{cmp::Ordering, collections::BinaryHeap, fmt};

use crate::protocol::Packet;

/// Simulated time, in abstract time units.
pub type SimTime = f64;

/// One of the two protocol entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    /// The sending side.
    A,
    /// The receiving side.
    B,
}

impl Entity {
    /// The entity on the other end of the channel.
    pub const fn peer(self) -> Self {
        match self {
            Entity::A => Entity::B,
            Entity::B => Entity::A,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::A => f.write_str("A"),
            Entity::B => f.write_str("B"),
        }
    }
}

/// Discriminant of an [`Event`], used for targeted queries on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A retransmission timer went off.
    TimerInterrupt,
    /// The application layer produced a message.
    AppMessageArrival,
    /// A packet came out of the channel.
    ChannelPacketArrival,
}

/// Events that can be scheduled in the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The timer of `entity` expired.
    TimerInterrupt {
        /// Owner of the timer.
        entity: Entity,
    },
    /// The application layer hands a new message to `entity`.
    AppMessageArrival {
        /// Entity receiving the message.
        entity: Entity,
    },
    /// A packet arrives at `entity` from the channel.
    ChannelPacketArrival {
        /// Destination entity.
        entity: Entity,
        /// The channel's own copy of the packet.
        packet: Packet,
        /// Whether the channel corrupted this copy. Never shown to the entity.
        corrupted: bool,
    },
}

impl Event {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TimerInterrupt { .. } => EventKind::TimerInterrupt,
            Event::AppMessageArrival { .. } => EventKind::AppMessageArrival,
            Event::ChannelPacketArrival { .. } => EventKind::ChannelPacketArrival,
        }
    }

    /// The entity where the event occurs.
    pub fn entity(&self) -> Entity {
        match self {
            Event::TimerInterrupt { entity }
            | Event::AppMessageArrival { entity }
            | Event::ChannelPacketArrival { entity, .. } => *entity,
        }
    }

    fn matches(&self, kind: EventKind, entity: Entity) -> bool {
        self.kind() == kind && self.entity() == entity
    }
}

/// An event scheduled for execution at a specific simulation time.
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    time: SimTime,
    event: Event,
    sequence: u64, // For deterministic ordering
}

impl ScheduledEvent {
    /// Creates a new scheduled event.
    pub fn new(time: SimTime, event: Event, sequence: u64) -> Self {
        Self {
            time,
            event,
            sequence,
        }
    }

    /// Returns the scheduled execution time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns a reference to the event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Returns the insertion sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Consumes the scheduled event and returns the event.
    pub fn into_event(self) -> Event {
        self.event
    }

    /// Ascending (time, sequence) order: the order events are executed in.
    fn execution_order(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, but we want earliest time first
        other.execution_order(self)
    }
}

/// A priority queue for scheduling events in chronological order.
///
/// Events are processed in time order. Events scheduled for the same time are
/// processed in the order they were inserted, which the sequence number
/// captures.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
}

impl EventQueue {
    /// Creates a new empty event queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Schedules an event for execution.
    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.heap.push(event);
    }

    /// Removes and returns the earliest scheduled event.
    pub fn pop_earliest(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    /// Returns `true` if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of events in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether an event of `kind` addressed to `entity` is pending.
    pub fn contains(&self, kind: EventKind, entity: Entity) -> bool {
        self.heap.iter().any(|e| e.event.matches(kind, entity))
    }

    /// Removes the earliest pending event of `kind` addressed to `entity`.
    ///
    /// At most one event is removed. Returns whether one was found.
    pub fn cancel_matching(&mut self, kind: EventKind, entity: Entity) -> bool {
        let target = self
            .heap
            .iter()
            .filter(|e| e.event.matches(kind, entity))
            .min_by(|a, b| a.execution_order(b))
            .map(ScheduledEvent::sequence);

        match target {
            Some(sequence) => {
                self.heap.retain(|e| e.sequence != sequence);
                true
            }
            None => false,
        }
    }

    /// Latest time at which a channel arrival for `entity` is scheduled.
    pub fn latest_arrival_for(&self, entity: Entity) -> Option<SimTime> {
        self.heap
            .iter()
            .filter(|e| e.event.matches(EventKind::ChannelPacketArrival, entity))
            .map(ScheduledEvent::time)
            .max_by(f64::total_cmp)
    }

    /// Pending events in execution order.
    pub fn snapshot(&self) -> Vec<&ScheduledEvent> {
        let mut events: Vec<_> = self.heap.iter().collect();
        events.sort_by(|a, b| a.execution_order(b));
        events
    }
}
