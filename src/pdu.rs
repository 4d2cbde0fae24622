// src/pdu.rs

//! # PDU State Store
//!
//! A fixed table of named slots (protocol data units) shared between the
//! simulation loop and external consumers. Each slot holds one whole record
//! behind its own spin lock, so a reader never observes a half-written
//! record. There is no atomicity across slots.
//!
//! Every slot carries a dirty flag: `write` sets it, `read` and `take`
//! clear it, `peek` leaves it alone.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::trace;
use nalgebra::Vector3;

use crate::controller::{ControlOutput, ControlSetpoint};
use crate::physics::CollisionInput;
use crate::Error;

/// Names of the store slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// Earth-frame position.
    Position,
    /// Earth-frame velocity.
    Velocity,
    /// Body-frame velocity.
    VelocityBodyFrame,
    /// Euler angle.
    Angle,
    /// Euler rates.
    AngularVelocity,
    /// Body-frame angular velocity.
    AngularVelocityBodyFrame,
    /// Simulation time in microseconds.
    SimulationTime,
    /// Last actuator command.
    Actuator,
    /// Command consumed by the controller.
    ControlSetpoint,
    /// Pending contact consumed by the dynamics.
    Collision,
}

impl SlotId {
    /// Number of slots.
    pub const COUNT: usize = 10;

    /// Every slot in index order.
    pub const ALL: [SlotId; SlotId::COUNT] = [
        SlotId::Position,
        SlotId::Velocity,
        SlotId::VelocityBodyFrame,
        SlotId::Angle,
        SlotId::AngularVelocity,
        SlotId::AngularVelocityBodyFrame,
        SlotId::SimulationTime,
        SlotId::Actuator,
        SlotId::ControlSetpoint,
        SlotId::Collision,
    ];

    /// Position of the slot in the table.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for SlotId {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        SlotId::ALL
            .get(index)
            .copied()
            .ok_or(Error::SlotOutOfRange(index))
    }
}

/// Content of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PduRecord {
    /// Never written or cleared by a reset.
    #[default]
    Empty,
    /// A three-component state vector.
    Vector(Vector3<f64>),
    /// Simulation time.
    Time {
        /// Microseconds since start.
        usec: u64,
    },
    /// Thrust and torque command.
    Actuator(ControlOutput),
    /// Controller command.
    Setpoint(ControlSetpoint),
    /// Contact input.
    Collision(CollisionInput),
}

impl PduRecord {
    /// The vector payload, if any.
    pub fn as_vector(&self) -> Option<Vector3<f64>> {
        match self {
            PduRecord::Vector(v) => Some(*v),
            _ => None,
        }
    }

    /// The time payload, if any.
    pub fn as_time_usec(&self) -> Option<u64> {
        match self {
            PduRecord::Time { usec } => Some(*usec),
            _ => None,
        }
    }

    /// The actuator payload, if any.
    pub fn as_actuator(&self) -> Option<ControlOutput> {
        match self {
            PduRecord::Actuator(out) => Some(*out),
            _ => None,
        }
    }

    /// The setpoint payload, if any.
    pub fn as_setpoint(&self) -> Option<ControlSetpoint> {
        match self {
            PduRecord::Setpoint(setpoint) => Some(*setpoint),
            _ => None,
        }
    }

    /// The collision payload, if any.
    pub fn as_collision(&self) -> Option<CollisionInput> {
        match self {
            PduRecord::Collision(collision) => Some(*collision),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct PduSlot {
    busy: AtomicBool,
    dirty: AtomicBool,
    data: UnsafeCell<PduRecord>,
}

// Safety: `data` is only reached through a `SlotGuard`, which exists only
// while `busy` is held by the current thread.
unsafe impl Sync for PduSlot {}

impl PduSlot {
    fn new() -> Self {
        PduSlot {
            busy: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            data: UnsafeCell::new(PduRecord::Empty),
        }
    }

    fn lock(&self) -> SlotGuard<'_> {
        while self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            thread::yield_now();
        }
        SlotGuard { slot: self }
    }
}

/// Exclusive access to one slot. Dropping the guard releases the slot,
/// including during unwinding.
struct SlotGuard<'a> {
    slot: &'a PduSlot,
}

impl SlotGuard<'_> {
    fn record(&self) -> &PduRecord {
        // Safety: the guard holds the busy flag.
        unsafe { &*self.slot.data.get() }
    }

    fn record_mut(&mut self) -> &mut PduRecord {
        // Safety: the guard holds the busy flag.
        unsafe { &mut *self.slot.data.get() }
    }

    fn set_dirty(&self, dirty: bool) {
        self.slot.dirty.store(dirty, Ordering::Release);
    }

    fn is_dirty(&self) -> bool {
        self.slot.dirty.load(Ordering::Acquire)
    }
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.busy.store(false, Ordering::Release);
    }
}

/// Concurrently accessed table of named state slots.
#[derive(Debug)]
pub struct PduStore {
    slots: [PduSlot; SlotId::COUNT],
}

impl PduStore {
    /// A store with every slot empty and clean.
    pub fn new() -> Self {
        PduStore {
            slots: core::array::from_fn(|_| PduSlot::new()),
        }
    }

    fn slot(&self, id: SlotId) -> &PduSlot {
        &self.slots[id.index()]
    }

    /// Stores `record` and marks the slot dirty.
    pub fn write(&self, id: SlotId, record: PduRecord) {
        let mut guard = self.slot(id).lock();
        *guard.record_mut() = record;
        guard.set_dirty(true);
    }

    /// Copies the record out and marks the slot clean.
    pub fn read(&self, id: SlotId) -> PduRecord {
        let guard = self.slot(id).lock();
        guard.set_dirty(false);
        *guard.record()
    }

    /// Copies the record out without touching the dirty flag.
    pub fn peek(&self, id: SlotId) -> PduRecord {
        *self.slot(id).lock().record()
    }

    /// Reads the record only if it was written since the last read.
    pub fn take(&self, id: SlotId) -> Option<PduRecord> {
        let guard = self.slot(id).lock();
        if !guard.is_dirty() {
            return None;
        }
        guard.set_dirty(false);
        Some(*guard.record())
    }

    /// Whether the slot was written since the last read.
    pub fn is_dirty(&self, id: SlotId) -> bool {
        self.slot(id).dirty.load(Ordering::Acquire)
    }

    /// Runs `f` with exclusive access to the slot and marks it dirty when
    /// `f` returns. The slot is released even if `f` panics.
    pub fn with_slot<R>(&self, id: SlotId, f: impl FnOnce(&mut PduRecord) -> R) -> R {
        let mut guard = self.slot(id).lock();
        let result = f(guard.record_mut());
        guard.set_dirty(true);
        result
    }

    /// Empties every slot and clears every dirty flag.
    pub fn reset(&self) {
        for slot in &self.slots {
            let mut guard = slot.lock();
            *guard.record_mut() = PduRecord::Empty;
            guard.set_dirty(false);
        }
        trace!("pdu store reset");
    }

    /// [`PduStore::write`] by raw slot index.
    pub fn write_raw(&self, index: usize, record: PduRecord) -> Result<(), Error> {
        self.write(SlotId::try_from(index)?, record);
        Ok(())
    }

    /// [`PduStore::read`] by raw slot index.
    pub fn read_raw(&self, index: usize) -> Result<PduRecord, Error> {
        Ok(self.read(SlotId::try_from(index)?))
    }

    /// [`PduStore::peek`] by raw slot index.
    pub fn peek_raw(&self, index: usize) -> Result<PduRecord, Error> {
        Ok(self.peek(SlotId::try_from(index)?))
    }
}

impl Default for PduStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    /// Test the dirty flag across write, peek, read and take.
    #[test]
    fn test_dirty_semantics() {
        let store = PduStore::new();
        assert!(!store.is_dirty(SlotId::Position));
        assert_eq!(None, store.take(SlotId::Position));

        let record = PduRecord::Vector(Vector3::new(1.0, 2.0, 3.0));
        store.write(SlotId::Position, record);
        assert!(store.is_dirty(SlotId::Position));

        assert_eq!(record, store.peek(SlotId::Position));
        assert!(store.is_dirty(SlotId::Position), "Peek should keep the slot dirty.");

        assert_eq!(record, store.read(SlotId::Position));
        assert!(!store.is_dirty(SlotId::Position), "Read should clear the dirty flag.");
        assert_eq!(record, store.read(SlotId::Position), "Read should not consume the record.");

        store.write(SlotId::Position, record);
        assert_eq!(Some(record), store.take(SlotId::Position));
        assert_eq!(None, store.take(SlotId::Position));
    }

    /// Test slots are independent.
    #[test]
    fn test_slots_independent() {
        let store = PduStore::new();
        store.write(SlotId::SimulationTime, PduRecord::Time { usec: 42 });
        assert_eq!(PduRecord::Empty, store.peek(SlotId::Position));
        assert!(!store.is_dirty(SlotId::Position));
        assert_eq!(Some(42), store.peek(SlotId::SimulationTime).as_time_usec());
    }

    /// Test raw indices are validated.
    #[test]
    fn test_raw_index_out_of_range() {
        let store = PduStore::new();
        assert!(matches!(
            store.read_raw(SlotId::COUNT),
            Err(Error::SlotOutOfRange(10))
        ));
        assert!(matches!(
            store.write_raw(usize::MAX, PduRecord::Empty),
            Err(Error::SlotOutOfRange(usize::MAX))
        ));

        let record = PduRecord::Time { usec: 7 };
        store.write_raw(SlotId::SimulationTime.index(), record).unwrap();
        assert_eq!(record, store.peek_raw(6).unwrap());
    }

    /// Test every slot id maps to its index and back.
    #[test]
    fn test_slot_id_index() {
        for (index, id) in SlotId::ALL.iter().enumerate() {
            assert_eq!(index, id.index());
            assert_eq!(*id, SlotId::try_from(index).unwrap());
        }
    }

    /// Test the slot is released when the closure panics.
    #[test]
    fn test_release_after_panic() {
        let store = PduStore::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            store.with_slot(SlotId::Angle, |_| panic!("consumer failed"))
        }));
        assert!(result.is_err());

        let record = PduRecord::Vector(Vector3::new(0.1, 0.2, 0.3));
        store.write(SlotId::Angle, record);
        assert_eq!(record, store.read(SlotId::Angle));
    }

    /// Test scoped access mutates in place and marks the slot dirty.
    #[test]
    fn test_with_slot() {
        let store = PduStore::new();
        store.write(SlotId::Velocity, PduRecord::Vector(Vector3::new(1.0, 0.0, 0.0)));
        let _ = store.read(SlotId::Velocity);

        let previous = store.with_slot(SlotId::Velocity, |record| {
            let previous = *record;
            *record = PduRecord::Vector(Vector3::new(2.0, 0.0, 0.0));
            previous
        });
        assert_eq!(Some(Vector3::new(1.0, 0.0, 0.0)), previous.as_vector());
        assert!(store.is_dirty(SlotId::Velocity));
        assert_eq!(
            Some(Vector3::new(2.0, 0.0, 0.0)),
            store.peek(SlotId::Velocity).as_vector()
        );
    }

    /// Test reset empties every slot.
    #[test]
    fn test_reset() {
        let store = PduStore::new();
        for id in SlotId::ALL {
            store.write(id, PduRecord::Time { usec: 1 });
        }
        store.reset();
        for id in SlotId::ALL {
            assert!(!store.is_dirty(id));
            assert_eq!(PduRecord::Empty, store.peek(id));
        }
    }

    /// Test that concurrent readers never observe a torn record.
    #[test]
    fn test_no_torn_records() {
        let store = PduStore::new();
        store.write(SlotId::Position, PduRecord::Vector(Vector3::zeros()));

        thread::scope(|s| {
            for writer in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..5_000 {
                        let value = (writer * 10_000 + i) as f64;
                        store.write(
                            SlotId::Position,
                            PduRecord::Vector(Vector3::new(value, value, value)),
                        );
                    }
                });
            }
            for _ in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..5_000 {
                        let record = if i % 2 == 0 {
                            store.read(SlotId::Position)
                        } else {
                            store.peek(SlotId::Position)
                        };
                        let v = record.as_vector().unwrap();
                        assert!(v.x == v.y && v.y == v.z, "Torn record: {:?}", v);
                    }
                });
            }
        });
    }
}
