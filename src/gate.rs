use std::sync::{Condvar, Mutex};

/// Counting admission gate allowing at most `capacity` holders at once.
///
/// `acquire` blocks while the gate is full. The returned permit releases its
/// slot on drop, so a slot is freed on every exit path of the holder.
pub struct AdmissionGate {
    state: Mutex<GateState>,
    released: Condvar,
    capacity: usize,
}

#[derive(Default)]
struct GateState {
    in_flight: usize,
    peak: usize,
    admitted: u64,
}

/// Slot held in an `AdmissionGate`; dropping it releases the slot.
pub struct AdmissionPermit<'a> {
    gate: &'a AdmissionGate,
}

impl AdmissionGate {
    /// Create a gate with `capacity` slots (clamped to at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            released: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Block until a slot is free, then take it.
    pub fn acquire(&self) -> AdmissionPermit<'_> {
        let mut state = self.state.lock().expect("admission gate poisoned");
        while state.in_flight >= self.capacity {
            state = self
                .released
                .wait(state)
                .expect("admission gate poisoned");
        }
        state.in_flight += 1;
        state.peak = state.peak.max(state.in_flight);
        state.admitted = state.admitted.saturating_add(1);
        AdmissionPermit { gate: self }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<AdmissionPermit<'_>> {
        let mut state = self.state.lock().expect("admission gate poisoned");
        if state.in_flight >= self.capacity {
            return None;
        }
        state.in_flight += 1;
        state.peak = state.peak.max(state.in_flight);
        state.admitted = state.admitted.saturating_add(1);
        Some(AdmissionPermit { gate: self })
    }

    /// Slots currently held.
    pub fn in_flight(&self) -> usize {
        self.state.lock().expect("admission gate poisoned").in_flight
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.state.lock().expect("admission gate poisoned").peak
    }

    /// Total permits handed out.
    pub fn admitted(&self) -> u64 {
        self.state.lock().expect("admission gate poisoned").admitted
    }

    fn release(&self) {
        // Release must not panic inside Drop; recover the guard if poisoned.
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.in_flight = state.in_flight.saturating_sub(1);
        drop(state);
        self.released.notify_one();
    }
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
