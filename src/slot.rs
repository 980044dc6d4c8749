use parking_lot::Mutex;

/// The handoff point between one refresher thread and the render loop.
///
/// The lock is held for the whole assignment or copy and never across I/O, so a reader
/// only ever sees a complete value. Every publish bumps a version counter, which lets the
/// reader ask whether anything changed since the last frame.
#[derive(Debug)]
pub struct SharedSlot<T> {
    state: Mutex<SlotState<T>>,
}

#[derive(Debug)]
struct SlotState<T> {
    value: Option<T>,
    version: u64,
}

impl<T> SharedSlot<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                value: None,
                version: 0,
            }),
        }
    }

    /// Replace the current value and return the new version.
    pub fn publish(&self, value: T) -> u64 {
        let mut state = self.state.lock();
        state.value = Some(value);
        state.version += 1;
        state.version
    }

    /// Number of values published so far.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().value.is_none()
    }

    /// Move the value out, leaving the slot empty. The version is not reset.
    pub fn take(&self) -> Option<T> {
        self.state.lock().value.take()
    }
}

impl<T: Clone> SharedSlot<T> {
    pub fn snapshot(&self) -> Option<T> {
        self.state.lock().value.clone()
    }

    /// Copy out the value if it was published after version `seen`, and advance `seen`.
    /// `None` means unchanged.
    pub fn read_newer(&self, seen: &mut u64) -> Option<T> {
        let state = self.state.lock();
        if state.version == *seen {
            return None;
        }
        *seen = state.version;
        state.value.clone()
    }
}

impl<T> Default for SharedSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let slot: SharedSlot<String> = SharedSlot::new();
        assert!(slot.is_empty());
        assert_eq!(slot.version(), 0);
        assert_eq!(slot.snapshot(), None);
    }

    #[test]
    fn read_newer_reports_unchanged() {
        let slot = SharedSlot::new();
        let mut seen = 0;
        assert_eq!(slot.read_newer(&mut seen), None);

        slot.publish("-3°C".to_string());
        assert_eq!(slot.read_newer(&mut seen).as_deref(), Some("-3°C"));
        assert_eq!(seen, 1);
        assert_eq!(slot.read_newer(&mut seen), None);

        // Same text published again is still a new version.
        slot.publish("-3°C".to_string());
        assert_eq!(slot.read_newer(&mut seen).as_deref(), Some("-3°C"));
        assert_eq!(seen, 2);
    }

    #[test]
    fn take_empties_but_keeps_version() {
        let slot = SharedSlot::new();
        slot.publish(7);
        assert_eq!(slot.take(), Some(7));
        assert!(slot.is_empty());
        assert_eq!(slot.version(), 1);
    }
}
