/// Version tracker - bumped whenever a render-affecting property changes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    /// Marks as modified, increments version by 1
    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Gets the current version number
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Assigns `value` to `field` and bumps the version, but only when the
    /// value actually differs. Returns whether a change happened.
    pub fn set<T: PartialEq>(&mut self, field: &mut T, value: T) -> bool {
        if set_if_changed(field, value) {
            self.changed();
            true
        } else {
            false
        }
    }
}

/// Assigns `value` to `field` when it differs. Returns whether a change happened.
pub fn set_if_changed<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_same_value_keeps_version() {
        let mut tracker = ChangeTracker::new();
        let mut field = 3;
        assert!(!tracker.set(&mut field, 3));
        assert_eq!(tracker.version(), 0);
        assert!(tracker.set(&mut field, 4));
        assert_eq!(tracker.version(), 1);
        assert_eq!(field, 4);
    }
}
