//! Helpers for bounded configuration values.

use std::cmp;

//------------ DefMinMax -----------------------------------------------------

/// The default, minimum, and maximum values for a config variable.
#[derive(Clone, Copy, Debug)]
pub struct DefMinMax<T> {
    /// The default value,
    def: T,

    /// The minimum value,
    min: T,

    /// The maximum value,
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Returns the minimum value.
    pub fn min(self) -> T {
        self.min
    }

    /// Returns the maximum value.
    pub fn max(self) -> T {
        self.max
    }

    /// Trims the given value to fit into the minimum/maximum range.
    pub fn limit(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }

    /// Returns whether the value is within the minimum/maximum range.
    pub fn contains(self, value: &T) -> bool
    where
        T: Ord,
    {
        self.min <= *value && *value <= self.max
    }
}

//============ Tests =========================================================
