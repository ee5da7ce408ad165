use std::collections::HashMap;
use std::sync::Mutex;

/// Per-type, per-year counter backing reference-code allocation.
///
/// Codes follow the `{type}/{counter:04}/{year}` shape and counters never
/// repeat or go backwards within a `(type, year)` bucket, even under
/// concurrent allocation.
pub struct SequenceGenerator {
    counters: Mutex<HashMap<(String, i32), u32>>,
}

impl SequenceGenerator {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Raises the floor for a bucket so that freshly allocated codes never
    /// collide with documents already present. Lower seeds are ignored.
    pub fn seed(&self, type_code: &str, year: i32, existing_count: u32) {
        let mut counters = self.counters.lock().expect("sequence mutex poisoned");
        let entry = counters.entry((type_code.to_string(), year)).or_insert(0);
        if existing_count > *entry {
            *entry = existing_count;
        }
    }

    /// Allocates the next reference code for the bucket.
    pub fn next_code(&self, type_code: &str, year: i32) -> String {
        let mut counters = self.counters.lock().expect("sequence mutex poisoned");
        let entry = counters.entry((type_code.to_string(), year)).or_insert(0);
        *entry += 1;
        format!("{}/{:04}/{}", type_code, *entry, year)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}
