use std::collections::BTreeMap;

use seedwright_core::SequenceInfo;

/// Counter for one identity/serial sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounter {
    pub current: i64,
    pub increment: i64,
}

impl SequenceCounter {
    pub fn next(&mut self) -> i64 {
        let value = self.current;
        self.current += self.increment;
        value
    }
}

/// Sequence counters for one run, created lazily per identifier.
#[derive(Debug, Clone, Default)]
pub struct SequenceAllocator {
    counters: BTreeMap<String, SequenceCounter>,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value for the sequence. The first call starts at the introspected current value,
    /// or at `start` when the database had not used the sequence yet.
    pub fn next(&mut self, info: &SequenceInfo) -> i64 {
        self.counters
            .entry(info.identifier.clone())
            .or_insert_with(|| SequenceCounter {
                current: info.current.unwrap_or(info.start),
                increment: info.increment,
            })
            .next()
    }

    /// Move the counter past `value` if it would otherwise hand it out again.
    pub fn observe(&mut self, info: &SequenceInfo, value: i64) {
        let counter = self
            .counters
            .entry(info.identifier.clone())
            .or_insert_with(|| SequenceCounter {
                current: info.current.unwrap_or(info.start),
                increment: info.increment,
            });
        let behind = if counter.increment >= 0 {
            counter.current <= value
        } else {
            counter.current >= value
        };
        if behind {
            counter.current = value + counter.increment;
        }
    }

    /// Last value handed out (or observed) per identifier.
    pub fn last_values(&self) -> impl Iterator<Item = (&str, i64)> {
        self.counters
            .iter()
            .map(|(identifier, counter)| (identifier.as_str(), counter.current - counter.increment))
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(identifier: &str, start: i64, increment: i64, current: Option<i64>) -> SequenceInfo {
        SequenceInfo {
            identifier: identifier.to_string(),
            increment,
            start,
            current,
        }
    }

    #[test]
    fn continues_from_current_value() {
        let mut allocator = SequenceAllocator::new();
        let seq = info("public.user_id_seq", 1, 1, Some(41));
        assert_eq!(allocator.next(&seq), 41);
        assert_eq!(allocator.next(&seq), 42);
        assert_eq!(allocator.next(&seq), 43);
    }

    #[test]
    fn starts_at_start_and_honors_increment() {
        let mut allocator = SequenceAllocator::new();
        let seq = info("s", 10, 5, None);
        let values: Vec<i64> = (0..4).map(|_| allocator.next(&seq)).collect();
        assert_eq!(values, vec![10, 15, 20, 25]);
        assert_eq!(allocator.last_values().collect::<Vec<_>>(), vec![("s", 25)]);
    }

    #[test]
    fn identifiers_are_independent() {
        let mut allocator = SequenceAllocator::new();
        let a = info("a", 1, 1, None);
        let b = info("b", 100, 1, None);
        allocator.next(&a);
        assert_eq!(allocator.next(&b), 100);
        assert_eq!(allocator.next(&a), 2);
    }

    #[test]
    fn observed_values_are_skipped() {
        let mut allocator = SequenceAllocator::new();
        let seq = info("s", 1, 1, None);
        allocator.observe(&seq, 7);
        assert_eq!(allocator.next(&seq), 8);
        allocator.observe(&seq, 3);
        assert_eq!(allocator.next(&seq), 9);
    }
}
