//! Bounded, newest-first display history.
//!
//! Carries no financial authority: nothing here is ever consulted when
//! computing a balance.

use std::collections::VecDeque;

#[derive(Clone, Debug)]
pub(crate) struct RingHistory<T> {
    cap: usize,
    items: VecDeque<T>,
}

impl<T: Clone> RingHistory<T> {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            items: VecDeque::new(),
        }
    }

    /// Insert at the front, evicting the oldest entry past capacity.
    pub(crate) fn push(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.cap);
    }

    pub(crate) fn items(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_and_bounded() {
        let mut history = RingHistory::new(3);
        for i in 0..5 {
            history.push(i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.items(), vec![4, 3, 2]);
    }
}
