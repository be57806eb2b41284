//! Index-based doubly linked recency list.
//!
//! Entries live in a slot vector and link to each other by index, so moving
//! an entry to the front, unlinking it, or popping the back are all O(1) and
//! never reallocate per operation. Freed slots are recycled.

use chrono::{DateTime, Utc};

#[derive(Debug)]
pub(crate) struct Slot<V> {
    pub(crate) key: String,
    pub(crate) value: V,
    pub(crate) last_access: DateTime<Utc>,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Front is most recently used, back is least recently used.
#[derive(Debug)]
pub(crate) struct RecencyList<V> {
    slots: Vec<Option<Slot<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<V> RecencyList<V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, idx: usize) -> Option<&Slot<V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, idx: usize) -> Option<&mut Slot<V>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    /// Insert a new entry at the front and return its slot index.
    pub(crate) fn push_front(&mut self, key: String, value: V, now: DateTime<Utc>) -> usize {
        let slot = Slot {
            key,
            value,
            last_access: now,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        idx
    }

    /// Mark `idx` as just used: move it to the front and stamp `now`.
    pub(crate) fn touch(&mut self, idx: usize, now: DateTime<Utc>) {
        if self.get(idx).is_none() {
            return;
        }
        if self.head != Some(idx) {
            self.unlink(idx);
            self.link_front(idx);
        }
        if let Some(slot) = self.get_mut(idx) {
            slot.last_access = now;
        }
    }

    /// Replace the value at `idx` and touch it.
    pub(crate) fn replace(&mut self, idx: usize, value: V, now: DateTime<Utc>) {
        if let Some(slot) = self.get_mut(idx) {
            slot.value = value;
        }
        self.touch(idx, now);
    }

    /// Unlink and free `idx`, returning its entry.
    pub(crate) fn remove(&mut self, idx: usize) -> Option<Slot<V>> {
        self.get(idx)?;
        self.unlink(idx);
        let slot = self.slots[idx].take();
        self.free.push(idx);
        self.len -= 1;
        slot
    }

    /// Remove the least recently used entry.
    pub(crate) fn pop_back(&mut self) -> Option<Slot<V>> {
        let tail = self.tail?;
        self.remove(tail)
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Keys from most to least recently used.
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(slot) = self.get(idx) else { break };
            keys.push(slot.key.clone());
            cursor = slot.next;
        }
        keys
    }

    fn unlink(&mut self, idx: usize) {
        let Some(slot) = self.get_mut(idx) else { return };
        let (prev, next) = (slot.prev.take(), slot.next.take());
        match prev {
            Some(p) => {
                if let Some(s) = self.get_mut(p) {
                    s.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.get_mut(n) {
                    s.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(slot) = self.get_mut(idx) {
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => {
                if let Some(s) = self.get_mut(h) {
                    s.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(keys: &[&str]) -> RecencyList<u32> {
        let mut list = RecencyList::new();
        for (i, k) in keys.iter().enumerate() {
            list.push_front((*k).to_string(), i as u32, Utc::now());
        }
        list
    }

    #[test]
    fn push_front_orders_newest_first() {
        let list = list_of(&["a", "b", "c"]);
        assert_eq!(list.keys(), vec!["c", "b", "a"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn touch_moves_to_front() {
        let mut list = list_of(&["a", "b", "c"]);
        list.touch(0, Utc::now());
        assert_eq!(list.keys(), vec!["a", "c", "b"]);
        list.touch(0, Utc::now());
        assert_eq!(list.keys(), vec!["a", "c", "b"]);
    }

    #[test]
    fn pop_back_removes_oldest() {
        let mut list = list_of(&["a", "b", "c"]);
        let popped = list.pop_back().unwrap();
        assert_eq!(popped.key, "a");
        assert_eq!(list.keys(), vec!["c", "b"]);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut list = list_of(&["a", "b"]);
        list.remove(0).unwrap();
        let idx = list.push_front("c".into(), 9, Utc::now());
        assert_eq!(idx, 0);
        assert_eq!(list.keys(), vec!["c", "b"]);
    }

    #[test]
    fn remove_middle_relinks_neighbours() {
        let mut list = list_of(&["a", "b", "c"]);
        list.remove(1).unwrap();
        assert_eq!(list.keys(), vec!["c", "a"]);
        assert_eq!(list.pop_back().unwrap().key, "a");
        assert_eq!(list.pop_back().unwrap().key, "c");
        assert!(list.pop_back().is_none());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn remove_of_freed_slot_is_noop() {
        let mut list = list_of(&["a"]);
        assert!(list.remove(0).is_some());
        assert!(list.remove(0).is_none());
        assert_eq!(list.len(), 0);
    }
}
