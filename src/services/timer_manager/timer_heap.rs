use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Идентификатор таймера. Уникален, пока таймер зарегистрирован.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub i32);

impl TimerId {
    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TIMER_{}", self.0)
    }
}

pub(crate) type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

pub(crate) struct Timer {
    pub id: TimerId,
    pub interval: Duration,
    pub next_call_time: Instant,
    pub callback: TimerCallback,
    seq: u64,
}

impl Timer {
    // Равные дедлайны срабатывают в порядке добавления
    fn key(&self) -> (Instant, u64) {
        (self.next_call_time, self.seq)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.id)
            .field("interval", &self.interval)
            .field("next_call_time", &self.next_call_time)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

/// Бинарная min-heap по дедлайну с индексом `TimerId -> позиция`.
///
/// Индекс обновляется при каждом обмене элементов, поэтому удаление
/// произвольного таймера стоит O(log n).
#[derive(Debug, Default)]
pub(crate) struct TimerHeap {
    slots: Vec<Timer>,
    index: HashMap<TimerId, usize>,
    next_seq: u64,
}

impl TimerHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn peek_deadline(&self) -> Option<Instant> {
        self.slots.first().map(|timer| timer.next_call_time)
    }

    pub fn push(
        &mut self,
        id: TimerId,
        interval: Duration,
        next_call_time: Instant,
        callback: TimerCallback,
    ) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let pos = self.slots.len();
        self.slots.push(Timer {
            id,
            interval,
            next_call_time,
            callback,
            seq,
        });
        self.index.insert(id, pos);
        self.sift_up(pos);
    }

    pub fn remove(&mut self, id: TimerId) -> Option<Timer> {
        let pos = self.index.remove(&id)?;
        let last = self.slots.len() - 1;
        if pos != last {
            self.slots.swap(pos, last);
            self.index.insert(self.slots[pos].id, pos);
        }
        let timer = self.slots.pop()?;

        if pos < self.slots.len() {
            let moved_to = self.sift_down(pos);
            if moved_to == pos {
                self.sift_up(pos);
            }
        }
        Some(timer)
    }

    /// Извлечь все таймеры с дедлайном `<= now` в порядке срабатывания
    pub fn pop_due(&mut self, now: Instant) -> Vec<Timer> {
        let mut due = Vec::new();
        while let Some(head) = self.slots.first() {
            if head.next_call_time > now {
                break;
            }
            let id = head.id;
            if let Some(timer) = self.remove(id) {
                due.push(timer);
            }
        }
        due
    }

    pub fn clear(&mut self) -> usize {
        let count = self.slots.len();
        self.slots.clear();
        self.index.clear();
        count
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.slots[pos].key() < self.slots[parent].key() {
                self.swap_slots(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) -> usize {
        let len = self.slots.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;

            if left < len && self.slots[left].key() < self.slots[smallest].key() {
                smallest = left;
            }
            if right < len && self.slots[right].key() < self.slots[smallest].key() {
                smallest = right;
            }
            if smallest == pos {
                return pos;
            }
            self.swap_slots(pos, smallest);
            pos = smallest;
        }
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.slots.swap(a, b);
        self.index.insert(self.slots[a].id, a);
        self.index.insert(self.slots[b].id, b);
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let heap_ok = (1..self.slots.len())
            .all(|i| self.slots[(i - 1) / 2].key() <= self.slots[i].key());
        let index_ok = self.index.len() == self.slots.len()
            && self
                .slots
                .iter()
                .enumerate()
                .all(|(pos, timer)| self.index.get(&timer.id) == Some(&pos));
        heap_ok && index_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_at(heap: &mut TimerHeap, base: Instant, id: i32, offset_ms: u64) {
        heap.push(
            TimerId(id),
            Duration::from_millis(offset_ms),
            base + Duration::from_millis(offset_ms),
            Box::new(|| {}),
        );
    }

    #[test]
    fn pops_in_deadline_order() {
        let base = Instant::now();
        let mut heap = TimerHeap::new();
        for (id, offset) in [(0, 50), (1, 10), (2, 40), (3, 20), (4, 30)] {
            push_at(&mut heap, base, id, offset);
        }
        assert!(heap.is_consistent());

        let due = heap.pop_due(base + Duration::from_millis(100));
        let ids: Vec<i32> = due.iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![1, 3, 4, 2, 0]);
        assert!(heap.is_empty());
    }

    #[test]
    fn pop_due_leaves_future_timers() {
        let base = Instant::now();
        let mut heap = TimerHeap::new();
        push_at(&mut heap, base, 0, 10);
        push_at(&mut heap, base, 1, 500);

        let due = heap.pop_due(base + Duration::from_millis(20));
        assert_eq!(due.len(), 1);
        assert_eq!(heap.len(), 1);
        assert!(heap.contains(TimerId(1)));
        assert_eq!(heap.peek_deadline(), Some(base + Duration::from_millis(500)));
    }

    #[test]
    fn equal_deadlines_fire_in_insertion_order() {
        let base = Instant::now();
        let mut heap = TimerHeap::new();
        for id in 0..6 {
            push_at(&mut heap, base, id, 10);
        }

        let due = heap.pop_due(base + Duration::from_millis(10));
        let ids: Vec<i32> = due.iter().map(|t| t.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn remove_from_middle_keeps_heap_and_index_valid() {
        let base = Instant::now();
        let mut heap = TimerHeap::new();
        for id in 0..32 {
            push_at(&mut heap, base, id, ((id * 37) % 101) as u64);
        }

        for id in [5, 17, 0, 31, 12] {
            let removed = heap.remove(TimerId(id)).map(|t| t.id);
            assert_eq!(removed, Some(TimerId(id)));
            assert!(heap.is_consistent());
        }
        assert_eq!(heap.len(), 27);
        assert!(heap.remove(TimerId(5)).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let base = Instant::now();
        let mut heap = TimerHeap::new();
        push_at(&mut heap, base, 0, 10);
        push_at(&mut heap, base, 1, 20);

        assert_eq!(heap.clear(), 2);
        assert!(heap.is_empty());
        assert!(!heap.contains(TimerId(0)));
        assert_eq!(heap.peek_deadline(), None);
    }
}
