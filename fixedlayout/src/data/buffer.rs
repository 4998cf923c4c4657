//! TelemetryBuffer
//! Holds the points for one tracked object inside the current bounds window.
//!
//! Invariants:
//! 1. Retained points are sorted by the sort key (stable for equal keys)
//! 2. Every retained point lies within `[bounds.start, bounds.end]`
//! 3. Points without a numeric sort value are never retained
//!
//! Points newer than `bounds.end` wait in a future queue until a later
//! `set_bounds` reaches them.

use crate::data::{Bounds, Datum, ListenerId, ObjectId};

use std::collections::VecDeque;

pub const DEFAULT_FUTURE_CAPACITY: usize = 1024;

/// Receives the points each `add` actually inserted, in sorted order.
pub trait BufferListener {
    fn added(&mut self, object: &ObjectId, points: &[Datum]);
}

impl<F> BufferListener for F
where
    F: FnMut(&ObjectId, &[Datum]),
{
    fn added(&mut self, object: &ObjectId, points: &[Datum]) {
        self(object, points)
    }
}

pub struct TelemetryBuffer {
    object: ObjectId,
    sort_key: String,
    bounds: Bounds,
    points: Vec<Datum>,
    future: VecDeque<Datum>,
    future_capacity: usize,
    listeners: Vec<(ListenerId, Box<dyn BufferListener>)>,
    next_listener: ListenerId,
}

impl TelemetryBuffer {
    pub fn new(object: ObjectId, sort_key: &str, bounds: Bounds) -> Self {
        Self {
            object,
            sort_key: sort_key.to_string(),
            bounds,
            points: Vec::new(),
            future: VecDeque::new(),
            future_capacity: DEFAULT_FUTURE_CAPACITY,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn with_future_capacity(mut self, capacity: usize) -> Self {
        self.future_capacity = capacity;
        self
    }

    pub fn object(&self) -> &ObjectId {
        &self.object
    }

    pub fn sort_key(&self) -> &str {
        &self.sort_key
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Datum> {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&Datum> {
        self.points.last()
    }

    pub fn pending_future(&self) -> usize {
        self.future.len()
    }

    /// Inserts `points`, returning how many were retained. Listeners hear
    /// about the retained ones only.
    pub fn add<I>(&mut self, points: I) -> usize
    where
        I: IntoIterator<Item = Datum>,
    {
        let mut added: Vec<(f64, Datum)> = Vec::new();

        for point in points {
            let Some(t) = point.domain_value(&self.sort_key) else {
                continue;
            };
            if t < self.bounds.start {
                continue;
            }
            if t > self.bounds.end {
                self.queue_future(point);
                continue;
            }
            self.insert_sorted(t, point.clone());
            added.push((t, point));
        }

        self.notify(added)
    }

    /// Moves the window. Retained points outside it are trimmed (newer ones
    /// go back to the future queue) and queued points the window now covers
    /// are released as an `added` notification.
    pub fn set_bounds(&mut self, bounds: Bounds) -> usize {
        self.bounds = bounds;

        let key = self.sort_key.clone();
        let first = self
            .points
            .partition_point(|d| sort_value(d, &key) < bounds.start);
        self.points.drain(..first);
        let last = self
            .points
            .partition_point(|d| sort_value(d, &key) <= bounds.end);
        let overflow: Vec<Datum> = self.points.drain(last..).collect();
        for point in overflow {
            self.queue_future(point);
        }

        let mut released = Vec::new();
        let mut waiting = VecDeque::with_capacity(self.future.len());
        for point in self.future.drain(..) {
            let t = sort_value(&point, &key);
            if t < bounds.start {
                continue;
            } else if t <= bounds.end {
                released.push((t, point));
            } else {
                waiting.push_back(point);
            }
        }
        self.future = waiting;

        for (t, point) in &released {
            self.insert_sorted(*t, point.clone());
        }
        self.notify(released)
    }

    /// Drops all points. Bounds, sort key and listeners stay.
    pub fn clear(&mut self) {
        self.points.clear();
        self.future.clear();
    }

    /// Keeps only the most recent point.
    pub fn truncate_to_latest(&mut self) {
        let n = self.points.len();
        if n > 1 {
            self.points.drain(..n - 1);
        }
    }

    pub fn set_sort_key(&mut self, key: &str) {
        self.sort_key = key.to_string();
        self.points.retain(|d| d.domain_value(key).is_some());
        self.future.retain(|d| d.domain_value(key).is_some());
        self.points
            .sort_by(|a, b| sort_value(a, key).total_cmp(&sort_value(b, key)));
    }

    pub fn add_listener(&mut self, listener: Box<dyn BufferListener>) -> ListenerId {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn insert_sorted(&mut self, t: f64, point: Datum) {
        let key = &self.sort_key;
        let idx = self.points.partition_point(|d| sort_value(d, key) <= t);
        self.points.insert(idx, point);
    }

    fn queue_future(&mut self, point: Datum) {
        if self.future_capacity == 0 {
            return;
        }
        if self.future.len() >= self.future_capacity {
            self.future.pop_front();
        }
        self.future.push_back(point);
    }

    fn notify(&mut self, mut added: Vec<(f64, Datum)>) -> usize {
        if added.is_empty() {
            return 0;
        }
        added.sort_by(|a, b| a.0.total_cmp(&b.0));
        let points: Vec<Datum> = added.into_iter().map(|(_, d)| d).collect();
        for (_, listener) in self.listeners.iter_mut() {
            listener.added(&self.object, &points);
        }
        points.len()
    }
}

impl std::fmt::Debug for TelemetryBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBuffer")
            .field("object", &self.object)
            .field("sort_key", &self.sort_key)
            .field("bounds", &self.bounds)
            .field("len", &self.points.len())
            .field("future", &self.future.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// Retained and queued points always carry the key.
fn sort_value(d: &Datum, key: &str) -> f64 {
    d.domain_value(key).unwrap_or(f64::NEG_INFINITY)
}
