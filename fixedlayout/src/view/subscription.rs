//! SubscriptionManager
//! Owns the tracked objects of one view, their live subscriptions and their
//! telemetry buffers.
//!
//! The tracked set is replaced wholesale: `subscribe` tears everything down
//! before the new container's composition is even requested, and the new
//! subscriptions open only once that composition resolves. Each replacement
//! bumps the generation, which is how late results for the old set are
//! recognised and ignored.

use crate::data::{Bounds, Datum, DomainObject, Generation, ObjectId, TelemetryBuffer};
use crate::provider::{Apis, Unsubscribe};
use crate::view::{DisplayCache, InboxListener, ViewEvent};

use crossbeam::channel::Sender;
use futures::{executor::LocalSpawner, task::LocalSpawnExt, Future};
use log::{debug, trace, warn};
use std::collections::HashMap;

pub struct Subscription {
    object: ObjectId,
    unsubscribe: Unsubscribe,
}

pub struct SubscriptionManager {
    apis: Apis,
    inbox: Sender<ViewEvent>,
    spawner: LocalSpawner,
    container: Option<DomainObject>,
    tracked: Vec<DomainObject>,
    tracked_index: HashMap<ObjectId, usize>,
    subscriptions: Vec<Subscription>,
    buffers: HashMap<ObjectId, TelemetryBuffer>,
    generation: Generation,
    default_domain_key: String,
    future_capacity: usize,
}

impl SubscriptionManager {
    pub fn new(
        apis: Apis,
        inbox: Sender<ViewEvent>,
        spawner: LocalSpawner,
        default_domain_key: &str,
        future_capacity: usize,
    ) -> Self {
        Self {
            apis,
            inbox,
            spawner,
            container: None,
            tracked: Vec::new(),
            tracked_index: HashMap::new(),
            subscriptions: Vec::new(),
            buffers: HashMap::new(),
            generation: 0,
            default_domain_key: default_domain_key.to_string(),
            future_capacity,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn container(&self) -> Option<&DomainObject> {
        self.container.as_ref()
    }

    pub fn tracked(&self) -> &[DomainObject] {
        &self.tracked
    }

    pub fn tracked_object(&self, id: &ObjectId) -> Option<&DomainObject> {
        self.tracked_index.get(id).map(|&i| &self.tracked[i])
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn subscribed_objects(&self) -> impl Iterator<Item = &ObjectId> {
        self.subscriptions.iter().map(|s| &s.object)
    }

    pub fn buffer(&self, id: &ObjectId) -> Option<&TelemetryBuffer> {
        self.buffers.get(id)
    }

    pub fn buffer_mut(&mut self, id: &ObjectId) -> Option<&mut TelemetryBuffer> {
        self.buffers.get_mut(id)
    }

    pub fn buffers(&self) -> impl Iterator<Item = &TelemetryBuffer> {
        self.buffers.values()
    }

    /// Replaces the tracked set with the telemetry-capable members of
    /// `container`. The old set is gone when this returns; the new one
    /// arrives through `ViewEvent::CompositionLoaded`.
    pub fn subscribe(&mut self, container: &DomainObject) {
        self.unsubscribe();
        self.container = Some(container.clone());

        debug!(
            "Loading composition of {} (generation {})",
            container.id, self.generation
        );
        let generation = self.generation;
        let tx = self.inbox.clone();
        let load = self.apis.composition.load(container);
        self.spawn(async move {
            let result = load.await;
            let _ = tx.send(ViewEvent::CompositionLoaded { generation, result });
        });
    }

    /// Starts the data flow for a resolved composition. Returns the objects
    /// that are now tracked; empty if `generation` is stale.
    pub fn track(
        &mut self,
        generation: Generation,
        members: Vec<DomainObject>,
        cache: &mut DisplayCache,
    ) -> Vec<ObjectId> {
        if generation != self.generation {
            debug!(
                "Ignoring composition from generation {} (current {})",
                generation, self.generation
            );
            return Vec::new();
        }

        let telemetry = self.apis.telemetry.clone();
        let mut started = Vec::new();
        for member in members {
            if !telemetry.can_provide_telemetry(&member) {
                trace!("{} provides no telemetry", member.id);
                continue;
            }
            if self.tracked_object(&member.id).is_some() {
                continue;
            }

            // Historical first; the buffer sorts whatever order they land in.
            self.fetch_historical(&member);

            let tx = self.inbox.clone();
            let object = member.id.clone();
            let unsubscribe = telemetry.subscribe(
                &member,
                Box::new(move |datum: Datum| {
                    let _ = tx.send(ViewEvent::Live {
                        generation,
                        object: object.clone(),
                        datum,
                    });
                }),
            );
            self.subscriptions.push(Subscription {
                object: member.id.clone(),
                unsubscribe,
            });

            cache.initialize(&member.id, &member.name);
            started.push(member.id.clone());
            self.tracked_index.insert(member.id.clone(), self.tracked.len());
            self.tracked.push(member);
        }

        debug!(
            "Tracking {} object(s) (generation {})",
            started.len(),
            self.generation
        );
        started
    }

    /// Tears down every subscription and buffer. Safe to repeat.
    pub fn unsubscribe(&mut self) {
        let n_subs = self.subscriptions.len();
        for sub in self.subscriptions.drain(..) {
            sub.unsubscribe.invoke();
        }

        for buffer in self.buffers.values_mut() {
            buffer.remove_all_listeners();
            buffer.clear();
        }
        self.buffers.clear();
        self.tracked.clear();
        self.tracked_index.clear();
        self.generation += 1;

        if n_subs > 0 {
            debug!(
                "Unsubscribed {} object(s), now at generation {}",
                n_subs, self.generation
            );
        }
    }

    /// Requests history for every tracked object under the current bounds.
    pub fn refetch(&self) -> usize {
        for object in &self.tracked {
            self.fetch_historical(object);
        }
        self.tracked.len()
    }

    /// Feeds points for `object` into its buffer, creating the buffer on
    /// first use. Returns false when the points belong to an old generation.
    pub fn receive(&mut self, generation: Generation, object: &ObjectId, points: Vec<Datum>) -> bool {
        if generation != self.generation {
            trace!("Dropping {} stale point(s) for {}", points.len(), object);
            return false;
        }
        self.buffer_for(object).add(points);
        true
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        for buffer in self.buffers.values_mut() {
            buffer.set_bounds(bounds);
        }
    }

    fn buffer_for(&mut self, object: &ObjectId) -> &mut TelemetryBuffer {
        let time = &self.apis.time;
        let default_key = &self.default_domain_key;
        let future_capacity = self.future_capacity;
        let tx = &self.inbox;
        let generation = self.generation;

        self.buffers.entry(object.clone()).or_insert_with(|| {
            let key = time
                .time_system_key()
                .unwrap_or_else(|| default_key.clone());
            let mut buffer = TelemetryBuffer::new(object.clone(), &key, time.bounds())
                .with_future_capacity(future_capacity);
            buffer.add_listener(Box::new(InboxListener {
                tx: tx.clone(),
                generation,
            }));
            buffer
        })
    }

    fn fetch_historical(&self, object: &DomainObject) {
        let bounds = self.apis.time.bounds();
        trace!("Requesting {} for {}", bounds, object.id);

        let generation = self.generation;
        let id = object.id.clone();
        let tx = self.inbox.clone();
        let request = self.apis.telemetry.request(object, bounds);
        self.spawn(async move {
            let result = request.await;
            let _ = tx.send(ViewEvent::Historical {
                generation,
                object: id,
                result,
            });
        });
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        if let Err(e) = self.spawner.spawn_local(future) {
            warn!("Could not schedule telemetry request: {}", e);
        }
    }
}
