//! FixedView
//! The fixed-position view: arranges element proxies from the layout
//! document, keeps them fed with the latest telemetry and exposes the
//! selection and drag handles to the rendering host.
//!
//! Single-threaded. Asynchronous results (composition loads, historical
//! requests, live data, bounds changes) land in an inbox and are applied by
//! `pump`; display updates are applied at most once per `animation_frame`.

use crate::data::{Bounds, Datum, DomainObject, ListenerId, ObjectId};
use crate::layout::{
    DragHandle, ElementConfig, ElementProxy, GridSize, ProxyModel, SharedConfiguration,
};
use crate::options::ViewOptions;
use crate::provider::{Apis, ViewHost};
use crate::view::{DisplayCache, SubscriptionManager, UpdateScheduler, ViewEvent};

use crossbeam::channel::{self, Receiver};
use futures::executor::LocalPool;
use log::{debug, trace, warn};
use std::{collections::BTreeSet, sync::Arc};

/// A drop of a tracked object onto the view, in pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub object: ObjectId,
    pub x: f64,
    pub y: f64,
    pub default_prevented: bool,
}

impl DropEvent {
    pub fn new(object: ObjectId, x: f64, y: f64) -> Self {
        Self {
            object,
            x,
            y,
            default_prevented: false,
        }
    }
}

pub struct FixedView {
    apis: Apis,
    host: Arc<dyn ViewHost>,
    configuration: SharedConfiguration,
    options: ViewOptions,
    pool: LocalPool,
    inbox: Receiver<ViewEvent>,
    subscriptions: SubscriptionManager,
    scheduler: UpdateScheduler,
    cache: DisplayCache,
    model: ProxyModel,
    dirty: BTreeSet<ObjectId>,
    bounds_listener: Option<ListenerId>,
    destroyed: bool,
}

impl FixedView {
    pub fn new(
        apis: Apis,
        host: Arc<dyn ViewHost>,
        configuration: SharedConfiguration,
        options: ViewOptions,
    ) -> Self {
        let (tx, inbox) = channel::unbounded();
        let pool = LocalPool::new();
        let subscriptions = SubscriptionManager::new(
            apis.clone(),
            tx.clone(),
            pool.spawner(),
            &options.default_domain_key,
            options.future_capacity,
        );

        let bounds_listener = apis.time.on_bounds(Box::new(move |bounds: Bounds| {
            let _ = tx.send(ViewEvent::Bounds(bounds));
        }));

        let grid = configuration.read().layout_grid;
        let mut view = Self {
            apis,
            host,
            configuration,
            model: ProxyModel::new(grid, options.drag_handle_size),
            options,
            pool,
            inbox,
            subscriptions,
            scheduler: UpdateScheduler::new(),
            cache: DisplayCache::new(),
            dirty: BTreeSet::new(),
            bounds_listener: Some(bounds_listener),
            destroyed: false,
        };
        view.refresh_elements();
        view
    }

    pub fn grid_size(&self) -> GridSize {
        self.model.grid()
    }

    pub fn elements(&self) -> &[ElementProxy] {
        self.model.proxies()
    }

    pub fn selected(&self) -> Option<&ElementProxy> {
        self.model.selected()
    }

    pub fn is_selected(&self, proxy: &ElementProxy) -> bool {
        self.model.is_selected(proxy)
    }

    /// Selects the proxy at `index` in `elements()`.
    pub fn select(&mut self, index: usize) -> bool {
        self.model.select(index)
    }

    pub fn clear_selection(&mut self) {
        self.model.clear_selection();
    }

    pub fn handles(&self) -> &[DragHandle] {
        self.model.handles()
    }

    pub fn move_handle(&self) -> Option<&DragHandle> {
        self.model.move_handle()
    }

    pub fn display_cache(&self) -> &DisplayCache {
        &self.cache
    }

    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn configuration(&self) -> &SharedConfiguration {
        &self.configuration
    }

    /// A new root object was assigned; track its composition.
    pub fn set_domain_object(&mut self, container: &DomainObject) {
        if self.destroyed {
            return;
        }
        self.subscriptions.subscribe(container);
    }

    /// The root object's composition changed; rebuild the tracked set.
    pub fn composition_changed(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(container) = self.subscriptions.container().cloned() {
            self.subscriptions.subscribe(&container);
        }
    }

    /// The layout document was edited externally.
    pub fn configuration_modified(&mut self) {
        self.refresh_elements();
    }

    pub fn grid_size_changed(&mut self, grid: GridSize) {
        self.model.set_grid(grid);
    }

    /// The selected entry's geometry was edited in place, e.g. by a drag.
    pub fn selection_moved(&mut self) {
        self.model.refresh_selection_style();
    }

    /// Appends `entry` to the layout document, selects its proxy and asks
    /// the host to persist the change.
    pub fn add_element(&mut self, entry: ElementConfig) {
        let entry = self.configuration.write().push(entry);
        self.refresh_elements();

        match self
            .model
            .proxies()
            .iter()
            .position(|p| Arc::ptr_eq(p.element(), &entry))
        {
            Some(i) => {
                self.model.select(i);
            }
            None => self.model.clear_selection(),
        }

        self.host.commit(&self.options.drop_commit_message);
    }

    /// Places a telemetry element where an object was dropped. Drops already
    /// handled elsewhere are left alone.
    pub fn handle_drop(&mut self, drop: &mut DropEvent) -> bool {
        if drop.default_prevented {
            return false;
        }
        drop.default_prevented = true;

        let grid = self.grid_size();
        let [w, h] = self.options.default_dimensions;
        let mut entry = ElementConfig::telemetry(
            &drop.object,
            (drop.x / f64::from(grid.x)).floor() as i64,
            (drop.y / f64::from(grid.y)).floor() as i64,
            i64::from(w),
            i64::from(h),
        );
        entry.stroke = Some("transparent".to_string());
        entry.color = Some(String::new());
        entry.titled = Some(true);

        self.add_element(entry);
        true
    }

    /// Runs pending futures and applies every queued event until neither
    /// produces more work. Returns the number of events applied.
    pub fn pump(&mut self) -> usize {
        let mut total = 0;
        loop {
            self.pool.run_until_stalled();
            let mut handled = 0;
            while let Ok(event) = self.inbox.try_recv() {
                self.handle_event(event);
                handled += 1;
            }
            if handled == 0 {
                return total;
            }
            total += handled;
        }
    }

    /// Animation-frame tick from the host. Applies the cached values of every
    /// object refreshed since the last frame. Returns whether work ran.
    pub fn animation_frame(&mut self) -> bool {
        if !self.scheduler.begin_frame() {
            return false;
        }
        for object in std::mem::take(&mut self.dirty) {
            self.model.apply_display(&object, self.cache.get(&object));
        }
        self.scheduler.finish_frame();
        true
    }

    /// Releases subscriptions and the bounds listener. Safe to repeat.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.subscriptions.unsubscribe();
        if let Some(id) = self.bounds_listener.take() {
            self.apis.time.off_bounds(id);
        }
        debug!("View destroyed");
    }

    fn handle_event(&mut self, event: ViewEvent) {
        match event {
            ViewEvent::CompositionLoaded { generation, result } => match result {
                Ok(members) => {
                    let started = self.subscriptions.track(generation, members, &mut self.cache);
                    for id in &started {
                        self.model.apply_display(id, self.cache.get(id));
                    }
                }
                Err(e) => warn!("{}", e),
            },
            ViewEvent::Historical {
                generation,
                object,
                result,
            } => match result {
                Ok(points) => {
                    self.subscriptions.receive(generation, &object, points);
                }
                Err(e) => debug!("{}", e),
            },
            ViewEvent::Live {
                generation,
                object,
                datum,
            } => {
                self.subscriptions.receive(generation, &object, vec![datum]);
            }
            ViewEvent::Added {
                generation,
                object,
                points,
            } => {
                if generation != self.subscriptions.generation() {
                    return;
                }
                trace!("{} point(s) added for {}", points.len(), object);
                self.on_added(&object);
            }
            ViewEvent::Bounds(bounds) => self.on_bounds(bounds),
        }
    }

    fn on_added(&mut self, object: &ObjectId) {
        let Some(latest) = self
            .subscriptions
            .buffer(object)
            .and_then(|b| b.latest())
            .cloned()
        else {
            return;
        };

        self.refresh(object, &latest);

        // Only the newest point is ever displayed.
        if let Some(buffer) = self.subscriptions.buffer_mut(object) {
            buffer.truncate_to_latest();
        }
    }

    /// Formats `datum` for `object` into the display cache and schedules a
    /// frame to show it.
    fn refresh(&mut self, object: &ObjectId, datum: &Datum) {
        let Some(tracked) = self.subscriptions.tracked_object(object) else {
            return;
        };
        let telemetry = &self.apis.telemetry;

        let Some(metadata) = telemetry.metadata(tracked) else {
            debug!("No telemetry metadata for {}", object);
            return;
        };
        let Some(range) = metadata.values_for_hints(&["range"]).first().copied() else {
            debug!("No range value for {}", object);
            return;
        };
        // A datum without the range value still replaces what is shown.
        let formatted = match datum.get(&range.key) {
            Some(value) => telemetry.value_formatter(range).format(value),
            None => {
                trace!("Datum for {} lacks {}", object, range.key);
                String::new()
            }
        };
        let alarm = telemetry
            .limit_evaluator(tracked)
            .and_then(|limits| limits.evaluate(datum, &range.key))
            .map(|limit| limit.css_class);

        self.cache.record(object, &tracked.name, &formatted, alarm);
        self.dirty.insert(object.clone());
        self.scheduler.schedule(self.host.as_ref());
    }

    fn on_bounds(&mut self, bounds: Bounds) {
        self.subscriptions.set_bounds(bounds);

        if !self.apis.time.follow() {
            self.cache.reset_values();
            self.refresh_elements();
            let n = self.subscriptions.refetch();
            debug!("Bounds now {}, refetching {} object(s)", bounds, n);
        }
    }

    fn refresh_elements(&mut self) {
        let config = self.configuration.read();
        self.model.regenerate(&config, &self.cache);
    }
}

impl Drop for FixedView {
    fn drop(&mut self) {
        self.destroy();
    }
}
