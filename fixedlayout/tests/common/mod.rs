#![allow(dead_code)]

use fixedlayout::data::{Bounds, Datum, DatumValue, DomainObject, ListenerId, ObjectId};
use fixedlayout::layout::{Configuration, GridSize, SharedConfiguration};
use fixedlayout::provider::{
    Apis, BoundsListener, CompositionApi, DatumCallback, Limit, LimitEvaluator, TelemetryApi,
    TelemetryMetadata, TimeConductor, Unsubscribe, ValueFormatter, ValueMetadata, ViewHost,
};
use fixedlayout::{FixedView, ProviderError, ViewOptions};

use futures::{channel::oneshot, future::BoxFuture, FutureExt};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub fn object(key: &str, kind: &str) -> DomainObject {
    DomainObject::new(ObjectId::new("test", key), key, kind)
}

pub fn point(utc: i64, value: f64) -> Datum {
    Datum::new().with("utc", utc).with("value", value)
}

#[derive(Default)]
pub struct MockTime {
    pub bounds: Mutex<Option<Bounds>>,
    pub follow: Mutex<bool>,
    listeners: Mutex<Vec<(ListenerId, BoundsListener)>>,
    next_id: Mutex<ListenerId>,
    pub removed: Mutex<Vec<ListenerId>>,
}

impl MockTime {
    pub fn new(start: f64, end: f64) -> Arc<Self> {
        let time = Self::default();
        *time.bounds.lock().unwrap() = Some(Bounds::new(start, end));
        Arc::new(time)
    }

    pub fn set_follow(&self, follow: bool) {
        *self.follow.lock().unwrap() = follow;
    }

    pub fn emit_bounds(&self, bounds: Bounds) {
        *self.bounds.lock().unwrap() = Some(bounds);
        for (_, listener) in self.listeners.lock().unwrap().iter() {
            listener(bounds);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl TimeConductor for MockTime {
    fn bounds(&self) -> Bounds {
        self.bounds.lock().unwrap().unwrap_or(Bounds::new(0.0, 0.0))
    }

    fn follow(&self) -> bool {
        *self.follow.lock().unwrap()
    }

    fn time_system_key(&self) -> Option<String> {
        Some("utc".to_string())
    }

    fn on_bounds(&self, listener: BoundsListener) -> ListenerId {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn off_bounds(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
        self.removed.lock().unwrap().push(id);
    }
}

#[derive(Default)]
pub struct MockComposition {
    pub members: Mutex<HashMap<ObjectId, Vec<DomainObject>>>,
    gates: Mutex<HashMap<ObjectId, oneshot::Receiver<()>>>,
}

impl MockComposition {
    pub fn with(self: Arc<Self>, container: &DomainObject, members: Vec<DomainObject>) -> Arc<Self> {
        self.members
            .lock()
            .unwrap()
            .insert(container.id.clone(), members);
        self
    }

    /// The next load of `container` waits until the returned sender fires.
    pub fn gate(&self, container: &DomainObject) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(container.id.clone(), rx);
        tx
    }
}

impl CompositionApi for MockComposition {
    fn load(
        &self,
        container: &DomainObject,
    ) -> BoxFuture<'static, Result<Vec<DomainObject>, ProviderError>> {
        let members = self
            .members
            .lock()
            .unwrap()
            .get(&container.id)
            .cloned()
            .ok_or_else(|| {
                ProviderError::CompositionFailed(container.id.clone(), "unknown".to_string())
            });
        match self.gates.lock().unwrap().remove(&container.id) {
            Some(gate) => async move {
                let _ = gate.await;
                members
            }
            .boxed(),
            None => futures::future::ready(members).boxed(),
        }
    }
}

#[derive(Default)]
pub struct MockTelemetry {
    pub log: Arc<Mutex<Vec<String>>>,
    pub callbacks: Arc<Mutex<HashMap<ObjectId, DatumCallback>>>,
    pub history: Mutex<HashMap<ObjectId, Vec<Datum>>>,
    history_gates: Mutex<HashMap<ObjectId, oneshot::Receiver<()>>>,
    pub requests: Mutex<Vec<(ObjectId, Bounds)>>,
}

impl MockTelemetry {
    pub fn with_history(self: Arc<Self>, object: &DomainObject, points: Vec<Datum>) -> Arc<Self> {
        self.history
            .lock()
            .unwrap()
            .insert(object.id.clone(), points);
        self
    }

    pub fn gate_history(&self, object: &DomainObject) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.history_gates
            .lock()
            .unwrap()
            .insert(object.id.clone(), rx);
        tx
    }

    /// Pushes a live datum to the subscriber of `object`, if any.
    pub fn push(&self, object: &DomainObject, datum: Datum) -> bool {
        match self.callbacks.lock().unwrap().get(&object.id) {
            Some(callback) => {
                callback(datum);
                true
            }
            None => false,
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

struct TwoDecimals;

impl ValueFormatter for TwoDecimals {
    fn format(&self, value: &DatumValue) -> String {
        match value.try_as_f64() {
            Some(v) => format!("{:.2}", v),
            None => value.to_string(),
        }
    }
}

struct RedAbove(f64);

impl LimitEvaluator for RedAbove {
    fn evaluate(&self, datum: &Datum, range_key: &str) -> Option<Limit> {
        let v = datum.domain_value(range_key)?;
        (v > self.0).then(|| Limit {
            name: "Red High".to_string(),
            css_class: "is-limit-red".to_string(),
        })
    }
}

impl TelemetryApi for MockTelemetry {
    fn can_provide_telemetry(&self, object: &DomainObject) -> bool {
        object.kind == "telemetry"
    }

    fn subscribe(&self, object: &DomainObject, callback: DatumCallback) -> Unsubscribe {
        self.log
            .lock()
            .unwrap()
            .push(format!("subscribe:{}", object.id.key));
        self.callbacks
            .lock()
            .unwrap()
            .insert(object.id.clone(), callback);

        let log = self.log.clone();
        let callbacks = self.callbacks.clone();
        let id = object.id.clone();
        Unsubscribe::new(move || {
            log.lock().unwrap().push(format!("unsubscribe:{}", id.key));
            callbacks.lock().unwrap().remove(&id);
        })
    }

    fn request(
        &self,
        object: &DomainObject,
        bounds: Bounds,
    ) -> BoxFuture<'static, Result<Vec<Datum>, ProviderError>> {
        self.log
            .lock()
            .unwrap()
            .push(format!("request:{}", object.id.key));
        self.requests
            .lock()
            .unwrap()
            .push((object.id.clone(), bounds));

        let points = self
            .history
            .lock()
            .unwrap()
            .get(&object.id)
            .cloned()
            .unwrap_or_default();
        match self.history_gates.lock().unwrap().remove(&object.id) {
            Some(gate) => async move {
                let _ = gate.await;
                Ok(points)
            }
            .boxed(),
            None => futures::future::ready(Ok(points)).boxed(),
        }
    }

    fn metadata(&self, _object: &DomainObject) -> Option<TelemetryMetadata> {
        Some(TelemetryMetadata::new(vec![
            ValueMetadata::new("utc", "Time").hint("domain", 1),
            ValueMetadata::new("value", "Value").hint("range", 1),
        ]))
    }

    fn limit_evaluator(&self, _object: &DomainObject) -> Option<Box<dyn LimitEvaluator>> {
        Some(Box::new(RedAbove(0.9)))
    }

    fn value_formatter(&self, _value: &ValueMetadata) -> Box<dyn ValueFormatter> {
        Box::new(TwoDecimals)
    }
}

#[derive(Default)]
pub struct MockHost {
    pub frames: Mutex<usize>,
    pub commits: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn frames(&self) -> usize {
        *self.frames.lock().unwrap()
    }
}

impl ViewHost for MockHost {
    fn request_frame(&self) {
        *self.frames.lock().unwrap() += 1;
    }

    fn commit(&self, message: &str) {
        self.commits.lock().unwrap().push(message.to_string());
    }
}

pub struct Harness {
    pub time: Arc<MockTime>,
    pub composition: Arc<MockComposition>,
    pub telemetry: Arc<MockTelemetry>,
    pub host: Arc<MockHost>,
    pub configuration: SharedConfiguration,
    pub view: FixedView,
}

impl Harness {
    pub fn new(
        composition: Arc<MockComposition>,
        telemetry: Arc<MockTelemetry>,
        configuration: Configuration,
    ) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let time = MockTime::new(0.0, 1000.0);
        let host = Arc::new(MockHost::default());
        let configuration = configuration.shared();
        let apis = Apis {
            time: time.clone(),
            composition: composition.clone(),
            telemetry: telemetry.clone(),
        };
        let view = FixedView::new(
            apis,
            host.clone(),
            configuration.clone(),
            ViewOptions::default(),
        );
        Self {
            time,
            composition,
            telemetry,
            host,
            configuration,
            view,
        }
    }
}

pub fn grid10() -> Configuration {
    Configuration::new(GridSize { x: 10, y: 10 })
}
