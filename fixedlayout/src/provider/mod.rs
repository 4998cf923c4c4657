//! Capabilities the view consumes from its environment: the time conductor,
//! the composition service, the telemetry backend and the rendering host.

mod metadata;

pub use metadata::{Limit, LimitEvaluator, TelemetryMetadata, ValueFormatter, ValueMetadata};

use crate::data::{Bounds, Datum, DomainObject, ListenerId};
use crate::error::ProviderError;

use futures::future::BoxFuture;
use std::sync::Arc;

pub type DatumCallback = Box<dyn Fn(Datum) + Send + 'static>;
pub type BoundsListener = Box<dyn Fn(Bounds) + Send + 'static>;

/// Teardown handle returned by a live subscription.
pub struct Unsubscribe(Box<dyn FnOnce() + Send + 'static>);

impl Unsubscribe {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn invoke(self) {
        (self.0)()
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unsubscribe")
    }
}

pub trait TimeConductor {
    fn bounds(&self) -> Bounds;
    /// True while the window advances with real time.
    fn follow(&self) -> bool;
    /// Domain key of the active time system, e.g. `utc`.
    fn time_system_key(&self) -> Option<String>;
    fn on_bounds(&self, listener: BoundsListener) -> ListenerId;
    fn off_bounds(&self, id: ListenerId);
}

pub trait CompositionApi {
    fn load(
        &self,
        container: &DomainObject,
    ) -> BoxFuture<'static, Result<Vec<DomainObject>, ProviderError>>;
}

pub trait TelemetryApi {
    fn can_provide_telemetry(&self, object: &DomainObject) -> bool;
    fn subscribe(&self, object: &DomainObject, callback: DatumCallback) -> Unsubscribe;
    fn request(
        &self,
        object: &DomainObject,
        bounds: Bounds,
    ) -> BoxFuture<'static, Result<Vec<Datum>, ProviderError>>;
    fn metadata(&self, object: &DomainObject) -> Option<TelemetryMetadata>;
    fn limit_evaluator(&self, object: &DomainObject) -> Option<Box<dyn LimitEvaluator>>;
    fn value_formatter(&self, value: &ValueMetadata) -> Box<dyn ValueFormatter>;
}

/// The rendering side: frame scheduling and persistence of layout edits.
pub trait ViewHost {
    fn request_frame(&self);
    fn commit(&self, message: &str);
}

#[derive(Clone)]
pub struct Apis {
    pub time: Arc<dyn TimeConductor>,
    pub composition: Arc<dyn CompositionApi>,
    pub telemetry: Arc<dyn TelemetryApi>,
}
