//! Simulated telemetry backend
//! Waveform channels behind the provider traits, so a layout can be driven
//! without a telemetry server. Live points come from one ticker thread per
//! subscription; history is synthesized on request after a short delay.

use fixedlayout::data::{Bounds, Datum, DatumValue, DomainObject, ListenerId, ObjectId};
use fixedlayout::provider::{
    Apis, BoundsListener, CompositionApi, DatumCallback, Limit, LimitEvaluator, TelemetryApi,
    TelemetryMetadata, TimeConductor, Unsubscribe, ValueFormatter, ValueMetadata,
};
use fixedlayout::{ConfigError, ProviderError};

use crossbeam::channel;
use futures::{future::BoxFuture, FutureExt};
use futures_timer::Delay;
use log::{debug, trace};
use parking_lot::Mutex;
use serde::Deserialize;
use std::{
    collections::HashMap,
    f64::consts::TAU,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

pub const NAMESPACE: &str = "sim";
const MAX_HISTORY: usize = 512;

/// Wall-clock time in milliseconds since the epoch.
pub fn now_ms() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Cosine,
    Ramp,
}

impl Waveform {
    pub fn sample(&self, t_ms: f64, period_ms: f64) -> f64 {
        let phase = t_ms.rem_euclid(period_ms) / period_ms;
        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Cosine => (phase * TAU).cos(),
            Waveform::Ramp => phase,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimChannel {
    pub object: DomainObject,
    pub waveform: Waveform,
    pub period_ms: f64,
    pub units: String,
}

impl SimChannel {
    pub fn new(key: &str, name: &str, waveform: Waveform, period_ms: f64) -> Self {
        Self {
            object: DomainObject::new(ObjectId::new(NAMESPACE, key), name, "telemetry"),
            waveform,
            period_ms,
            units: "V".to_string(),
        }
    }

    fn point(&self, t: f64) -> Datum {
        Datum::new()
            .with("utc", t as i64)
            .with("value", self.waveform.sample(t, self.period_ms))
    }
}

pub fn default_channels() -> Vec<SimChannel> {
    vec![
        SimChannel::new("sine", "Sine Wave", Waveform::Sine, 10_000.0),
        SimChannel::new("cosine", "Cosine Wave", Waveform::Cosine, 10_000.0),
        SimChannel::new("ramp", "Ramp", Waveform::Ramp, 5_000.0),
    ]
}

/// One channel as written in a settings document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelSettings {
    pub key: String,
    pub name: String,
    pub waveform: Waveform,
    pub period_ms: f64,
    #[serde(default = "default_units")]
    pub units: String,
}

fn default_units() -> String {
    "V".to_string()
}

impl ChannelSettings {
    fn channel(&self) -> SimChannel {
        let mut channel = SimChannel::new(&self.key, &self.name, self.waveform, self.period_ms);
        channel.units = self.units.clone();
        channel
    }
}

/// Simulator settings, loaded from YAML. Missing fields keep their defaults;
/// an empty channel list means the three built-in channels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub channels: Vec<ChannelSettings>,
    pub live_interval_ms: u64,
    pub history_step_ms: f64,
    pub history_latency_ms: u64,
    pub yellow_limit: f64,
    pub red_limit: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            live_interval_ms: 250,
            history_step_ms: 1000.0,
            history_latency_ms: 50,
            yellow_limit: 0.7,
            red_limit: 0.9,
        }
    }
}

impl SimSettings {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_yaml::from_str(text)?;
        if settings.live_interval_ms == 0 {
            return Err(invalid("live_interval_ms must be positive"));
        }
        if settings.history_step_ms.is_nan() || settings.history_step_ms <= 0.0 {
            return Err(invalid("history_step_ms must be positive"));
        }
        if let Some(c) = settings.channels.iter().find(|c| c.period_ms.is_nan() || c.period_ms <= 0.0) {
            return Err(invalid(&format!("channel {} needs a positive period_ms", c.key)));
        }
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn channels(&self) -> Vec<SimChannel> {
        if self.channels.is_empty() {
            return default_channels();
        }
        self.channels.iter().map(ChannelSettings::channel).collect()
    }

    pub fn live_interval(&self) -> Duration {
        Duration::from_millis(self.live_interval_ms)
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

pub fn root() -> DomainObject {
    DomainObject::new(ObjectId::new(NAMESPACE, "root"), "Simulator", "folder")
}

struct ClockState {
    bounds: Bounds,
    follow: bool,
}

/// A time conductor whose window has a fixed span and, while following,
/// slides to end at the current time.
pub struct SimClock {
    span_ms: f64,
    state: Mutex<ClockState>,
    listeners: Mutex<Vec<(ListenerId, BoundsListener)>>,
    next_id: AtomicUsize,
}

impl SimClock {
    pub fn new(span_ms: f64, follow: bool) -> Self {
        let now = now_ms();
        Self {
            span_ms,
            state: Mutex::new(ClockState {
                bounds: Bounds::new(now - span_ms, now),
                follow,
            }),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    pub fn toggle_follow(&self) -> bool {
        let mut state = self.state.lock();
        state.follow = !state.follow;
        state.follow
    }

    /// Slides the window to end at `now`. Does nothing unless following.
    pub fn tick(&self, now: f64) -> bool {
        let bounds = {
            let mut state = self.state.lock();
            if !state.follow {
                return false;
            }
            state.bounds = Bounds::new(now - self.span_ms, now);
            state.bounds
        };
        self.notify(bounds);
        true
    }

    /// Fixes the window at `bounds`.
    pub fn set_bounds(&self, bounds: Bounds) {
        self.state.lock().bounds = bounds;
        self.notify(bounds);
    }

    fn notify(&self, bounds: Bounds) {
        for (_, listener) in self.listeners.lock().iter() {
            listener(bounds);
        }
    }
}

impl TimeConductor for SimClock {
    fn bounds(&self) -> Bounds {
        self.state.lock().bounds
    }

    fn follow(&self) -> bool {
        self.state.lock().follow
    }

    fn time_system_key(&self) -> Option<String> {
        Some("utc".to_string())
    }

    fn on_bounds(&self, listener: BoundsListener) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        id
    }

    fn off_bounds(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

/// A single folder holding every channel.
pub struct SimComposition {
    members: HashMap<ObjectId, Vec<DomainObject>>,
}

impl SimComposition {
    pub fn new(root: &DomainObject, channels: &[SimChannel]) -> Self {
        let mut members = HashMap::new();
        members.insert(
            root.id.clone(),
            channels.iter().map(|c| c.object.clone()).collect(),
        );
        Self { members }
    }
}

impl CompositionApi for SimComposition {
    fn load(
        &self,
        container: &DomainObject,
    ) -> BoxFuture<'static, Result<Vec<DomainObject>, ProviderError>> {
        let result = self.members.get(&container.id).cloned().ok_or_else(|| {
            ProviderError::CompositionFailed(container.id.clone(), "no such folder".to_string())
        });
        futures::future::ready(result).boxed()
    }
}

/// Formats numbers with the precision named by a `%.Nf` format string.
struct Precision(usize);

impl Precision {
    fn parse(format: Option<&str>) -> Self {
        let digits = format
            .and_then(|f| f.strip_prefix("%."))
            .and_then(|f| f.strip_suffix('f'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(3);
        Self(digits)
    }
}

impl ValueFormatter for Precision {
    fn format(&self, value: &DatumValue) -> String {
        match value {
            DatumValue::Float(_) => match value.try_as_f64() {
                Some(v) => format!("{:.*}", self.0, v),
                None => "?".to_string(),
            },
            other => other.to_string(),
        }
    }
}

struct MagnitudeLimits {
    yellow: f64,
    red: f64,
}

impl LimitEvaluator for MagnitudeLimits {
    fn evaluate(&self, datum: &Datum, range_key: &str) -> Option<Limit> {
        let v = datum.domain_value(range_key)?.abs();
        let (name, css_class) = if v >= self.red {
            ("Red", "is-limit-red")
        } else if v >= self.yellow {
            ("Yellow", "is-limit-yellow")
        } else {
            return None;
        };
        Some(Limit {
            name: name.to_string(),
            css_class: css_class.to_string(),
        })
    }
}

pub struct SimTelemetry {
    channels: HashMap<ObjectId, SimChannel>,
    interval: Duration,
    history_step_ms: f64,
    history_latency: Duration,
    yellow: f64,
    red: f64,
}

impl SimTelemetry {
    pub fn new(channels: &[SimChannel], interval: Duration) -> Self {
        Self {
            channels: channels
                .iter()
                .map(|c| (c.object.id.clone(), c.clone()))
                .collect(),
            interval,
            history_step_ms: 1000.0,
            history_latency: Duration::from_millis(50),
            yellow: 0.7,
            red: 0.9,
        }
    }

    pub fn with_history(mut self, step_ms: f64, latency: Duration) -> Self {
        self.history_step_ms = step_ms;
        self.history_latency = latency;
        self
    }

    pub fn with_limits(mut self, yellow: f64, red: f64) -> Self {
        self.yellow = yellow;
        self.red = red;
        self
    }
}

impl TelemetryApi for SimTelemetry {
    fn can_provide_telemetry(&self, object: &DomainObject) -> bool {
        self.channels.contains_key(&object.id)
    }

    fn subscribe(&self, object: &DomainObject, callback: DatumCallback) -> Unsubscribe {
        let Some(source) = self.channels.get(&object.id).cloned() else {
            return Unsubscribe::noop();
        };

        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(self.interval);
        thread::spawn(move || loop {
            let stopped = crossbeam::select! {
                recv(ticker) -> _ => {
                    callback(source.point(now_ms()));
                    false
                }
                recv(stop_rx) -> _ => true,
            };
            if stopped {
                break;
            }
        });
        debug!("Streaming {}", object.id);

        let id = object.id.clone();
        Unsubscribe::new(move || {
            drop(stop_tx);
            debug!("Stopped streaming {}", id);
        })
    }

    fn request(
        &self,
        object: &DomainObject,
        bounds: Bounds,
    ) -> BoxFuture<'static, Result<Vec<Datum>, ProviderError>> {
        let Some(source) = self.channels.get(&object.id).cloned() else {
            let err = ProviderError::RequestFailed(object.id.clone(), "no such channel".to_string());
            return futures::future::ready(Err(err)).boxed();
        };
        let step = self.history_step_ms;
        let latency = self.history_latency;

        async move {
            Delay::new(latency).await;

            // newest first so a wide window keeps its recent end
            let end = bounds.end.min(now_ms());
            let mut t = (end / step).floor() * step;
            let mut points = Vec::new();
            while t >= bounds.start && points.len() < MAX_HISTORY {
                points.push(source.point(t));
                t -= step;
            }
            points.reverse();
            trace!("Synthesized {} point(s) for {}", points.len(), source.object.id);
            Ok(points)
        }
        .boxed()
    }

    fn metadata(&self, object: &DomainObject) -> Option<TelemetryMetadata> {
        let source = self.channels.get(&object.id)?;
        let mut value = ValueMetadata::new("value", &source.object.name).hint("range", 1);
        value.units = Some(source.units.clone());
        value.format = Some("%.3f".to_string());
        Some(TelemetryMetadata::new(vec![
            ValueMetadata::new("utc", "Time").hint("domain", 1),
            value,
        ]))
    }

    fn limit_evaluator(&self, object: &DomainObject) -> Option<Box<dyn LimitEvaluator>> {
        self.channels.get(&object.id)?;
        Some(Box::new(MagnitudeLimits {
            yellow: self.yellow,
            red: self.red,
        }))
    }

    fn value_formatter(&self, value: &ValueMetadata) -> Box<dyn ValueFormatter> {
        Box::new(Precision::parse(value.format.as_deref()))
    }
}

/// The three simulated services, sharing one channel set.
pub struct SimBackend {
    pub clock: Arc<SimClock>,
    pub composition: Arc<SimComposition>,
    pub telemetry: Arc<SimTelemetry>,
    pub root: DomainObject,
    pub channels: Vec<SimChannel>,
}

impl SimBackend {
    pub fn new(span_ms: f64, follow: bool, settings: &SimSettings) -> Self {
        let root = root();
        let channels = settings.channels();
        let telemetry = SimTelemetry::new(&channels, settings.live_interval())
            .with_history(
                settings.history_step_ms,
                Duration::from_millis(settings.history_latency_ms),
            )
            .with_limits(settings.yellow_limit, settings.red_limit);
        Self {
            clock: Arc::new(SimClock::new(span_ms, follow)),
            composition: Arc::new(SimComposition::new(&root, &channels)),
            telemetry: Arc::new(telemetry),
            root,
            channels,
        }
    }

    pub fn apis(&self) -> Apis {
        Apis {
            time: self.clock.clone(),
            composition: self.composition.clone(),
            telemetry: self.telemetry.clone(),
        }
    }
}
