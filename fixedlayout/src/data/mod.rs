mod buffer;
mod datum;
mod identifiers;

pub use buffer::{BufferListener, TelemetryBuffer, DEFAULT_FUTURE_CAPACITY};
pub use datum::{Datum, DatumValue};
pub use identifiers::{Bounds, DomainObject, Generation, InvalidObjectId, ListenerId, ObjectId};
