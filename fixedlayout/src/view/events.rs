use crate::data::{Bounds, BufferListener, Datum, DomainObject, Generation, ObjectId};
use crate::error::ProviderError;

use crossbeam::channel::Sender;

/// Everything that reaches the view asynchronously. Subscription-scoped
/// events carry the generation they were issued under; the view drops any
/// whose generation is no longer current.
#[derive(Debug)]
pub enum ViewEvent {
    CompositionLoaded {
        generation: Generation,
        result: Result<Vec<DomainObject>, ProviderError>,
    },
    Historical {
        generation: Generation,
        object: ObjectId,
        result: Result<Vec<Datum>, ProviderError>,
    },
    Live {
        generation: Generation,
        object: ObjectId,
        datum: Datum,
    },
    Added {
        generation: Generation,
        object: ObjectId,
        points: Vec<Datum>,
    },
    Bounds(Bounds),
}

/// Buffer listener that forwards `added` notifications to the view's inbox.
pub(crate) struct InboxListener {
    pub tx: Sender<ViewEvent>,
    pub generation: Generation,
}

impl BufferListener for InboxListener {
    fn added(&mut self, object: &ObjectId, points: &[Datum]) {
        // the receiver only goes away with the view
        let _ = self.tx.send(ViewEvent::Added {
            generation: self.generation,
            object: object.clone(),
            points: points.to_vec(),
        });
    }
}
