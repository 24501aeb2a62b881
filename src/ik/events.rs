//! Change notifications for editors and visualizers.
//!
//! Events fire only on structural or configuration changes made through the
//! registry, never from inside a solve.

use super::constraint::ConstraintKind;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IkEvent {
    ChainCreated {
        chain: String,
    },
    ChainDestroyed {
        chain: String,
    },
    /// Every chain was removed at once.
    ChainsCleared,
    ConstraintChanged {
        chain: String,
        /// Position in the chain, in `[1, len)`.
        index: usize,
        /// Skeleton bone the constraint belongs to.
        bone: usize,
        /// `None` when the constraint was cleared.
        kind: Option<ConstraintKind>,
    },
}

impl IkEvent {
    /// Name of the affected chain, if the event concerns a single chain.
    pub fn chain(&self) -> Option<&str> {
        match self {
            IkEvent::ChainCreated { chain }
            | IkEvent::ChainDestroyed { chain }
            | IkEvent::ConstraintChanged { chain, .. } => Some(chain),
            IkEvent::ChainsCleared => None,
        }
    }
}

pub trait IkObserver: Send {
    fn on_event(&mut self, event: &IkEvent);
}

impl<F> IkObserver for F
where
    F: FnMut(&IkEvent) + Send,
{
    fn on_event(&mut self, event: &IkEvent) {
        self(event)
    }
}

/// Observer that buffers events for a caller to poll.
///
/// Subscribe one clone and keep another to [`drain`](Self::drain) from.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<IkEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<IkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IkObserver for EventQueue {
    fn on_event(&mut self, event: &IkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event.clone());
    }
}
