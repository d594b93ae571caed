//! # Interest Router
//!
//! Routing behaviour of one host. Composes the stateless [`InterestGate`]
//! with a [`ConnectionHistory`] that may be shared between routers.
//!
//! ```text
//!   prototype ──snapshot()──► router(h1)   own copy of history
//!             ──snapshot()──► router(h2)   own copy of history
//!             ──clone()─────► router(h3)   shares prototype history
//! ```
//!
//! ## Decision per buffered message and contact
//!
//! 1. Already handed to this peer → `Keep`
//! 2. Explicit destination equals the peer → `Deliver`
//! 3. Other explicit destination → `Keep`
//! 4. Gate says final destination → `Deliver`
//! 5. Gate says shared interest → `Relay`
//! 6. Otherwise → `Keep`

use shared_types::{Host, Message, NodeId, SimTime};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

use crate::domain::{ConnectionHistory, InterestGate, RoutingDecision};

/// A relay candidate with its similarity vector.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRelay {
    pub host: NodeId,
    pub score: Vec<f64>,
}

impl RankedRelay {
    /// Sort key: aggregate similarity.
    pub fn total(&self) -> f64 {
        self.score.iter().sum()
    }
}

/// Routing behaviour of one host.
#[derive(Debug, Clone, Default)]
pub struct InterestRouter {
    gate: InterestGate,
    history: Rc<RefCell<ConnectionHistory>>,
}

impl InterestRouter {
    /// Router with a fresh, unshared history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Router over an existing, possibly shared, history.
    pub fn with_history(history: Rc<RefCell<ConnectionHistory>>) -> Self {
        Self {
            gate: InterestGate,
            history,
        }
    }

    /// Router with a deep copy of this router's history. Later changes on
    /// either side are not seen by the other.
    pub fn snapshot(&self) -> Self {
        let copy = self.history.borrow().clone();
        Self::with_history(Rc::new(RefCell::new(copy)))
    }

    /// Handle on the history this router writes to.
    pub fn history(&self) -> Rc<RefCell<ConnectionHistory>> {
        Rc::clone(&self.history)
    }

    /// The gate used for decisions.
    pub fn gate(&self) -> &InterestGate {
        &self.gate
    }

    /// A contact with `peer` came up.
    pub fn contact_up(&self, peer: &NodeId, now: SimTime) {
        self.history.borrow_mut().record_up(peer, now);
    }

    /// A contact with `peer` went down.
    pub fn contact_down(&self, peer: &NodeId) {
        self.history.borrow_mut().record_down(peer);
    }

    /// Record that `message` was handed to `peer`.
    pub fn record_forward(&self, peer: &NodeId, message: &Message) -> bool {
        self.history.borrow_mut().mark_forwarded(peer, &message.id)
    }

    /// Decide what to do with buffered `message` on a contact with `peer`.
    pub fn decide<H: Host + ?Sized>(&self, message: &Message, peer: &H) -> RoutingDecision {
        if self.history.borrow().was_forwarded(peer.id(), &message.id) {
            return RoutingDecision::Keep;
        }

        let decision = match &message.destination {
            Some(dest) if dest == peer.id() => RoutingDecision::Deliver,
            Some(_) => RoutingDecision::Keep,
            None => match self.gate.is_final_destination(message, peer) {
                Some(true) => RoutingDecision::Deliver,
                _ if self.gate.shares_interest(message, peer) => RoutingDecision::Relay,
                _ => RoutingDecision::Keep,
            },
        };
        trace!(message_id = %message.id, peer = %peer.id(), ?decision, "Routing decision");
        decision
    }

    /// Order relay candidates by descending aggregate similarity. Ties keep
    /// the order of `candidates`.
    pub fn rank_relays<'h, H: Host + ?Sized + 'h>(
        &self,
        message: &Message,
        candidates: impl IntoIterator<Item = &'h H>,
    ) -> Vec<RankedRelay> {
        let mut ranked: Vec<RankedRelay> = candidates
            .into_iter()
            .map(|host| RankedRelay {
                host: host.id().clone(),
                score: self.gate.similarity_score(message, host),
            })
            .collect();
        ranked.sort_by(|a, b| b.total().total_cmp(&a.total()));
        ranked
    }
}
