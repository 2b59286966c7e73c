use crate::value::object::Handle;

use super::capability::PledgeCapability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Fulfill,
    Reject,
}

/// A handler waiting for one kind of settlement, and the pledge its outcome flows into.
#[derive(Debug)]
pub struct PledgeReaction {
    /// `None` when the caller of `then` did not ask for a derived pledge.
    pub capability: Option<PledgeCapability>,
    pub kind: ReactionKind,
    /// `None` passes the settled value (or reason) through unchanged.
    pub handler: Option<Handle>,
}

impl PledgeReaction {
    pub fn new(capability: Option<PledgeCapability>, kind: ReactionKind, handler: Option<Handle>) -> Self {
        Self {
            capability,
            kind,
            handler,
        }
    }
}
