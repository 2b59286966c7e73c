pub mod capability;
pub mod reaction;
pub mod resolve;

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::Vm;
use crate::error::PledgeError;
use crate::job::Job;
use crate::js_std;
use crate::throw;
use crate::value::function::{CallContext, Function};
use crate::value::object::{Handle, Object};
use crate::value::Value;

use self::capability::PledgeCapability;
use self::reaction::{PledgeReaction, ReactionKind};
use self::resolve::ResolvingFunctions;

pub type Reactions = SmallVec<[PledgeReaction; 1]>;

#[derive(Debug)]
pub enum PledgeState {
    Pending {
        fulfill_reactions: Reactions,
        reject_reactions: Reactions,
    },
    Fulfilled(Value),
    Rejected(Value),
}

impl PledgeState {
    fn pending() -> Self {
        Self::Pending {
            fulfill_reactions: SmallVec::new(),
            reject_reactions: SmallVec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "pending",
            Self::Fulfilled(_) => "fulfilled",
            Self::Rejected(_) => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The fulfillment value or rejection reason, `None` while pending.
    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Pending { .. } => None,
            Self::Fulfilled(value) | Self::Rejected(value) => Some(value),
        }
    }
}

struct PledgeRecord {
    state: RefCell<PledgeState>,
    is_handled: Cell<bool>,
}

impl fmt::Debug for PledgeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.try_borrow().map(|s| s.name()).unwrap_or("<borrowed>");
        f.debug_struct("Pledge")
            .field("state", &state)
            .field("is_handled", &self.is_handled.get())
            .finish()
    }
}

impl PledgeRecord {
    /// Moves any pending reactions into `into`, leaving the record with empty lists.
    fn drain_reactions(&mut self, into: &mut Vec<PledgeReaction>) {
        if let PledgeState::Pending {
            fulfill_reactions,
            reject_reactions,
        } = self.state.get_mut()
        {
            into.extend(fulfill_reactions.drain(..));
            into.extend(reject_reactions.drain(..));
        }
    }
}

// A pending pledge owns the capabilities of everything derived from it, so dropping the head of a
// long `then` chain would otherwise recurse once per link.
impl Drop for PledgeRecord {
    fn drop(&mut self) {
        let mut worklist = Vec::new();
        self.drain_reactions(&mut worklist);

        while let Some(reaction) = worklist.pop() {
            let Some(PledgeCapability { pledge, resolve, reject }) = reaction.capability else {
                continue;
            };

            // the resolving functions hold the pledge too
            drop((resolve, reject));

            let mut record = pledge.0;
            if let Some(record) = Rc::get_mut(&mut record) {
                record.drain_reactions(&mut worklist);
            }
        }
    }
}

impl Object for PledgeRecord {
    fn get_property(&self, vm: &mut Vm, key: &str) -> Result<Value, Value> {
        let statics = vm.statics();
        Ok(match key {
            "then" => Value::Object(statics.pledge_then.clone()),
            "catch" => Value::Object(statics.pledge_catch.clone()),
            "finally" => Value::Object(statics.pledge_finally.clone()),
            "constructor" => Value::Object(statics.pledge_ctor.clone()),
            _ => Value::Undefined,
        })
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.borrow() {
            PledgeState::Pending { .. } => f.write_str("Pledge { <pending> }"),
            PledgeState::Fulfilled(value) => write!(f, "Pledge {{ {value} }}"),
            PledgeState::Rejected(reason) => write!(f, "Pledge {{ <rejected> {reason} }}"),
        }
    }
}

/// A shared reference to a pledge.
#[derive(Debug, Clone)]
pub struct Pledge(Rc<PledgeRecord>);

impl Pledge {
    fn pending() -> Self {
        Self(Rc::new(PledgeRecord {
            state: RefCell::new(PledgeState::pending()),
            is_handled: Cell::new(false),
        }))
    }

    /// Creates a pledge and runs `executor(resolve, reject)` synchronously.
    ///
    /// Only a missing or non-callable executor fails here. Anything the executor throws
    /// becomes a rejection of the new pledge.
    pub fn construct(vm: &mut Vm, executor: &Value) -> Result<Self, Value> {
        if matches!(executor, Value::Undefined) {
            throw!(TypeError, "Executor is undefined");
        }

        if !executor.is_callable() {
            throw!(TypeError, "Executor needs to be a function");
        }

        let pledge = Self::pending();
        let functions = ResolvingFunctions::new(&pledge);
        let reject = Rc::clone(&functions.reject);
        let (resolve_value, reject_value) = functions.into_values();

        if let Err(error) = executor.apply(vm, Value::Undefined, vec![resolve_value, reject_value]) {
            if let Err(err) = reject.call(vm, error) {
                unreachable!("executor rejection settled a pledge twice: {err}");
            }
        }

        Ok(pledge)
    }

    /// [`Pledge::construct`] with a Rust closure as the executor.
    pub fn with_executor<F>(vm: &mut Vm, executor: F) -> Result<Self, Value>
    where
        F: Fn(CallContext) -> Result<Value, Value> + 'static,
    {
        Self::construct(vm, &Value::object(Function::closure("executor", executor)))
    }

    /// Returns `value` itself if it already is a pledge, otherwise a new pledge resolved with it.
    pub fn resolve(vm: &mut Vm, value: Value) -> Result<Self, Value> {
        if let Some(pledge) = value.as_pledge() {
            return Ok(pledge);
        }

        let capability = PledgeCapability::new(vm)?;
        capability.resolve(vm, value)?;
        Ok(capability.pledge)
    }

    /// A new pledge rejected with `reason`.
    pub fn reject(vm: &mut Vm, reason: Value) -> Result<Self, Value> {
        let capability = PledgeCapability::new(vm)?;
        capability.reject(vm, reason)?;
        Ok(capability.pledge)
    }

    /// Registers handlers and returns the derived pledge. Non-callable handlers are ignored.
    pub fn then(&self, vm: &mut Vm, on_fulfilled: Value, on_rejected: Value) -> Result<Self, Value> {
        let capability = PledgeCapability::new(vm)?;
        let derived = capability.pledge.clone();
        perform_then(vm, self, on_fulfilled, on_rejected, Some(capability));
        Ok(derived)
    }

    pub fn catch(&self, vm: &mut Vm, on_rejected: Value) -> Result<Self, Value> {
        self.then(vm, Value::Undefined, on_rejected)
    }

    /// Runs `on_finally` on either outcome, then passes the original value or reason through.
    pub fn finally(&self, vm: &mut Vm, on_finally: Value) -> Result<Self, Value> {
        let (on_fulfilled, on_rejected) = js_std::pledge::finally_handlers(on_finally);
        self.then(vm, on_fulfilled, on_rejected)
    }

    pub fn state(&self) -> Ref<'_, PledgeState> {
        self.0.state.borrow()
    }

    pub fn is_pending(&self) -> bool {
        self.state().is_pending()
    }

    pub fn fulfilled_value(&self) -> Option<Value> {
        match &*self.state() {
            PledgeState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn rejection_reason(&self) -> Option<Value> {
        match &*self.state() {
            PledgeState::Rejected(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn is_handled(&self) -> bool {
        self.0.is_handled.get()
    }

    pub fn ptr_eq(&self, other: &Pledge) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn from_handle(handle: &Handle) -> Option<Self> {
        handle.downcast::<PledgeRecord>().map(Self)
    }

    pub fn into_handle(self) -> Handle {
        Handle::from(self.0)
    }

    fn is_handle(&self, handle: &Handle) -> bool {
        handle.downcast_ref::<PledgeRecord>().is_some_and(|record| std::ptr::eq(record, &*self.0))
    }
}

impl fmt::Display for Pledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display(f)
    }
}

/// Attaches a fulfill/reject reaction pair to `pledge`. With no capability the handlers still run
/// but their outcome goes nowhere.
pub fn perform_then(
    vm: &mut Vm,
    pledge: &Pledge,
    on_fulfilled: Value,
    on_rejected: Value,
    capability: Option<PledgeCapability>,
) -> Option<Pledge> {
    let fulfill_reaction = PledgeReaction::new(capability.clone(), ReactionKind::Fulfill, on_fulfilled.into_callable());
    let reject_reaction = PledgeReaction::new(capability.clone(), ReactionKind::Reject, on_rejected.into_callable());

    let settled = match &mut *pledge.0.state.borrow_mut() {
        PledgeState::Pending {
            fulfill_reactions,
            reject_reactions,
        } => {
            fulfill_reactions.push(fulfill_reaction);
            reject_reactions.push(reject_reaction);
            None
        }
        PledgeState::Fulfilled(value) => Some((fulfill_reaction, value.clone())),
        PledgeState::Rejected(reason) => Some((reject_reaction, reason.clone())),
    };

    if let Some((reaction, argument)) = settled {
        vm.enqueue_job(Job::reaction(reaction, argument));
    }

    pledge.0.is_handled.set(true);

    capability.map(|capability| capability.pledge)
}

/// Settles `pledge` as fulfilled and schedules its fulfill reactions in registration order.
pub(crate) fn fulfill_pledge(vm: &mut Vm, pledge: &Pledge, value: Value) -> Result<(), PledgeError> {
    let reactions = settle(pledge, PledgeState::Fulfilled(value.clone()), ReactionKind::Fulfill)?;
    pledge_log::debug!(reactions = reactions.len(), "pledge fulfilled");
    trigger_reactions(vm, reactions, value);
    Ok(())
}

/// Settles `pledge` as rejected, reports it if nothing is attached and schedules its reject
/// reactions in registration order.
pub(crate) fn reject_pledge(vm: &mut Vm, pledge: &Pledge, reason: Value) -> Result<(), PledgeError> {
    let reactions = settle(pledge, PledgeState::Rejected(reason.clone()), ReactionKind::Reject)?;
    pledge_log::debug!(reactions = reactions.len(), "pledge rejected");

    if !pledge.is_handled() {
        vm.track_unhandled_rejection(pledge, &reason);
    }

    trigger_reactions(vm, reactions, reason);
    Ok(())
}

/// Swaps in the settled state and hands back the reactions of `kind`. The other list is dropped.
fn settle(pledge: &Pledge, settled: PledgeState, kind: ReactionKind) -> Result<Reactions, PledgeError> {
    let mut state = pledge.0.state.borrow_mut();

    match mem::replace(&mut *state, settled) {
        PledgeState::Pending {
            fulfill_reactions,
            reject_reactions,
        } => Ok(match kind {
            ReactionKind::Fulfill => fulfill_reactions,
            ReactionKind::Reject => reject_reactions,
        }),
        previous => {
            let name = previous.name();
            *state = previous;
            Err(PledgeError::AlreadySettled(name))
        }
    }
}

fn trigger_reactions(vm: &mut Vm, reactions: Reactions, argument: Value) {
    for reaction in reactions {
        vm.enqueue_job(Job::reaction(reaction, argument.clone()));
    }
}
