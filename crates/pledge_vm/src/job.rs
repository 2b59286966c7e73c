use std::collections::VecDeque;

use crate::Vm;
use crate::pledge::Pledge;
use crate::pledge::reaction::{PledgeReaction, ReactionKind};
use crate::pledge::resolve::ResolvingFunctions;
use crate::value::Value;
use crate::value::object::Handle;

/// A unit of deferred work.
#[derive(Debug)]
pub enum Job {
    Reaction(ReactionJob),
    ResolveThenable(ResolveThenableJob),
}

impl Job {
    pub fn reaction(reaction: PledgeReaction, argument: Value) -> Self {
        Self::Reaction(ReactionJob { reaction, argument })
    }

    pub fn resolve_thenable(pledge: Pledge, thenable: Value, then: Handle) -> Self {
        Self::ResolveThenable(ResolveThenableJob {
            pledge,
            thenable,
            then,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Reaction(..) => "reaction",
            Self::ResolveThenable(..) => "resolve_thenable",
        }
    }

    /// Runs the job to completion. An `Err` is an exception nothing inside the job could route
    /// into a pledge; the [`Vm`] reports it to the host.
    pub fn run(self, vm: &mut Vm) -> Result<(), Value> {
        match self {
            Self::Reaction(job) => job.run(vm),
            Self::ResolveThenable(job) => job.run(vm),
        }
    }
}

/// Delivers a settled value to one reaction.
#[derive(Debug)]
pub struct ReactionJob {
    pub reaction: PledgeReaction,
    pub argument: Value,
}

impl ReactionJob {
    fn run(self, vm: &mut Vm) -> Result<(), Value> {
        let Self { reaction, argument } = self;

        let outcome = match &reaction.handler {
            Some(handler) => handler.as_object().apply(vm, Value::Undefined, vec![argument]),
            None => match reaction.kind {
                ReactionKind::Fulfill => Ok(argument),
                ReactionKind::Reject => Err(argument),
            },
        };

        let Some(capability) = reaction.capability else {
            return Ok(());
        };

        match outcome {
            Ok(value) => capability.resolve(vm, value).map(drop),
            Err(reason) => capability.reject(vm, reason).map(drop),
        }
    }
}

/// Adopts the state of a foreign thenable by calling its `then` with a fresh resolving pair.
#[derive(Debug)]
pub struct ResolveThenableJob {
    pub pledge: Pledge,
    pub thenable: Value,
    pub then: Handle,
}

impl ResolveThenableJob {
    fn run(self, vm: &mut Vm) -> Result<(), Value> {
        let (resolve, reject) = ResolvingFunctions::new(&self.pledge).into_values();

        if let Err(error) = self
            .then
            .as_object()
            .apply(vm, self.thenable, vec![resolve, reject.clone()])
        {
            reject.apply(vm, Value::Undefined, vec![error])?;
        }

        Ok(())
    }
}

/// The host facility jobs are scheduled on. Implementations must hand jobs back in the order
/// they were enqueued.
pub trait JobQueue {
    fn enqueue(&mut self, job: Job);
    fn dequeue(&mut self) -> Option<Job>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    jobs: VecDeque<Job>,
    total_enqueued: u64,
}

impl MicrotaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_enqueued(&self) -> u64 {
        self.total_enqueued
    }
}

impl JobQueue for MicrotaskQueue {
    fn enqueue(&mut self, job: Job) {
        self.total_enqueued += 1;
        self.jobs.push_back(job);
    }

    fn dequeue(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }
}
