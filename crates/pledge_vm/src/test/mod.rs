use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::Vm;
use crate::job::{Job, JobQueue, MicrotaskQueue};
use crate::params::VmParams;
use crate::pledge::capability::PledgeCapability;
use crate::pledge::reaction::{PledgeReaction, ReactionKind};
use crate::pledge::{Pledge, PledgeState};
use crate::value::error::Error;
use crate::value::function::{CallContext, Function};
use crate::value::object::{NamedObject, Object};
use crate::value::{Value, ValueContext};

type Log = Rc<RefCell<Vec<Value>>>;

fn function<F>(f: F) -> Value
where
    F: Fn(CallContext) -> Result<Value, Value> + 'static,
{
    Value::object(Function::closure("", f))
}

/// A handler that records its argument and returns it.
fn recorder(log: &Log) -> Value {
    let log = Rc::clone(log);
    function(move |cx| {
        let value = cx.args.first().unwrap_or_undefined();
        log.borrow_mut().push(value.clone());
        Ok(value)
    })
}

/// A handler that records `tag` when called.
fn tagger(log: &Log, tag: &'static str) -> Value {
    let log = Rc::clone(log);
    function(move |_| {
        log.borrow_mut().push(Value::string(tag));
        Ok(Value::Undefined)
    })
}

fn new_log() -> Log {
    Rc::default()
}

fn resolved_with(vm: &mut Vm, value: Value) -> Pledge {
    Pledge::with_executor(vm, move |cx| {
        let resolve = cx.args.first().unwrap_or_undefined();
        resolve.apply(cx.vm, Value::Undefined, vec![value.clone()])
    })
    .unwrap()
}

fn rejected_with(vm: &mut Vm, reason: Value) -> Pledge {
    Pledge::with_executor(vm, move |cx| {
        let reject = cx.args.get(1).unwrap_or_undefined();
        reject.apply(cx.vm, Value::Undefined, vec![reason.clone()])
    })
    .unwrap()
}

#[derive(Default)]
struct Rejections {
    reasons: RefCell<Vec<Value>>,
    pledges: RefCell<Vec<Pledge>>,
}

fn record_rejection(vm: &mut Vm, pledge: &Pledge, reason: &Value) {
    let rejections = vm.params().state::<Rejections>().unwrap();
    rejections.reasons.borrow_mut().push(reason.clone());
    rejections.pledges.borrow_mut().push(pledge.clone());
}

fn tracking_vm() -> Vm {
    Vm::new(
        VmParams::new()
            .set_unhandled_rejection_callback(record_rejection)
            .set_state(Box::new(Rejections::default())),
    )
}

fn rejections(vm: &Vm) -> Vec<Value> {
    vm.params().state::<Rejections>().unwrap().reasons.borrow().clone()
}

#[test]
fn executor_runs_synchronously() {
    let mut vm = Vm::default();
    let ran = Rc::new(Cell::new(false));
    let pledge = {
        let ran = Rc::clone(&ran);
        Pledge::with_executor(&mut vm, move |_| {
            ran.set(true);
            Ok(Value::Undefined)
        })
        .unwrap()
    };

    assert!(ran.get());
    assert!(pledge.is_pending());
    assert!(!pledge.is_handled());
    assert_eq!(vm.pending_jobs(), 0);
}

#[test]
fn construct_rejects_missing_or_uncallable_executor() {
    let mut vm = Vm::default();

    let err = Pledge::construct(&mut vm, &Value::Undefined).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Executor is undefined");

    let err = Pledge::construct(&mut vm, &Value::number(1.0)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Executor needs to be a function");

    let err = Pledge::construct(&mut vm, &Value::object(NamedObject::new())).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: Executor needs to be a function");
}

#[test]
fn executor_throw_becomes_rejection() {
    let mut vm = Vm::default();
    let pledge = Pledge::with_executor(&mut vm, |_| Err(Value::string("exploded"))).unwrap();
    assert_eq!(pledge.rejection_reason(), Some(Value::string("exploded")));
}

#[test]
fn executor_throw_after_resolve_is_ignored() {
    let mut vm = Vm::default();
    let pledge = Pledge::with_executor(&mut vm, |cx| {
        let resolve = cx.args.first().unwrap_or_undefined();
        resolve.apply(cx.vm, Value::Undefined, vec![Value::number(1.0)])?;
        Err(Value::string("too late"))
    })
    .unwrap();

    assert_eq!(pledge.fulfilled_value(), Some(Value::number(1.0)));
}

#[test]
fn resolving_functions_are_one_shot() {
    let mut vm = tracking_vm();
    let capability = PledgeCapability::new(&mut vm).unwrap();

    capability.resolve(&mut vm, Value::number(1.0)).unwrap();
    capability.reject(&mut vm, Value::string("ignored")).unwrap();
    capability.resolve(&mut vm, Value::number(2.0)).unwrap();

    assert_eq!(capability.pledge.fulfilled_value(), Some(Value::number(1.0)));
    assert!(rejections(&vm).is_empty());
}

#[test]
fn self_resolution_rejects() {
    let mut vm = Vm::default();
    let capability = PledgeCapability::new(&mut vm).unwrap();
    let itself = Value::from(capability.pledge.clone());

    capability.resolve(&mut vm, itself).unwrap();

    let reason = capability.pledge.rejection_reason().unwrap();
    assert_eq!(reason.to_string(), "TypeError: Cannot resolve a pledge with itself");
    let Value::Object(error) = reason else {
        panic!("expected an error object");
    };
    assert!(error.downcast_ref::<Error>().is_some());
}

#[test]
fn non_thenable_resolution_fulfills_with_exact_value() {
    let mut vm = Vm::default();
    let log = new_log();

    let object = Value::object(NamedObject::new().with_property("then", 5.0));
    let capability = PledgeCapability::new(&mut vm).unwrap();
    capability.pledge.then(&mut vm, recorder(&log), Value::Undefined).unwrap();
    capability.resolve(&mut vm, object.clone()).unwrap();

    // settled right away, but handlers only run from the queue
    assert_eq!(capability.pledge.fulfilled_value(), Some(object.clone()));
    assert!(log.borrow().is_empty());

    vm.process_jobs();
    assert_eq!(*log.borrow(), vec![object]);
}

#[test]
fn primitive_resolution_fulfills() {
    let mut vm = Vm::default();
    for value in [Value::Undefined, Value::Null, Value::Boolean(false), Value::string("s")] {
        let pledge = resolved_with(&mut vm, value.clone());
        assert_eq!(pledge.fulfilled_value(), Some(value));
    }
}

#[derive(Debug)]
struct ThrowingThen;

impl Object for ThrowingThen {
    fn get_property(&self, _: &mut Vm, key: &str) -> Result<Value, Value> {
        match key {
            "then" => Err(Value::string("getter failed")),
            _ => Ok(Value::Undefined),
        }
    }
}

#[test]
fn throwing_then_getter_rejects() {
    let mut vm = Vm::default();
    let pledge = resolved_with(&mut vm, Value::object(ThrowingThen));
    assert_eq!(pledge.rejection_reason(), Some(Value::string("getter failed")));
}

#[test]
fn thenable_adoption_is_deferred() {
    let mut vm = Vm::default();
    let thenable = Value::object(NamedObject::new().with_property(
        "then",
        function(|cx| {
            let resolve = cx.args.first().unwrap_or_undefined();
            resolve.apply(cx.vm, Value::Undefined, vec![Value::string("adopted")])
        }),
    ));

    let pledge = resolved_with(&mut vm, thenable);
    assert!(pledge.is_pending());
    assert_eq!(vm.pending_jobs(), 1);

    assert_eq!(vm.process_jobs(), 1);
    assert_eq!(pledge.fulfilled_value(), Some(Value::string("adopted")));
}

#[test]
fn thenable_receives_itself_as_this() {
    let mut vm = Vm::default();
    let seen = new_log();
    let thenable = Rc::new(NamedObject::new());
    {
        let seen = Rc::clone(&seen);
        thenable.set_property(
            "then",
            function(move |cx| {
                seen.borrow_mut().push(cx.this.clone());
                Ok(Value::Undefined)
            }),
        );
    }
    let thenable = Value::Object(thenable.into());

    let pledge = resolved_with(&mut vm, thenable.clone());
    vm.process_jobs();

    assert_eq!(*seen.borrow(), vec![thenable]);
    assert!(pledge.is_pending());
}

#[test]
fn thenable_that_throws_rejects() {
    let mut vm = Vm::default();
    let thenable = Value::object(
        NamedObject::new().with_property("then", function(|_| Err(Value::string("then threw")))),
    );

    let pledge = resolved_with(&mut vm, thenable);
    vm.process_jobs();
    assert_eq!(pledge.rejection_reason(), Some(Value::string("then threw")));
}

#[test]
fn thenable_throw_after_resolving_is_ignored() {
    let mut vm = Vm::default();
    let thenable = Value::object(NamedObject::new().with_property(
        "then",
        function(|cx| {
            let resolve = cx.args.first().unwrap_or_undefined();
            resolve.apply(cx.vm, Value::Undefined, vec![Value::number(9.0)])?;
            Err(Value::string("ignored"))
        }),
    ));

    let pledge = resolved_with(&mut vm, thenable);
    vm.process_jobs();
    assert_eq!(pledge.fulfilled_value(), Some(Value::number(9.0)));
}

#[test]
fn deeply_nested_thenables_fulfill_through_the_queue() {
    const DEPTH: usize = 1000;

    let mut vm = Vm::default();
    let mut next = Value::number(7.0);
    for _ in 0..DEPTH {
        let inner = next.clone();
        next = Value::object(NamedObject::new().with_property(
            "then",
            function(move |cx| {
                let resolve = cx.args.first().unwrap_or_undefined();
                resolve.apply(cx.vm, Value::Undefined, vec![inner.clone()])
            }),
        ));
    }

    let pledge = resolved_with(&mut vm, next);
    assert_eq!(vm.process_jobs(), DEPTH);
    assert_eq!(pledge.fulfilled_value(), Some(Value::number(7.0)));
}

#[test]
fn resolving_with_a_pledge_adopts_its_state() {
    let mut vm = Vm::default();
    let inner = PledgeCapability::new(&mut vm).unwrap();
    let outer = resolved_with(&mut vm, inner.pledge.clone().into());

    vm.process_jobs();
    assert!(outer.is_pending());
    assert!(inner.pledge.is_handled());

    inner.reject(&mut vm, Value::string("inner failed")).unwrap();
    vm.process_jobs();
    assert_eq!(outer.rejection_reason(), Some(Value::string("inner failed")));
}

#[test]
fn throwing_fulfill_handler_rejects_downstream() {
    let mut vm = Vm::default();
    let pledge = resolved_with(&mut vm, Value::number(1.0));
    let derived = pledge
        .then(&mut vm, function(|_| Err(Value::string("handler failed"))), Value::Undefined)
        .unwrap();

    assert!(derived.is_pending());
    vm.process_jobs();
    assert_eq!(derived.rejection_reason(), Some(Value::string("handler failed")));
}

#[test]
fn rejection_handler_recovers() {
    let mut vm = Vm::default();
    let log = new_log();
    let capability = PledgeCapability::new(&mut vm).unwrap();

    let on_rejected = {
        let log = Rc::clone(&log);
        function(move |cx| {
            log.borrow_mut().push(cx.args.first().unwrap_or_undefined());
            Ok(Value::string("v"))
        })
    };
    let derived = capability.pledge.then(&mut vm, Value::Undefined, on_rejected).unwrap();

    capability.reject(&mut vm, Value::string("r")).unwrap();
    vm.process_jobs();

    assert_eq!(*log.borrow(), vec![Value::string("r")]);
    assert_eq!(derived.fulfilled_value(), Some(Value::string("v")));
}

#[test]
fn missing_handlers_pass_outcomes_through() {
    let mut vm = Vm::default();
    let log = new_log();

    let fulfilled = resolved_with(&mut vm, Value::number(3.0));
    let passed = fulfilled.then(&mut vm, Value::Undefined, recorder(&log)).unwrap();

    let rejected = rejected_with(&mut vm, Value::string("e"));
    let skipped = rejected.then(&mut vm, recorder(&log), Value::string("not a function")).unwrap();

    vm.process_jobs();
    assert!(log.borrow().is_empty());
    assert_eq!(passed.fulfilled_value(), Some(Value::number(3.0)));
    assert_eq!(skipped.rejection_reason(), Some(Value::string("e")));
}

#[test]
fn reactions_run_in_registration_order() {
    let mut vm = Vm::default();
    let log = new_log();
    let capability = PledgeCapability::new(&mut vm).unwrap();

    for tag in ["a", "b", "c"] {
        capability.pledge.then(&mut vm, tagger(&log, tag), Value::Undefined).unwrap();
    }
    assert!(log.borrow().is_empty());

    capability.resolve(&mut vm, Value::Undefined).unwrap();
    capability.pledge.then(&mut vm, tagger(&log, "late"), Value::Undefined).unwrap();
    vm.process_jobs();

    let expected: Vec<_> = ["a", "b", "c", "late"].into_iter().map(Value::string).collect();
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn then_on_settled_pledge_queues_behind_earlier_jobs() {
    let mut vm = Vm::default();
    let log = new_log();
    let first = resolved_with(&mut vm, Value::Undefined);
    let second = resolved_with(&mut vm, Value::Undefined);

    first.then(&mut vm, tagger(&log, "first"), Value::Undefined).unwrap();
    second.then(&mut vm, tagger(&log, "second"), Value::Undefined).unwrap();
    first.then(&mut vm, tagger(&log, "third"), Value::Undefined).unwrap();
    assert!(log.borrow().is_empty());

    vm.process_jobs();
    let expected: Vec<_> = ["first", "second", "third"].into_iter().map(Value::string).collect();
    assert_eq!(*log.borrow(), expected);
}

#[test]
fn chained_increment_records_43() {
    let mut vm = Vm::default();
    let log = new_log();

    let add_one = function(|cx| match cx.args.first().unwrap_or_undefined() {
        Value::Number(n) => Ok(Value::number(n + 1.0)),
        other => Err(Value::from(format!("expected a number, got {other}"))),
    });

    let pledge = resolved_with(&mut vm, Value::number(42.0));
    let pledge = pledge.then(&mut vm, add_one, Value::Undefined).unwrap();
    pledge.then(&mut vm, recorder(&log), Value::Undefined).unwrap();

    vm.process_jobs();
    assert_eq!(*log.borrow(), vec![Value::number(43.0)]);
}

#[test]
fn rejection_recovers_into_string() {
    let mut vm = Vm::default();
    let pledge = rejected_with(&mut vm, Value::string("boom"));
    let recovered = pledge
        .then(
            &mut vm,
            Value::Null,
            function(|cx| Ok(format!("recovered:{}", cx.args.first().unwrap_or_undefined()).into())),
        )
        .unwrap();

    vm.process_jobs();
    assert_eq!(recovered.fulfilled_value(), Some(Value::string("recovered:boom")));
}

#[test]
fn unhandled_rejection_is_reported_once() {
    let mut vm = tracking_vm();
    let pledge = rejected_with(&mut vm, Value::string("lost"));
    vm.process_jobs();

    assert_eq!(rejections(&vm), vec![Value::string("lost")]);
    assert!(!pledge.is_handled());
}

#[test]
fn handler_attached_before_rejection_suppresses_report() {
    let mut vm = tracking_vm();
    let log = new_log();
    let capability = PledgeCapability::new(&mut vm).unwrap();
    capability.pledge.then(&mut vm, recorder(&log), recorder(&log)).unwrap();

    capability.reject(&mut vm, Value::string("caught")).unwrap();
    vm.process_jobs();

    assert!(rejections(&vm).is_empty());
    assert_eq!(*log.borrow(), vec![Value::string("caught")]);
}

#[test]
fn passthrough_chain_reports_only_the_leaf() {
    let mut vm = tracking_vm();
    let capability = PledgeCapability::new(&mut vm).unwrap();
    let leaf = capability.pledge.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();

    capability.reject(&mut vm, Value::string("fell through")).unwrap();
    vm.process_jobs();

    let state = vm.params().state::<Rejections>().unwrap();
    assert_eq!(*state.reasons.borrow(), vec![Value::string("fell through")]);
    assert!(state.pledges.borrow()[0].ptr_eq(&leaf));
}

#[test]
fn catch_handles_rejections() {
    let mut vm = tracking_vm();
    let pledge = rejected_with(&mut vm, Value::string("oops"));
    let caught = pledge
        .catch(&mut vm, function(|cx| Ok(format!("caught {}", cx.args.first().unwrap_or_undefined()).into())))
        .unwrap();

    vm.process_jobs();
    assert_eq!(caught.fulfilled_value(), Some(Value::string("caught oops")));
    // reported once at rejection time, before catch was attached
    assert_eq!(rejections(&vm).len(), 1);
}

#[test]
fn finally_passes_value_through() {
    let mut vm = Vm::default();
    let log = new_log();
    let pledge = resolved_with(&mut vm, Value::number(5.0));
    let after = pledge.finally(&mut vm, tagger(&log, "done")).unwrap();

    vm.process_jobs();
    assert_eq!(*log.borrow(), vec![Value::string("done")]);
    assert_eq!(after.fulfilled_value(), Some(Value::number(5.0)));
}

#[test]
fn finally_rethrows_original_reason() {
    let mut vm = Vm::default();
    let log = new_log();
    let pledge = rejected_with(&mut vm, Value::string("original"));
    let after = pledge.finally(&mut vm, tagger(&log, "done")).unwrap();

    vm.process_jobs();
    assert_eq!(*log.borrow(), vec![Value::string("done")]);
    assert_eq!(after.rejection_reason(), Some(Value::string("original")));
}

#[test]
fn finally_callback_failure_replaces_outcome() {
    let mut vm = Vm::default();
    let pledge = resolved_with(&mut vm, Value::number(5.0));
    let after = pledge
        .finally(&mut vm, function(|_| Err(Value::string("cleanup failed"))))
        .unwrap();

    vm.process_jobs();
    assert_eq!(
        after.rejection_reason(),
        Some(Value::string("cleanup failed"))
    );
}

#[test]
fn finally_with_non_callable_behaves_like_then() {
    let mut vm = Vm::default();
    let pledge = resolved_with(&mut vm, Value::number(8.0));
    let after = pledge.finally(&mut vm, Value::number(0.0)).unwrap();

    vm.process_jobs();
    assert_eq!(after.fulfilled_value(), Some(Value::number(8.0)));
}

#[test]
fn pledge_exposes_chaining_methods_as_properties() {
    let mut vm = Vm::default();
    let pledge = Value::from(resolved_with(&mut vm, Value::Undefined));

    for name in ["then", "catch", "finally"] {
        let method = pledge.get_property(&mut vm, name).unwrap();
        assert!(method.is_callable(), "{name} should be callable");
        assert_eq!(method.get_property(&mut vm, "name").unwrap(), Value::string(name));
    }
    assert_eq!(pledge.get_property(&mut vm, "value").unwrap(), Value::Undefined);
}

#[test]
fn pledge_resolve_returns_existing_pledge() {
    let mut vm = Vm::default();
    let pledge = resolved_with(&mut vm, Value::number(1.0));
    let same = Pledge::resolve(&mut vm, pledge.clone().into()).unwrap();
    assert!(same.ptr_eq(&pledge));

    let rejected = Pledge::reject(&mut vm, Value::string("r")).unwrap();
    assert!(matches!(&*rejected.state(), PledgeState::Rejected(reason) if *reason == Value::string("r")));
}

struct CountingQueue {
    inner: MicrotaskQueue,
    enqueued: Rc<Cell<usize>>,
}

impl JobQueue for CountingQueue {
    fn enqueue(&mut self, job: Job) {
        self.enqueued.set(self.enqueued.get() + 1);
        self.inner.enqueue(job);
    }

    fn dequeue(&mut self) -> Option<Job> {
        self.inner.dequeue()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[test]
fn custom_job_queue_receives_all_jobs() {
    let enqueued = Rc::new(Cell::new(0));
    let queue = CountingQueue {
        inner: MicrotaskQueue::new(),
        enqueued: Rc::clone(&enqueued),
    };
    let mut vm = Vm::new(VmParams::new().set_job_queue(Box::new(queue)));

    let pledge = resolved_with(&mut vm, Value::number(1.0));
    let derived = pledge.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();
    derived.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();

    assert_eq!(vm.process_jobs(), 2);
    assert_eq!(enqueued.get(), 2);
}

fn record_task_exception(vm: &mut Vm, exception: Value) {
    vm.params().state::<RefCell<Vec<Value>>>().unwrap().borrow_mut().push(exception);
}

#[test]
fn job_exceptions_reach_the_host() {
    let mut vm = Vm::new(
        VmParams::new()
            .set_unhandled_task_exception_callback(record_task_exception)
            .set_state(Box::new(RefCell::new(Vec::<Value>::new()))),
    );

    let throwing = function(|_| Err(Value::string("capability broke")));
    let capability = PledgeCapability {
        pledge: PledgeCapability::new(&mut vm).unwrap().pledge,
        resolve: throwing.clone(),
        reject: throwing,
    };
    let reaction = PledgeReaction::new(Some(capability), ReactionKind::Fulfill, None);
    vm.enqueue_job(Job::reaction(reaction, Value::Undefined));

    assert_eq!(vm.process_jobs(), 1);
    let exceptions = vm.params().state::<RefCell<Vec<Value>>>().unwrap();
    assert_eq!(*exceptions.borrow(), vec![Value::string("capability broke")]);
}

#[test]
fn dropping_a_long_pending_chain_does_not_recurse() {
    let mut vm = Vm::default();
    let root = PledgeCapability::new(&mut vm).unwrap();

    let mut leaf = root.pledge.clone();
    for _ in 0..100_000 {
        leaf = leaf.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();
    }
    assert!(leaf.is_pending());

    drop(leaf);
    drop(root);
    assert_eq!(vm.pending_jobs(), 0);
}

#[test]
fn dropping_a_vm_with_queued_chain_head_does_not_recurse() {
    let mut vm = Vm::default();
    let root = resolved_with(&mut vm, Value::number(1.0));

    let mut leaf = root.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();
    for _ in 0..100_000 {
        leaf = leaf.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();
    }
    assert_eq!(vm.pending_jobs(), 1);

    drop(leaf);
    drop(root);
    drop(vm);
}

#[test]
fn dropping_part_of_a_chain_keeps_held_links_intact() {
    let mut vm = Vm::default();
    let root = PledgeCapability::new(&mut vm).unwrap();
    let middle = root.pledge.then(&mut vm, Value::Undefined, Value::Undefined).unwrap();
    let log = new_log();
    middle.then(&mut vm, recorder(&log), Value::Undefined).unwrap();

    drop(middle);
    root.resolve(&mut vm, Value::number(3.0)).unwrap();
    vm.process_jobs();

    assert_eq!(*log.borrow(), vec![Value::number(3.0)]);
}

#[test]
fn catch_and_finally_chain_as_pledges() {
    let mut vm = Vm::default();
    let log = new_log();
    let pledge = rejected_with(&mut vm, Value::string("r"));

    let tail = pledge
        .catch(&mut vm, recorder(&log))
        .and_then(|caught| caught.finally(&mut vm, tagger(&log, "done")))
        .unwrap();

    vm.process_jobs();
    assert_eq!(*log.borrow(), vec![Value::string("r"), Value::string("done")]);
    assert_eq!(tail.fulfilled_value(), Some(Value::string("r")));
}
