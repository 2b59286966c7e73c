use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::Vm;
use crate::error::PledgeError;
use crate::job::Job;
use crate::value::error::Error;
use crate::value::object::{Handle, Object};
use crate::value::{Typeof, Value, ValueContext};

use super::{Pledge, fulfill_pledge, reject_pledge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvingKind {
    Resolve,
    Reject,
}

/// One half of a resolve/reject pair. Both halves share `already_resolved`, so whichever is
/// called first wins and every later call does nothing.
#[derive(Debug)]
pub struct ResolvingFunction {
    pledge: Pledge,
    kind: ResolvingKind,
    already_resolved: Rc<Cell<bool>>,
}

impl ResolvingFunction {
    pub(crate) fn call(&self, vm: &mut Vm, argument: Value) -> Result<(), PledgeError> {
        if self.already_resolved.replace(true) {
            return Ok(());
        }

        match self.kind {
            ResolvingKind::Resolve => resolve_pledge(vm, &self.pledge, argument),
            ResolvingKind::Reject => reject_pledge(vm, &self.pledge, argument),
        }
    }
}

impl Object for ResolvingFunction {
    fn get_property(&self, _: &mut Vm, key: &str) -> Result<Value, Value> {
        Ok(match key {
            "name" => Value::string(""),
            _ => Value::Undefined,
        })
    }

    fn apply(&self, vm: &mut Vm, _this: Value, args: Vec<Value>) -> Result<Value, Value> {
        if let Err(err) = self.call(vm, args.first().unwrap_or_undefined()) {
            unreachable!("resolving function settled a pledge twice: {err}");
        }

        Ok(Value::Undefined)
    }

    fn type_of(&self) -> Typeof {
        Typeof::Function
    }

    fn display(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ResolvingKind::Resolve => f.write_str("[Function: resolve]"),
            ResolvingKind::Reject => f.write_str("[Function: reject]"),
        }
    }
}

/// Created only by the pledge constructor and the thenable job.
pub(crate) struct ResolvingFunctions {
    pub(crate) resolve: Rc<ResolvingFunction>,
    pub(crate) reject: Rc<ResolvingFunction>,
}

impl ResolvingFunctions {
    pub(crate) fn new(pledge: &Pledge) -> Self {
        let already_resolved = Rc::new(Cell::new(false));
        let make = |kind| {
            Rc::new(ResolvingFunction {
                pledge: pledge.clone(),
                kind,
                already_resolved: Rc::clone(&already_resolved),
            })
        };

        Self {
            resolve: make(ResolvingKind::Resolve),
            reject: make(ResolvingKind::Reject),
        }
    }

    pub(crate) fn into_values(self) -> (Value, Value) {
        (
            Value::Object(Handle::from(self.resolve)),
            Value::Object(Handle::from(self.reject)),
        )
    }
}

/// The body of a `resolve` function once the one-shot gate has been passed.
fn resolve_pledge(vm: &mut Vm, pledge: &Pledge, resolution: Value) -> Result<(), PledgeError> {
    let Value::Object(object) = &resolution else {
        return fulfill_pledge(vm, pledge, resolution);
    };

    if pledge.is_handle(object) {
        let error = Value::object(Error::type_error("Cannot resolve a pledge with itself"));
        return reject_pledge(vm, pledge, error);
    }

    let then = match object.as_object().get_property(vm, "then") {
        Ok(then) => then,
        Err(error) => return reject_pledge(vm, pledge, error),
    };

    match then.into_callable() {
        Some(then) => {
            vm.enqueue_job(Job::resolve_thenable(pledge.clone(), resolution, then));
            Ok(())
        }
        None => fulfill_pledge(vm, pledge, resolution),
    }
}
