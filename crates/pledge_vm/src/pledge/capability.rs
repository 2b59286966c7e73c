use std::cell::RefCell;
use std::rc::Rc;

use crate::Vm;
use crate::throw;
use crate::value::function::Function;
use crate::value::{Value, ValueContext};

use super::Pledge;

/// A pledge bundled with the resolving functions that were handed to its executor.
#[derive(Debug, Clone)]
pub struct PledgeCapability {
    pub pledge: Pledge,
    pub resolve: Value,
    pub reject: Value,
}

impl PledgeCapability {
    /// Constructs a new pending pledge through the regular executor path and captures the
    /// resolving functions it receives. Derived pledges are always plain pledges.
    pub fn new(vm: &mut Vm) -> Result<Self, Value> {
        let slots: Rc<RefCell<Option<(Value, Value)>>> = Rc::default();

        let executor = {
            let slots = Rc::clone(&slots);
            Function::closure("", move |cx| {
                let mut slots = slots.borrow_mut();
                if slots.is_some() {
                    throw!(TypeError, "Pledge executor has already been invoked");
                }
                *slots = Some((cx.args.first().unwrap_or_undefined(), cx.args.get(1).unwrap_or_undefined()));
                Ok(Value::Undefined)
            })
        };

        let pledge = Pledge::construct(vm, &Value::object(executor))?;
        let (resolve, reject) = slots.take().unwrap_or_default();

        if !resolve.is_callable() {
            throw!(TypeError, "resolve is not callable");
        }

        if !reject.is_callable() {
            throw!(TypeError, "reject is not callable");
        }

        Ok(Self { pledge, resolve, reject })
    }

    pub fn resolve(&self, vm: &mut Vm, value: Value) -> Result<Value, Value> {
        self.resolve.apply(vm, Value::Undefined, vec![value])
    }

    pub fn reject(&self, vm: &mut Vm, reason: Value) -> Result<Value, Value> {
        self.reject.apply(vm, Value::Undefined, vec![reason])
    }
}
