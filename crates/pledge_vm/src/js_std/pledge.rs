use crate::Vm;
use crate::pledge::Pledge;
use crate::throw;
use crate::value::function::{CallContext, Function};
use crate::value::{Value, ValueContext};

pub fn constructor(cx: CallContext) -> Result<Value, Value> {
    let executor = cx.args.first().unwrap_or_undefined();
    Pledge::construct(cx.vm, &executor).map(Value::from)
}

pub fn then(cx: CallContext) -> Result<Value, Value> {
    let Some(pledge) = cx.this.as_pledge() else {
        throw!(TypeError, "Pledge.prototype.then called on incompatible receiver {}", cx.this);
    };

    let on_fulfilled = cx.args.first().unwrap_or_undefined();
    let on_rejected = cx.args.get(1).unwrap_or_undefined();
    pledge.then(cx.vm, on_fulfilled, on_rejected).map(Value::from)
}

pub fn catch(cx: CallContext) -> Result<Value, Value> {
    let on_rejected = cx.args.first().unwrap_or_undefined();
    invoke_then(cx.vm, &cx.this, Value::Undefined, on_rejected)
}

pub fn finally(cx: CallContext) -> Result<Value, Value> {
    let on_finally = cx.args.first().unwrap_or_undefined();
    finally_with(cx.vm, &cx.this, on_finally)
}

pub fn resolve(cx: CallContext) -> Result<Value, Value> {
    let value = cx.args.first().unwrap_or_undefined();
    Pledge::resolve(cx.vm, value).map(Value::from)
}

pub fn reject(cx: CallContext) -> Result<Value, Value> {
    let reason = cx.args.first().unwrap_or_undefined();
    Pledge::reject(cx.vm, reason).map(Value::from)
}

/// Looks up `then` on `receiver` and calls it, so subclass-like thenables keep their own `then`.
fn invoke_then(vm: &mut Vm, receiver: &Value, on_fulfilled: Value, on_rejected: Value) -> Result<Value, Value> {
    let then = receiver.get_property(vm, "then")?;
    then.apply(vm, receiver.clone(), vec![on_fulfilled, on_rejected])
}

fn finally_with(vm: &mut Vm, receiver: &Value, on_finally: Value) -> Result<Value, Value> {
    if !matches!(receiver, Value::Object(_)) {
        throw!(TypeError, "Pledge.prototype.finally called on non-object {}", receiver);
    }

    let (on_fulfilled, on_rejected) = finally_handlers(on_finally);
    invoke_then(vm, receiver, on_fulfilled, on_rejected)
}

/// The `(onFulfilled, onRejected)` pair `finally` hands to `then`. A non-callable `on_finally` is
/// passed as both, which `then` ignores.
pub(crate) fn finally_handlers(on_finally: Value) -> (Value, Value) {
    if !on_finally.is_callable() {
        return (on_finally.clone(), on_finally);
    }

    let then_finally = {
        let on_finally = on_finally.clone();
        Function::closure("", move |cx| {
            let value = cx.args.first().unwrap_or_undefined();
            let result = on_finally.apply(cx.vm, Value::Undefined, Vec::new())?;
            let pledge = Value::from(Pledge::resolve(cx.vm, result)?);
            let value_thunk = Function::closure("", move |_| Ok(value.clone()));
            invoke_then(cx.vm, &pledge, Value::object(value_thunk), Value::Undefined)
        })
    };

    let catch_finally = Function::closure("", move |cx| {
        let reason = cx.args.first().unwrap_or_undefined();
        let result = on_finally.apply(cx.vm, Value::Undefined, Vec::new())?;
        let pledge = Value::from(Pledge::resolve(cx.vm, result)?);
        let thrower = Function::closure("", move |_| Err(reason.clone()));
        invoke_then(cx.vm, &pledge, Value::object(thrower), Value::Undefined)
    });

    (Value::object(then_finally), Value::object(catch_finally))
}
