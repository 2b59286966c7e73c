use clap::ArgMatches;
use pledge_vm::Vm;
use pledge_vm::pledge::Pledge;
use pledge_vm::value::function::Function;
use pledge_vm::value::{Value, ValueContext};

use crate::util;

#[derive(Debug, Clone)]
enum Outcome {
    Resolve(Value),
    Reject(Value),
    Pending,
}

/// `pledge.then(log, error).then(log).catch(error).finally(done)`
fn pipeline(vm: &mut Vm, pledge: &Pledge, done: Value) -> Result<Pledge, Value> {
    pledge
        .then(vm, util::log(), util::error())?
        .then(vm, util::log(), Value::Undefined)?
        .catch(vm, util::error())?
        .finally(vm, done)
}

pub fn demo(args: &ArgMatches) -> anyhow::Result<()> {
    let outcome = if let Some(value) = args.get_one::<String>("resolve") {
        Outcome::Resolve(util::parse_value(value))
    } else if let Some(reason) = args.get_one::<String>("reject") {
        Outcome::Reject(util::parse_value(reason))
    } else {
        Outcome::Pending
    };

    let mut vm = util::new_vm();

    let pledge = Pledge::with_executor(&mut vm, move |cx| {
        println!("==========");
        match &outcome {
            Outcome::Resolve(value) => {
                let resolve = cx.args.first().unwrap_or_undefined();
                resolve.apply(cx.vm, Value::Undefined, vec![value.clone()])
            }
            Outcome::Reject(reason) => {
                let reject = cx.args.get(1).unwrap_or_undefined();
                reject.apply(cx.vm, Value::Undefined, vec![reason.clone()])
            }
            Outcome::Pending => Ok(Value::Undefined),
        }
    })
    .map_err(util::into_anyhow)?;

    let done = Value::object(Function::closure("done", |_| {
        println!("done");
        Ok(Value::Undefined)
    }));

    let tail = pipeline(&mut vm, &pledge, done).map_err(util::into_anyhow)?;

    let processed = vm.process_jobs();
    tracing::debug!(processed, "first drain");

    if args.get_flag("late") {
        let late = Value::object(Function::closure("late", |_| {
            println!("123");
            Ok(Value::Undefined)
        }));
        pledge.then(&mut vm, late, Value::Undefined).map_err(util::into_anyhow)?;
        vm.process_jobs();
    }

    if tail.is_pending() {
        println!("{tail}");
    }

    Ok(())
}
