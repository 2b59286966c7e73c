use std::time::Instant;

use anyhow::Context;
use clap::ArgMatches;
use pledge_vm::pledge::Pledge;
use pledge_vm::value::function::Function;
use pledge_vm::value::object::NamedObject;
use pledge_vm::value::{Value, ValueContext};

use crate::util;

/// Wraps `value` in `depth` layers of objects whose `then` resolves with the next layer.
fn nest(value: Value, depth: usize) -> Value {
    (0..depth).fold(value, |inner, _| {
        let then = Function::closure("then", move |cx| {
            let resolve = cx.args.first().unwrap_or_undefined();
            resolve.apply(cx.vm, Value::Undefined, vec![inner.clone()])
        });
        Value::object(NamedObject::new().with_property("then", Value::object(then)))
    })
}

pub fn adopt(args: &ArgMatches) -> anyhow::Result<()> {
    let depth = *args.get_one::<usize>("depth").context("Missing depth")?;
    let value = args
        .get_one::<String>("value")
        .map(|s| util::parse_value(s))
        .unwrap_or(Value::number(42.0));
    let before = args.get_flag("timing").then(Instant::now);

    let mut vm = util::new_vm();
    let pledge = Pledge::resolve(&mut vm, nest(value, depth)).map_err(util::into_anyhow)?;
    let processed = vm.process_jobs();
    println!("{}", pledge);

    if let Some(before) = before {
        println!("{processed} jobs in {:?}", before.elapsed());
    }

    Ok(())
}
