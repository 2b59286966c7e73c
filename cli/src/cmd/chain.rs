use std::time::Instant;

use anyhow::Context;
use clap::ArgMatches;
use pledge_vm::pledge::Pledge;
use pledge_vm::value::function::Function;
use pledge_vm::value::{Value, ValueContext};

use crate::util;

fn add_one() -> Value {
    Value::object(Function::closure("addOne", |cx| match cx.args.first().unwrap_or_undefined() {
        Value::Number(n) => Ok(Value::number(n + 1.0)),
        other => Err(Value::from(format!("{other} is not a number"))),
    }))
}

pub fn chain(args: &ArgMatches) -> anyhow::Result<()> {
    let depth = *args.get_one::<usize>("depth").context("Missing depth")?;
    let start = args
        .get_one::<String>("start")
        .map(|s| util::parse_value(s))
        .unwrap_or(Value::number(0.0));
    let before = args.get_flag("timing").then(Instant::now);

    let mut vm = util::new_vm();
    let mut pledge = Pledge::resolve(&mut vm, start).map_err(util::into_anyhow)?;
    for _ in 0..depth {
        pledge = pledge
            .then(&mut vm, add_one(), Value::Undefined)
            .map_err(util::into_anyhow)?;
    }

    let processed = vm.process_jobs();
    println!("{}", pledge);

    if let Some(before) = before {
        println!("{processed} jobs in {:?}", before.elapsed());
    }

    Ok(())
}
