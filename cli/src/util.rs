use owo_colors::OwoColorize;
use pledge_vm::Vm;
use pledge_vm::params::VmParams;
use pledge_vm::pledge::Pledge;
use pledge_vm::value::function::Function;
use pledge_vm::value::{Value, ValueContext};

/// Parses a command line argument into a value. Numbers and the literals `undefined`, `null`,
/// `true` and `false` keep their type, anything else becomes a string.
pub fn parse_value(input: &str) -> Value {
    match input {
        "undefined" => Value::Undefined,
        "null" => Value::Null,
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => match input.parse::<f64>() {
            Ok(n) => Value::number(n),
            Err(_) => Value::string(input),
        },
    }
}

fn print_unhandled_rejection(_: &mut Vm, _: &Pledge, reason: &Value) {
    eprintln!("{}", format!("Uncaught (in pledge) {reason}").red());
}

fn print_task_exception(_: &mut Vm, exception: Value) {
    eprintln!("{}", format!("Uncaught {exception}").red());
}

pub fn new_vm() -> Vm {
    Vm::new(
        VmParams::new()
            .set_unhandled_rejection_callback(print_unhandled_rejection)
            .set_unhandled_task_exception_callback(print_task_exception),
    )
}

/// A function that prints its first argument to stdout and returns `undefined`.
pub fn log() -> Value {
    Value::object(Function::closure("log", |cx| {
        println!("{}", cx.args.first().unwrap_or_undefined());
        Ok(Value::Undefined)
    }))
}

/// Like [`log`], but prints to stderr.
pub fn error() -> Value {
    Value::object(Function::closure("error", |cx| {
        eprintln!("{}", cx.args.first().unwrap_or_undefined().red());
        Ok(Value::Undefined)
    }))
}

/// Turns a failure that escaped the pledge machinery into an `anyhow` error.
pub fn into_anyhow(value: Value) -> anyhow::Error {
    anyhow::anyhow!("Uncaught {value}")
}
