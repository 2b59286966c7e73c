use std::backtrace::{Backtrace, BacktraceStatus};

use anyhow::bail;
use clap::{Arg, ArgAction, Command, value_parser};
use owo_colors::OwoColorize;

mod cmd;
mod util;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let depth = Arg::new("depth")
        .short('n')
        .long("depth")
        .help("Number of steps")
        .value_parser(value_parser!(usize))
        .default_value("1000");

    let timing = Arg::new("timing")
        .short('t')
        .long("timing")
        .help("Print how many jobs ran and how long it took")
        .action(ArgAction::SetTrue);

    let app = Command::new("pledge")
        .about("Run pledges on a deterministic microtask queue")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("demo")
                .about("Run the then/then/catch/finally demo pipeline")
                .arg(
                    Arg::new("resolve")
                        .long("resolve")
                        .help("Resolve the root pledge with this value")
                        .conflicts_with("reject"),
                )
                .arg(
                    Arg::new("reject")
                        .long("reject")
                        .help("Reject the root pledge with this reason"),
                )
                .arg(
                    Arg::new("late")
                        .long("late")
                        .help("Attach another handler after the queue has drained")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("chain")
                .about("Chain `then(v => v + 1)` steps and print the final pledge")
                .arg(depth.clone())
                .arg(Arg::new("start").long("start").help("Starting value"))
                .arg(timing.clone()),
        )
        .subcommand(
            Command::new("adopt")
                .about("Resolve a pledge with nested thenables and print what it adopted")
                .arg(depth)
                .arg(Arg::new("value").long("value").help("Innermost value"))
                .arg(timing),
        );

    std::panic::set_hook(Box::new(|info| {
        eprintln!("{}\n", "pledge has unexpectedly panicked! this is a bug!".red().bold());

        eprintln!("{info}");

        let backtrace = Backtrace::capture();
        match backtrace.status() {
            BacktraceStatus::Captured => {
                eprintln!("--- begin of backtrace ---");
                eprintln!("{backtrace}");
            }
            BacktraceStatus::Disabled => {
                eprintln!("set RUST_BACKTRACE=1 to print a backtrace");
            }
            BacktraceStatus::Unsupported => {
                eprintln!("backtraces are not supported on this platform");
            }
            _ => {
                eprintln!("backtraces are not available");
            }
        }
    }));

    let matches = app.get_matches();
    match matches.subcommand() {
        Some(("demo", args)) => cmd::demo(args),
        Some(("chain", args)) => cmd::chain(args),
        Some(("adopt", args)) => cmd::adopt(args),
        _ => bail!("Unimplemented command"),
    }
}
