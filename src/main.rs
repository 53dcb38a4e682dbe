use std::process::ExitCode;

use mal_trampoline::{
    eval::set_max_eval_depth,
    repl::{self, Args},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Log filter is read from `MAL_LOG` (e.g. `MAL_LOG=debug`); only warnings otherwise
fn init_logging() {
    let filter = EnvFilter::try_from_env("MAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Stack for the interpreter thread, sized for [`REPL_MAX_EVAL_DEPTH`] levels of nesting
const REPL_STACK_SIZE: usize = 256 * 1024 * 1024;
const REPL_MAX_EVAL_DEPTH: usize = 10_000;

fn run_repl() -> ExitCode {
    set_max_eval_depth(REPL_MAX_EVAL_DEPTH);
    match repl::run(Args::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let interpreter = std::thread::Builder::new()
        .name("mal".to_string())
        .stack_size(REPL_STACK_SIZE)
        .spawn(run_repl);
    match interpreter.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(err) => {
            error!(%err, "could not start the interpreter thread");
            ExitCode::FAILURE
        }
    }
}
