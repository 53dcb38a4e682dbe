//! This module holds all functionality for the REPL (Read-Eval-Print-Loop).

use miette::{GraphicalReportHandler, GraphicalTheme};
use rustyline::{error::ReadlineError, DefaultEditor};
use tracing::{debug, info};

use crate::{
    core::bootstrap,
    env::Env,
    eval::eval,
    printer::pr_str,
    reader::read_all,
    types::{MalError, MalType},
};

const PROMPT: &str = "user> ";

#[derive(Debug, derive_more::Display, derive_more::From)]
/// Failures that stop the REPL itself, as opposed to a single form
pub enum ReplError {
    #[display(fmt = "could not read input: {}", _0)]
    Readline(ReadlineError),
    #[display(fmt = "could not build the root environment: {}", _0)]
    Bootstrap(MalError),
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Command line: an optional script followed by the arguments it sees as `*ARGV*`
pub struct Args {
    pub script: Option<String>,
    pub argv: Vec<String>,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter();
        let Some(script) = args.next() else {
            return Args::default();
        };
        Args {
            script: Some(script),
            argv: args.collect(),
        }
    }

    pub fn from_env() -> Self {
        Args::parse(std::env::args().skip(1))
    }
}

/// Render an error for the terminal
///
/// Syntax errors come with the offending source and a label under the token.
pub fn report(err: &MalError, color: bool) -> String {
    if let MalError::Thrown(value) = err {
        return format!("Uncaught exception: {}", pr_str(value, true));
    }
    let theme = if color {
        GraphicalTheme::unicode()
    } else {
        GraphicalTheme::unicode_nocolor()
    };
    let mut out = String::new();
    match GraphicalReportHandler::new_themed(theme).render_report(&mut out, err) {
        Ok(()) => out,
        Err(_) => err.to_string(),
    }
}

/// Read every form on the line and evaluate them in order, printing each result
pub fn rep(line: &str, env: &Env) -> Result<Vec<String>, MalError> {
    read_all(line)?
        .into_iter()
        .map(|form| eval(form, env.clone()).map(|value| pr_str(&value, true)))
        .collect()
}

/// Load a script into the environment; its result is not printed
pub fn run_script(path: &str, env: &Env) -> Result<MalType, MalError> {
    info!(path, "loading script");
    let form = MalType::list(vec![MalType::symbol("load-file"), MalType::string(path)]);
    eval(form, env.clone())
}

/// Runs the repl, or the script given on the command line
pub fn run(args: Args) -> Result<(), ReplError> {
    let repl_env = bootstrap(args.argv)?;
    if let Some(script) = args.script {
        if let Err(err) = run_script(&script, &repl_env) {
            eprintln!("{}", report(&err, true));
        }
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;
    if let Ok(banner) = crate::rep(r#"(str "Mal [" *host-language* "]")"#, &repl_env) {
        println!("{}", banner.trim_matches('"'));
    }
    loop {
        let line = match rl.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        rl.add_history_entry(line.as_str())?;
        match rep(&line, &repl_env) {
            Ok(results) => results.iter().for_each(|res| println!("{res}")),
            Err(err) => {
                debug!(error = ?err, "form failed");
                eprintln!("{}", report(&err, true));
            }
        }
    }
    Ok(())
}
