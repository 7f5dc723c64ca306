//! # nsc-cli — The `nsc` Command Line
//!
//! Thin handlers over `nsc-edit`. Each subcommand module defines its clap
//! arguments and a `run_*` function returning an exit code; `main` resolves
//! the configuration, evaluates the version gate once and dispatches.
//!
//! ```bash
//! nsc add operator --name O
//! nsc add account --name A
//! nsc add user --name u
//! nsc edit user --name u --tag a,b --allow-pubsub "orders.>" --payload 1Kib
//! nsc edit user --name u -i
//! ```
//!
//! Change-log lines and results go to stderr; `describe` and `env` print to
//! stdout.

pub mod add;
pub mod config;
pub mod context;
pub mod describe;
pub mod edit;
pub mod env;
pub mod keys;
pub mod prompt;
pub mod upgrade;

/// Print result lines on stderr.
pub fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        eprintln!("{}", line.as_ref());
    }
}
