//! A tiny interactive command interpreter.
//!
//! Each input line is either a built-in directive (`chdir`, `history`, `limit`),
//! a single external program, or a two-stage pipeline whose stages are connected
//! through a pre-created named pipe (FIFO) supplied at startup.
//!
//! The main entry point is [`Interpreter`], which owns the session state and runs
//! the read-execute loop over any [`LineSource`]. The launchers in [`external`] and
//! [`pipeline`] can also be used on their own.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod limits;
pub mod pipeline;
pub mod signals;

/// Convenient re-exports of the interactive command runner and its collaborators.
pub use error::ShellError;
pub use interpreter::Interpreter;
pub use io_adapters::{Line, LineSource};

/// Prompt marker printed before every read.
pub const PROMPT: &str = ">>> ";
