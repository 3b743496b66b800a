use anyhow::Context;
use argh::FromArgs;
use log::{error, info};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process;
use tiny_shell::env::Environment;
use tiny_shell::io_adapters::{Editor, Reader};
use tiny_shell::signals::InterruptController;
use tiny_shell::{Interpreter, LineSource};

#[derive(FromArgs)]
/// A tiny interactive command interpreter.
struct Args {
    #[argh(positional)]
    /// named pipe used to connect the two stages of `a | b`.
    channel: Option<PathBuf>,

    #[argh(switch)]
    /// read lines without the interactive editor, even on a terminal.
    plain: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let controller = InterruptController::install().context("failed to install signal handlers")?;
    let mut input: Box<dyn LineSource> = if io::stdin().is_terminal() && !args.plain {
        Box::new(Editor::new()?)
    } else {
        Box::new(Reader::new(io::stdin().lock(), io::stdout()))
    };

    if let Some(channel) = &args.channel {
        info!("pipeline channel {}", channel.display());
    }
    let mut shell = Interpreter::new(Environment::new(args.channel));
    match shell.repl(input.as_mut(), &controller, &mut io::stdout()) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("session ended: {}", e);
            println!("{}", e);
            process::exit(1);
        }
    }
}
