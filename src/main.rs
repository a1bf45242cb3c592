//! modal-keys: feed key notation from stdin through a remapping session
//!
//! Each stdin line is parsed as Vim key notation (`d2w`, `<leader>w`,
//! `ijj<Esc>`) and sent to the session; resolved actions, commands and
//! status messages are printed to stdout.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use modal_keys::cli::{CliArgs, StartupConfig};
use modal_keys::executor::{ActionInvocation, CommandExecutor};
use modal_keys::keymap::{display_keys, parse_sequence, DEFAULT_LEADER};
use modal_keys::remap::ActionError;
use modal_keys::runtime::SessionHandle;
use modal_keys::session::Session;
use modal_keys::task_queue::TaskQueue;

const SESSION_QUEUE: &str = "stdin";

/// Prints everything it is asked to execute
#[derive(Debug, Default)]
struct PrintExecutor;

impl CommandExecutor for PrintExecutor {
    fn execute_action(&mut self, invocation: &ActionInvocation) -> Result<(), ActionError> {
        let mut line = format!("[{}] {}", invocation.mode, invocation.action);
        if invocation.has_count {
            line.push_str(&format!(" x{}", invocation.count));
        }
        if let Some(register) = invocation.register {
            line.push_str(&format!(" \"{}", register));
        }
        if let Some(character) = invocation.captures.character {
            line.push_str(&format!(" '{}'", character));
        }
        if let Some(range) = &invocation.captures.range {
            line.push_str(&format!(" over {}", range.action));
        }
        line.push_str(&format!("  ({})", display_keys(&invocation.keys)));
        println!("{}", line);
        Ok(())
    }

    fn execute_named_command(
        &mut self,
        name: &str,
        args: &serde_json::Value,
    ) -> Result<(), ActionError> {
        if args.is_null() {
            println!("command {}", name);
        } else {
            println!("command {} {}", name, args);
        }
        Ok(())
    }

    fn execute_line_command(&mut self, command: &str) -> Result<(), ActionError> {
        println!(":{}", command);
        Ok(())
    }

    fn show_status(&mut self, message: &str) {
        println!("status: {}", message);
    }
}

fn main() -> Result<()> {
    modal_keys::tracing::init();

    let startup = CliArgs::parse().into_config()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the tokio runtime")?;

    runtime.block_on(run(startup))
}

async fn run(startup: StartupConfig) -> Result<()> {
    let (remapper, diagnostics) = startup.remap.remapper();
    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic);
    }

    let leader = startup.remap.leader_key().unwrap_or(DEFAULT_LEADER);
    let timeout = remapper.settings().timeout;
    let mode = startup.mode;

    let queue = TaskQueue::from_current()?;
    let session = SessionHandle::spawn(queue, SESSION_QUEUE, move |scheduler| {
        Session::new(PrintExecutor, scheduler)
            .with_remapper(remapper)
            .with_mode(mode)
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let keys = match parse_sequence(line.trim_end(), leader) {
            Ok(keys) => keys,
            Err(e) => {
                eprintln!("{}: {}", line, e);
                continue;
            }
        };
        tracing::debug!(keys = %display_keys(&keys), "keys from stdin");
        session.send_keys(&keys);
        session.wait_idle().await;
    }

    // let a buffered sequence run into its timeout before exiting
    tokio::time::sleep(timeout + Duration::from_millis(50)).await;
    session.wait_idle().await;

    let pending = session.with_session(|s| display_keys(s.pending_keys()));
    if !pending.is_empty() {
        tracing::warn!(keys = %pending, "exiting with buffered keys");
    }
    Ok(())
}
