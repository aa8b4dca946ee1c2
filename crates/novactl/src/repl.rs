//! Interactive chat loop.
//!
//! One orchestrator instance lives for the whole session, so the flow
//! pointer survives across turns. An empty first turn triggers the
//! personalized greeting.

use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

use nova_core::Orchestrator;

use crate::output;

pub fn run(orch: &mut Orchestrator, user: i64) -> Result<()> {
    println!(
        "{}",
        style("NOVA chat - type 'exit' to quit, empty line to (re)start the flow").dim()
    );

    // Open the session with the greeting.
    let outcome = orch.process(user, "");
    output::render_outcome(&outcome);

    let stdin = io::stdin();
    loop {
        print!("{} ", style("you>").cyan().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let text = line.trim();
        if matches!(text, "exit" | "quit" | "bye") {
            println!("{}", style("Take care! See you next time.").dim());
            break;
        }

        let outcome = orch.process(user, text);
        output::render_outcome(&outcome);
    }

    Ok(())
}
