use std::io::{self, BufRead, Write};

use anyhow::Result;

use homequote_core::config::{AppConfig, LoadOptions};
use homequote_core::domain::session::SessionId;
use homequote_db::fixtures;

use crate::init_logging;

pub async fn run(durable: bool) -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let runtime = super::build_runtime(&config, durable).await?;
    let business = fixtures::demo_business_id();

    println!("homequote chat - demo catalog, {} sessions.", if durable { "durable" } else { "in-memory" });
    println!("Tell me what you need a quote for. Type `exit` to leave.\n");

    let stdin = io::stdin();
    let mut session_id: Option<SessionId> = None;

    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match runtime.handle_message(session_id.as_ref(), &business, line).await {
            Ok(reply) => {
                session_id = Some(reply.session_id.clone());
                println!("bot> {}\n", reply.reply);
            }
            Err(error) => {
                tracing::error!(error = %error, "turn failed");
                println!("bot> Sorry, something went wrong. Please try again.\n");
            }
        }
    }

    Ok(())
}
