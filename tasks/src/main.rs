//! Interactive terminal for the task list.
//!
//! Reads one command per line from stdin. Logs go to stderr so they never mix
//! with the list output.

use std::io::Write;
use std::sync::Arc;
use tasklist_core::environment::{HeadlessPrompter, Prompter};
use tasks::terminal::{self, Command, CommandError, LineInput, Reply, Session, TerminalPrompter};
use tasks::{Config, TaskEnvironment, TaskListStore, TaskState};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(?config, "starting task list");

    let input = LineInput::stdin();
    let prompter: Arc<dyn Prompter> = if config.headless {
        Arc::new(HeadlessPrompter)
    } else {
        Arc::new(TerminalPrompter::new(input.clone()))
    };
    let store = TaskListStore::with_state(
        TaskState::new(),
        TaskEnvironment::production(prompter),
        config.store_config(),
    );

    let mut changes = store.subscribe();
    tokio::spawn(async move {
        while let Some(tasks) = changes.next().await {
            debug!(count = tasks.len(), done = tasks.done_count(), "task list changed");
        }
    });

    let session = Session::new(store.clone());
    println!("{}\n", terminal::HELP);
    println!("{}", terminal::render_header(store.task_count().await));

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = input.next_line().await else {
            break;
        };

        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(CommandError::Empty) => continue,
            Err(error) => {
                println!("{error}. Type `help` for the command list.");
                continue;
            },
        };

        match session.execute(command).await? {
            Reply::Text(text) => println!("{text}"),
            Reply::Quit => break,
        }
    }

    if let Err(error) = store.shutdown().await {
        warn!(%error, "shutdown did not complete cleanly");
    }
    info!("bye");
    Ok(())
}
