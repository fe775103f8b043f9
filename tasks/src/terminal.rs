//! Terminal front end: command parsing, rendering and a stdin prompter.
//!
//! Commands and confirmation answers are read from one shared line source, so
//! a removal prompt consumes the line typed right after the `remove` command.

use crate::store::TaskListStore;
use crate::types::{EditTask, Rejection, TaskError, TaskId, TaskList};
use futures::future::BoxFuture;
use std::fmt::Write as _;
use std::io::BufRead;
use std::sync::Arc;
use tasklist_core::environment::{Alert, Confirmation, Decision, Prompter};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Help text listing every command
pub const HELP: &str = "\
Commands:
  add <title>          add a task
  toggle <id>          mark a task done or not done
  edit <id> <title>    rename a task
  remove <id>          remove a task (asks first)
  list                 show all tasks
  count                show how many tasks there are
  json                 print the tasks as JSON
  help                 show this help
  quit                 leave";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add <title>`
    Add(String),
    /// `toggle <id>`
    Toggle(TaskId),
    /// `edit <id> <title>`
    Edit(EditTask),
    /// `remove <id>`
    Remove(TaskId),
    /// `list`
    List,
    /// `count`
    Count,
    /// `json`
    Json,
    /// `help`
    Help,
    /// `quit`
    Quit,
}

/// Why an input line is not a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    #[error("empty input")]
    Empty,

    /// First word is not a known command
    #[error("unknown command `{0}`")]
    Unknown(String),

    /// The command needs a task id
    #[error("`{0}` needs a task id")]
    MissingId(&'static str),

    /// The id is not a number
    #[error("`{0}` is not a task id")]
    InvalidId(String),
}

impl Command {
    /// Parse one input line
    ///
    /// Titles are taken verbatim after the single space that follows the
    /// command word (or the id, for `edit`).
    ///
    /// # Errors
    ///
    /// Returns a [`CommandError`] describing why the line is not a command.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_start();
        let (verb, rest) = line.split_once(' ').unwrap_or((line.trim_end(), ""));

        match verb {
            "" => Err(CommandError::Empty),
            "add" | "a" => Ok(Self::Add(rest.to_string())),
            "toggle" | "done" | "t" => parse_id("toggle", rest).map(Self::Toggle),
            "edit" | "e" => {
                let (id, title) = rest.split_once(' ').unwrap_or((rest, ""));
                let task_id = parse_id("edit", id)?;
                Ok(Self::Edit(EditTask {
                    task_id,
                    new_title: title.to_string(),
                }))
            },
            "remove" | "rm" | "r" => parse_id("remove", rest).map(Self::Remove),
            "list" | "ls" | "l" => Ok(Self::List),
            "count" | "c" => Ok(Self::Count),
            "json" => Ok(Self::Json),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn parse_id(command: &'static str, text: &str) -> Result<TaskId, CommandError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CommandError::MissingId(command));
    }
    text.parse()
        .map_err(|_| CommandError::InvalidId(text.to_string()))
}

/// Interpret an answer to a `[y/N]` question; anything but yes means no
#[must_use]
pub fn parse_decision(answer: &str) -> Decision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Decision::Confirm,
        _ => Decision::Cancel,
    }
}

/// "You have N tasks" line shown above the list
#[must_use]
pub fn render_header(count: usize) -> String {
    if count == 1 {
        "You have 1 task".to_string()
    } else {
        format!("You have {count} tasks")
    }
}

/// Header followed by one line per task
#[must_use]
pub fn render_list(tasks: &TaskList) -> String {
    let mut out = render_header(tasks.len());
    for task in tasks {
        let mark = if task.done { 'x' } else { ' ' };
        let _ = write!(out, "\n  [{mark}] #{} {}", task.id, task.title);
    }
    out
}

/// Shared source of input lines
///
/// Clones read from the same source; each line goes to exactly one reader.
#[derive(Clone, Debug)]
pub struct LineInput {
    lines: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LineInput {
    /// Lines fed through the returned sender
    #[must_use]
    pub fn channel(buffer: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            tx,
            Self {
                lines: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Lines read from standard input on a dedicated thread
    #[must_use]
    pub fn stdin() -> Self {
        let (tx, input) = Self::channel(16);
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            break;
                        }
                    },
                    Err(error) => {
                        tracing::warn!(%error, "stopped reading stdin");
                        break;
                    },
                }
            }
        });
        input
    }

    /// Next line, or `None` at end of input
    pub async fn next_line(&self) -> Option<String> {
        self.lines.lock().await.recv().await
    }
}

/// Prompter that talks to the user on the terminal
///
/// Alerts are printed and dismissed at once. Confirmations print a `[y/N]`
/// question and wait for the next input line; end of input counts as "No".
#[derive(Clone, Debug)]
pub struct TerminalPrompter {
    input: LineInput,
}

impl TerminalPrompter {
    /// Prompter reading answers from `input`
    #[must_use]
    pub const fn new(input: LineInput) -> Self {
        Self { input }
    }
}

impl Prompter for TerminalPrompter {
    fn alert(&self, alert: Alert) -> BoxFuture<'static, ()> {
        println!("! {}\n  {}", alert.title, alert.message);
        Box::pin(async {})
    }

    fn confirm(&self, confirmation: Confirmation) -> BoxFuture<'static, Decision> {
        let input = self.input.clone();
        Box::pin(async move {
            println!(
                "? {}\n  {} [y/N] ({} / {})",
                confirmation.title,
                confirmation.message,
                confirmation.confirm_label,
                confirmation.cancel_label
            );
            let answer = input.next_line().await.unwrap_or_default();
            parse_decision(&answer)
        })
    }
}

/// What the terminal should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this text and read the next command
    Text(String),
    /// Leave the loop
    Quit,
}

/// Runs parsed commands against a [`TaskListStore`]
#[derive(Clone, Debug)]
pub struct Session {
    store: TaskListStore,
}

impl Session {
    /// Session over `store`
    #[must_use]
    pub const fn new(store: TaskListStore) -> Self {
        Self { store }
    }

    /// Execute one command
    ///
    /// A removal waits until the user has answered the confirmation.
    ///
    /// # Errors
    ///
    /// Fails if the store is shutting down.
    pub async fn execute(&self, command: Command) -> anyhow::Result<Reply> {
        let text = match command {
            Command::Add(title) => match self.store.add_task(title).await {
                Ok(tasks) => render_list(&tasks),
                // the prompter has already shown the alert
                Err(TaskError::Rejected(Rejection::DuplicateTitle { .. })) => {
                    render_list(&self.store.tasks().await)
                },
                Err(TaskError::Rejected(Rejection::EmptyTitle)) => {
                    "Nothing added: the title is empty".to_string()
                },
                Err(TaskError::Rejected(Rejection::IdsExhausted)) => {
                    "Nothing added: no task ids left".to_string()
                },
                Err(error @ TaskError::Store(_)) => return Err(error.into()),
            },
            Command::Toggle(id) => {
                let tasks = self.store.toggle_task_done(id).await?;
                Self::render_if_known(&tasks, id)
            },
            Command::Edit(edit) => {
                let id = edit.task_id;
                let tasks = self.store.edit_task(edit).await?;
                Self::render_if_known(&tasks, id)
            },
            Command::Remove(id) => {
                let mut request = self.store.remove_task(id).await?;
                request.answered().await;
                render_list(&self.store.tasks().await)
            },
            Command::List => render_list(&self.store.tasks().await),
            Command::Count => render_header(self.store.task_count().await),
            Command::Json => serde_json::to_string_pretty(&self.store.tasks().await)?,
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }

    fn render_if_known(tasks: &TaskList, id: TaskId) -> String {
        if tasks.get(id).is_some() {
            render_list(tasks)
        } else {
            format!("No task #{id}")
        }
    }
}
