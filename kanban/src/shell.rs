//! Line-oriented command shell over a [`TaskBoard`].
//!
//! Parsing ([`parse_command`]) is pure; [`Shell::execute`] runs a command
//! against the board and returns the text to print. Task ids may be given as
//! any unique prefix.

use std::fmt::Write as _;

use kanban_proto::{NewTask, TaskId, TaskPatch, TaskPriority, TaskStatus, TaskValidationError};

use crate::board::{BoardView, Direction, Sleeper, TaskBoard, TaskFilter};
use crate::store::TaskStore;

/// Characters of an id shown in listings.
const SHORT_ID_LEN: usize = 8;

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board using the active filter.
    List,
    /// Refetch the task list.
    Reload,
    /// Create a task.
    Add(NewTask),
    /// Rename a task.
    Rename(String, String),
    /// Replace a task's description.
    Describe(String, String),
    /// Change a task's priority.
    Prioritize(String, TaskPriority),
    /// Move a task to a column.
    Move(String, TaskStatus),
    /// Move a task one column over.
    Shift(String, Direction),
    /// Delete a task.
    Remove(String),
    /// Revert the last move.
    Undo,
    /// Drop the pending undo.
    Dismiss,
    /// Set the title search (empty clears it).
    Search(String),
    /// Set or clear the priority filter.
    Filter(Option<TaskPriority>),
    /// Clear the error banner.
    ClearError,
    /// Show usage.
    Help,
    /// Exit the shell.
    Quit,
}

/// Errors raised while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Nothing was typed.
    #[error("empty command")]
    Empty,
    /// The first word is not a command.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),
    /// A required argument is missing.
    #[error("usage: {0}")]
    Usage(&'static str),
    /// A status or priority argument was not recognised.
    #[error(transparent)]
    Invalid(#[from] TaskValidationError),
}

/// Usage summary printed by `help`.
pub const HELP: &str = "\
commands:
  ls                         show the board
  reload                     refetch tasks
  add [-p PRIORITY] TITLE [-- DESCRIPTION]
  rename ID TITLE            change a title
  describe ID TEXT           change a description
  prio ID PRIORITY           change a priority (low, medium, high)
  mv ID STATUS               move (todo, in-progress, done)
  left ID | right ID         move one column over
  rm ID                      delete
  undo                       revert the last move
  dismiss                    forget the last move
  search [TEXT]              filter titles (no text clears)
  filter PRIORITY|all        filter by priority
  clear                      dismiss the error banner
  help | quit";

/// Splits `rest` into the first word and the remainder.
fn split_word(rest: &str) -> (&str, &str) {
    let rest = rest.trim_start();
    rest.split_once(char::is_whitespace)
        .map_or((rest, ""), |(word, tail)| (word, tail.trim()))
}

fn id_and_text(rest: &str, usage: &'static str) -> Result<(String, String), ParseError> {
    let (id, text) = split_word(rest);
    if id.is_empty() || text.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok((id.to_string(), text.to_string()))
}

fn single_id(rest: &str, usage: &'static str) -> Result<String, ParseError> {
    let (id, _) = split_word(rest);
    if id.is_empty() {
        return Err(ParseError::Usage(usage));
    }
    Ok(id.to_string())
}

fn parse_add(rest: &str) -> Result<NewTask, ParseError> {
    const USAGE: &str = "add [-p PRIORITY] TITLE [-- DESCRIPTION]";
    let (priority, rest) = match split_word(rest) {
        ("-p", tail) => {
            let (priority, tail) = split_word(tail);
            (priority.parse::<TaskPriority>()?, tail)
        }
        _ => (TaskPriority::default(), rest.trim()),
    };
    let (title, description) = rest
        .split_once("--")
        .map_or((rest, ""), |(title, description)| {
            (title.trim(), description.trim())
        });
    if title.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(NewTask::new(title, description, priority))
}

/// Parses one input line.
///
/// # Errors
///
/// Returns [`ParseError`] for empty input, unknown commands, missing
/// arguments or unrecognised statuses and priorities.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let (word, rest) = split_word(line);
    match word {
        "" => Err(ParseError::Empty),
        "ls" | "list" => Ok(Command::List),
        "reload" => Ok(Command::Reload),
        "add" => parse_add(rest).map(Command::Add),
        "rename" => {
            let (id, title) = id_and_text(rest, "rename ID TITLE")?;
            Ok(Command::Rename(id, title))
        }
        "describe" => {
            let (id, text) = id_and_text(rest, "describe ID TEXT")?;
            Ok(Command::Describe(id, text))
        }
        "prio" => {
            let (id, priority) = id_and_text(rest, "prio ID PRIORITY")?;
            Ok(Command::Prioritize(id, priority.parse()?))
        }
        "mv" | "move" => {
            let (id, status) = id_and_text(rest, "mv ID STATUS")?;
            Ok(Command::Move(id, status.parse()?))
        }
        "left" => Ok(Command::Shift(single_id(rest, "left ID")?, Direction::Left)),
        "right" => Ok(Command::Shift(
            single_id(rest, "right ID")?,
            Direction::Right,
        )),
        "rm" | "delete" => Ok(Command::Remove(single_id(rest, "rm ID")?)),
        "undo" => Ok(Command::Undo),
        "dismiss" => Ok(Command::Dismiss),
        "search" => Ok(Command::Search(rest.to_string())),
        "filter" => match rest {
            "" => Err(ParseError::Usage("filter PRIORITY|all")),
            "all" => Ok(Command::Filter(None)),
            priority => Ok(Command::Filter(Some(priority.parse()?))),
        },
        "clear" => Ok(Command::ClearError),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

/// Result of executing a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text and keep going.
    Print(String),
    /// Leave the shell.
    Quit,
}

/// Interactive driver holding the board and the active view filter.
pub struct Shell<S, Z> {
    board: TaskBoard<S, Z>,
    filter: TaskFilter,
}

impl<S: TaskStore, Z: Sleeper> Shell<S, Z> {
    /// Wraps a board with an unfiltered view.
    #[must_use]
    pub fn new(board: TaskBoard<S, Z>) -> Self {
        Self {
            board,
            filter: TaskFilter::all(),
        }
    }

    /// The underlying board.
    #[must_use]
    pub const fn board(&self) -> &TaskBoard<S, Z> {
        &self.board
    }

    /// The active view filter.
    #[must_use]
    pub const fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    /// Resolves a full id or unique id prefix against the local list.
    fn resolve(&self, prefix: &str) -> Result<TaskId, String> {
        let tasks = self.board.tasks();
        if let Some(exact) = tasks.iter().find(|t| t.id.as_str() == prefix) {
            return Ok(exact.id.clone());
        }
        let mut matches = tasks.iter().filter(|t| t.id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id.clone()),
            (None, _) => Err(format!("no task matches `{prefix}`")),
            (Some(_), Some(_)) => Err(format!("`{prefix}` matches several tasks")),
        }
    }

    /// Runs `command` and returns what to print.
    pub async fn execute(&mut self, command: Command) -> Outcome {
        let text = match command {
            Command::Quit => return Outcome::Quit,
            Command::Help => HELP.to_string(),
            Command::List => self.render(),
            Command::Reload => {
                self.board.load().await;
                self.render()
            }
            Command::Add(new) => {
                let title = new.title.clone();
                let ok = self.board.create(new).await;
                self.report(ok, format!("created \"{title}\""))
            }
            Command::Rename(id, title) => {
                let patch = TaskPatch {
                    title: Some(title),
                    ..TaskPatch::default()
                };
                self.patch(&id, patch, "renamed").await
            }
            Command::Describe(id, description) => {
                let patch = TaskPatch {
                    description: Some(description),
                    ..TaskPatch::default()
                };
                self.patch(&id, patch, "description updated").await
            }
            Command::Prioritize(id, priority) => {
                let patch = TaskPatch {
                    priority: Some(priority),
                    ..TaskPatch::default()
                };
                self.patch(&id, patch, "priority updated").await
            }
            Command::Move(id, status) => match self.resolve(&id) {
                Ok(id) => {
                    let ok = self.board.move_task(&id, status).await;
                    self.report_move(ok)
                }
                Err(e) => e,
            },
            Command::Shift(id, direction) => match self.resolve(&id) {
                Ok(id) => match self.board.shift_target(&id, direction) {
                    Some(status) => {
                        let ok = self.board.move_task(&id, status).await;
                        self.report_move(ok)
                    }
                    None => "already in the edge column".to_string(),
                },
                Err(e) => e,
            },
            Command::Remove(id) => match self.resolve(&id) {
                Ok(id) => {
                    let ok = self.board.remove(&id).await;
                    self.report(ok, "deleted".to_string())
                }
                Err(e) => e,
            },
            Command::Undo => {
                if self.board.undo_action().is_none() {
                    "nothing to undo".to_string()
                } else {
                    let ok = self.board.undo().await;
                    self.report(ok, "move undone".to_string())
                }
            }
            Command::Dismiss => {
                if self.board.dismiss_undo() {
                    "undo dismissed".to_string()
                } else {
                    "nothing to dismiss".to_string()
                }
            }
            Command::Search(query) => {
                self.filter.query = query;
                self.render()
            }
            Command::Filter(priority) => {
                self.filter.priority = priority;
                self.render()
            }
            Command::ClearError => {
                self.board.clear_error();
                "error cleared".to_string()
            }
        };
        Outcome::Print(text)
    }

    async fn patch(&self, id: &str, patch: TaskPatch, done: &str) -> String {
        match self.resolve(id) {
            Ok(id) => {
                let ok = self.board.update(&id, patch, false).await;
                self.report(ok, done.to_string())
            }
            Err(e) => e,
        }
    }

    fn report(&self, ok: bool, success: String) -> String {
        if ok {
            success
        } else {
            self.board
                .error()
                .map_or_else(|| "nothing changed".to_string(), |e| format!("error: {e}"))
        }
    }

    fn report_move(&self, ok: bool) -> String {
        let window = self.board_undo_hint();
        self.report(ok, format!("moved ({window})"))
    }

    fn board_undo_hint(&self) -> String {
        self.board.undo_action().map_or_else(
            || "no undo".to_string(),
            |action| format!("`undo` puts it back in {}", action.to_status),
        )
    }

    /// Renders the filtered board, the error banner and the undo hint.
    #[must_use]
    pub fn render(&self) -> String {
        let view = self.board.view(&self.filter);
        let mut out = render_view(&view);
        if let Some(error) = self.board.error() {
            let _ = write!(out, "\n! {error} (`reload` to retry, `clear` to dismiss)");
        }
        if let Some(action) = self.board.undo_action() {
            let _ = write!(
                out,
                "\n~ moved {} to {} (`undo` to revert)",
                short_id(&action.task_id),
                action.from_status
            );
        }
        out
    }
}

fn short_id(id: &TaskId) -> &str {
    let s = id.as_str();
    s.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(s, |(end, _)| &s[..end])
}

/// Renders the three columns as plain text.
#[must_use]
pub fn render_view(view: &BoardView) -> String {
    let mut out = String::new();
    for (i, status) in TaskStatus::ALL.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let column = view.column(status);
        let _ = writeln!(out, "[{status}] ({})", column.len());
        for task in column {
            let _ = writeln!(
                out,
                "  {:<8} {:<6} {}",
                short_id(&task.id),
                task.priority,
                task.title
            );
        }
    }
    out.trim_end().to_string()
}
