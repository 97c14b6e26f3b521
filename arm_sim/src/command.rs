//! Text command surface.
//!
//! One command per line:
//!
//! ```text
//! stop <labels>       resume <labels>      get_pose <label>
//! stop_all            resume_all           list
//! ```
//!
//! Labels are separated by any run of commas and/or whitespace.

use crate::supervisor::Supervisor;
use arm_common::consts::{COMMAND_STATUS_OK, NOT_FOUND};
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;
use std::thread;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Command parsing errors. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop(Vec<String>),
    StopAll,
    Resume(Vec<String>),
    ResumeAll,
    /// Exactly one label is accepted; the count is checked on dispatch.
    GetPose(Vec<String>),
    List,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let labels = parse_labels(rest);
        match verb {
            "" => Err(CommandError::Empty),
            "stop" => Ok(Self::Stop(labels)),
            "stop_all" => Ok(Self::StopAll),
            "resume" => Ok(Self::Resume(labels)),
            "resume_all" => Ok(Self::ResumeAll),
            "get_pose" => Ok(Self::GetPose(labels)),
            "list" => Ok(Self::List),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split a label list on runs of commas and whitespace.
pub fn parse_labels(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of a dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Labels whose work status actually changed
    Changed(Vec<String>),
    /// Bulk command status
    Status(i16),
    Pose(String),
    NotFound,
    Rejected(&'static str),
    Labels(Vec<String>),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Changed(labels) | Self::Labels(labels) => write_label_list(f, labels),
            Self::Status(code) => write!(f, "{code}"),
            Self::Pose(pose) => f.write_str(pose),
            Self::NotFound => f.write_str(NOT_FOUND),
            Self::Rejected(reason) => f.write_str(reason),
        }
    }
}

fn write_label_list(f: &mut fmt::Formatter<'_>, labels: &[String]) -> fmt::Result {
    write!(f, "[")?;
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{label}'")?;
    }
    write!(f, "]")
}

/// Run a command against the supervisor.
pub fn dispatch(supervisor: &Supervisor, command: Command) -> Reply {
    match command {
        Command::Stop(labels) => Reply::Changed(supervisor.stop(labels.as_slice())),
        Command::StopAll => {
            supervisor.stop_all();
            Reply::Status(COMMAND_STATUS_OK)
        }
        Command::Resume(labels) => Reply::Changed(supervisor.resume(labels.as_slice())),
        Command::ResumeAll => {
            supervisor.resume_all();
            Reply::Status(COMMAND_STATUS_OK)
        }
        Command::GetPose(labels) => match labels.as_slice() {
            [] => Reply::Rejected("wrong format"),
            [label] => supervisor
                .query_pose(label)
                .map_or(Reply::NotFound, Reply::Pose),
            _ => Reply::Rejected("only one robot at a time"),
        },
        Command::List => Reply::Labels(supervisor.list()),
    }
}

/// Parse and dispatch one line.
pub fn execute(supervisor: &Supervisor, line: &str) -> Result<Reply, CommandError> {
    Command::parse(line).map(|command| dispatch(supervisor, command))
}

/// Queued lines between the reader thread and the dispatcher.
const LINE_QUEUE: usize = 64;

/// Read non-blank lines on a dedicated thread and forward them.
///
/// The thread owns the blocking reads, so an async runtime can shut down
/// while a read is still pending. The channel closes on EOF, on a read
/// error, or once the receiver is dropped.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_QUEUE);
    thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    break;
                }
            }
        }
        info!("Command input closed");
    });
    rx
}
