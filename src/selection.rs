//! Device selection for manual runs
//!
//! Parsing is kept free of terminal I/O. [`read_selection`] drives the prompt
//! loop over any line source and gives up as soon as the run is cancelled.

use crate::types::DeviceRecord;
use std::io::Write;
use tokio::io::{AsyncBufRead, Lines};
use tokio_util::sync::CancellationToken;

/// Width of the name column in the menu listing
const MENU_COLUMN_WIDTH: usize = 40;

/// Operator's answer to the selection prompt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Back up every device
    All,
    /// Back up the devices at these roster positions, in this order
    Indexes(Vec<usize>),
    /// Leave without backing anything up
    Exit,
    /// Input was not usable; prompt again
    Retry(RetryReason),
}

/// Why a selection must be re-entered
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryReason {
    /// Nothing was typed
    EmptyInput,
    /// Not `all`, `exit` or a list of in-range indexes
    Invalid(String),
}

impl Selection {
    /// The roster entries this selection refers to
    ///
    /// `Exit` and `Retry` select nothing.
    pub fn resolve<'a>(&self, roster: &'a [DeviceRecord]) -> Vec<&'a DeviceRecord> {
        match self {
            Selection::All => roster.iter().collect(),
            Selection::Indexes(indexes) => indexes.iter().filter_map(|&i| roster.get(i)).collect(),
            Selection::Exit | Selection::Retry(_) => Vec::new(),
        }
    }
}

/// Interpret one line of operator input against a roster of `roster_len` devices
///
/// Accepts `all`, `exit` (case-insensitive) or comma-separated zero-based
/// indexes. Repeated indexes are kept once, at their first position.
pub fn parse_selection(input: &str, roster_len: usize) -> Selection {
    let input = input.trim().to_lowercase();

    match input.as_str() {
        "" => return Selection::Retry(RetryReason::EmptyInput),
        "all" => return Selection::All,
        "exit" => return Selection::Exit,
        _ => {}
    }

    let mut indexes = Vec::new();
    for part in input.split(',') {
        let index = match part.trim().parse::<usize>() {
            Ok(i) if i < roster_len => i,
            _ => return Selection::Retry(RetryReason::Invalid(input.clone())),
        };
        if !indexes.contains(&index) {
            indexes.push(index);
        }
    }

    Selection::Indexes(indexes)
}

/// Hint printed after an unusable answer
pub fn retry_hint(reason: &RetryReason, roster_len: usize) -> String {
    let head = match reason {
        RetryReason::EmptyInput => "No input provided.",
        RetryReason::Invalid(_) => "Invalid input.",
    };
    format!(
        "{head} Please enter valid indexes between 0 and {}, separated by commas.\n\
         Or type \"all\" to backup all Fortigates or \"exit\" to quit.",
        roster_len.saturating_sub(1)
    )
}

/// Two-column listing of the roster followed by the `all`/`exit` choices
pub fn render_menu(names: &[&str]) -> String {
    let mut lines: Vec<String> = names
        .chunks(2)
        .enumerate()
        .map(|(row, pair)| {
            let i = row * 2;
            let left = format!("{i:3} - {:<width$}", pair[0], width = MENU_COLUMN_WIDTH);
            match pair.get(1) {
                Some(right) => format!("{left} {:2} - {right}", i + 1),
                None => left.trim_end().to_string(),
            }
        })
        .collect();
    lines.push(format!(
        "all - {:<width$} exit - Close the program",
        "All Fortigates",
        width = MENU_COLUMN_WIDTH - 2
    ));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Prompt until the answer is usable
///
/// End of input and cancellation both count as [`Selection::Exit`]; the
/// returned value is never [`Selection::Retry`].
pub async fn read_selection<R, W>(
    lines: &mut Lines<R>,
    out: &mut W,
    roster_len: usize,
    cancel: &CancellationToken,
) -> std::io::Result<Selection>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write!(out, "\nSelect the Fortigates to backup (separated by commas): ")?;
        out.flush()?;

        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("selection interrupted");
                return Ok(Selection::Exit);
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(Selection::Exit);
        };
        tracing::debug!(input = %line, "user input");

        match parse_selection(&line, roster_len) {
            Selection::Retry(reason) => {
                tracing::error!(?reason, "invalid selection");
                writeln!(out, "\n{}", retry_hint(&reason, roster_len))?;
            }
            choice => return Ok(choice),
        }
    }
}
