// Event log sink: an ordered, character-drained text log of coordinator actions.
//
// Producers push whole lines; the coordinator loop calls `drain_tick` on a
// fixed cadence and forwards each emitted character to the TUI. Producers in
// spawned tasks push through a cloned `LogSink`, which never blocks.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::debug;

use crate::chain::{ProgressObserver, TxProgress};

// ---------------------------------------------------------------------------
// EventLog
// ---------------------------------------------------------------------------

/// One pushed line that has not been fully drained yet.
#[derive(Debug)]
struct Pending {
    chars: VecDeque<char>,
}

/// FIFO of pending lines.
///
/// Drained characters go straight to the TUI, which keeps the display text
/// and trims it to `max_display_chars`.
#[derive(Debug, Default)]
pub struct EventLog {
    queue: VecDeque<Pending>,
    /// Upper bound on the displayed log in characters. `None` keeps everything.
    max_display_chars: Option<usize>,
}

impl EventLog {
    pub fn new(max_display_chars: Option<usize>) -> Self {
        EventLog {
            queue: VecDeque::new(),
            max_display_chars,
        }
    }

    /// Queue a line for display. Embedded newlines are emitted verbatim.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        debug!("event log: {}", line);
        self.queue.push_back(Pending {
            chars: line.chars().collect(),
        });
    }

    /// Pop the next character to display.
    ///
    /// Takes one character from the head line; once the head is exhausted it
    /// is removed and a `'\n'` is emitted in its place. Returns `None` when
    /// nothing is pending.
    pub fn drain_tick(&mut self) -> Option<char> {
        let head = self.queue.front_mut()?;
        match head.chars.pop_front() {
            Some(c) => Some(c),
            None => {
                self.queue.pop_front();
                Some('\n')
            }
        }
    }

    pub fn max_display_chars(&self) -> Option<usize> {
        self.max_display_chars
    }
}

/// Drop characters from the front of `text` until it holds at most `max`
/// characters. Always cuts on a char boundary.
pub fn trim_front(text: &mut String, max: usize) {
    let count = text.chars().count();
    if count <= max {
        return;
    }
    let excess = count - max;
    let cut = text
        .char_indices()
        .nth(excess)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.drain(..cut);
}

// ---------------------------------------------------------------------------
// LogSink
// ---------------------------------------------------------------------------

/// Cloneable producer handle for the event log.
///
/// Lines are sent to the coordinator loop, which appends them to its
/// `EventLog` in arrival order. Sends never block; a closed loop drops them.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: mpsc::UnboundedSender<String>,
}

impl LogSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LogSink { tx }, rx)
    }

    pub fn push(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

impl ProgressObserver for LogSink {
    fn notify(&self, progress: TxProgress) {
        match progress {
            TxProgress::Submitted { tx_hash } => {
                self.push(format!("transaction submitted: hash[{tx_hash}]"));
            }
            TxProgress::Confirmed { tx_hash, block } => {
                debug!("transaction {} confirmed in block {}", tx_hash, block);
            }
            TxProgress::Deployed { address } => {
                self.push(format!("create contract success: address[{address}]"));
            }
            TxProgress::Receipt { tx_hash } => {
                self.push(format!("receipt: hash[{tx_hash}]"));
            }
            TxProgress::Error { message } => {
                self.push(format!("error: {message}"));
            }
        }
    }
}
