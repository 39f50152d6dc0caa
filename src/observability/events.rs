//! Structured event stream.
//!
//! Discrete, typed events emitted while a run plays. Events are serialized
//! as newline-delimited JSON (JSONL) with a monotonically increasing
//! sequence number, so consumers can check the choreography order without
//! trusting wall-clock timestamps.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The ambient window elapsed normally.
    Completed,
    /// Interrupted by SIGINT.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
    /// The sequence failed and the fallback was applied.
    Error,
}

/// Totals reported when a run stops.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// `played`, `bypassed` or `failed`.
    pub outcome: String,
    /// Events emitted before the summary.
    pub events_emitted: u64,
    /// Wall time from start to stop, in seconds.
    pub elapsed_secs: f64,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "outcome={} events={} elapsed={:.1}s",
            self.outcome, self.events_emitted, self.elapsed_secs,
        )
    }
}

/// A discrete event emitted during a run.
///
/// Tagged with `"type"` when serialized so consumers can dispatch on kind.
/// `at_ms` fields are milliseconds since the sequence started.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The entrance sequence was invoked.
    SequenceStarted {
        /// When the run started.
        timestamp: DateTime<Utc>,
        /// Unique id of this run.
        run_id: Uuid,
        /// Reduced-motion signal as read at invocation.
        reduced_motion: bool,
    },

    /// No animation was attempted; the final state was rendered directly.
    SequenceBypassed {
        /// When the bypass happened.
        timestamp: DateTime<Utc>,
        /// `reduced_motion`, `missing_elements` or `failed`.
        reason: String,
        /// Required roles that were absent, if any.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        missing: Vec<String>,
    },

    /// A phase of the choreography began.
    PhaseEntered {
        /// When the phase began.
        timestamp: DateTime<Utc>,
        /// Phase name.
        phase: String,
        /// Zero-based phase index.
        phase_index: usize,
        /// Offset from sequence start.
        at_ms: u64,
    },

    /// A cue was issued by the timeline.
    CueIssued {
        /// When the cue was issued.
        timestamp: DateTime<Utc>,
        /// Phase the cue belongs to.
        phase: String,
        /// Cue label.
        cue: String,
        /// Offset from sequence start.
        at_ms: u64,
        /// Whether the cue targeted an absent optional element.
        skipped: bool,
    },

    /// Every timeline step was issued and every blocking step settled.
    SequenceCompleted {
        /// When the sequence completed.
        timestamp: DateTime<Utc>,
        /// Offset from sequence start.
        duration_ms: u64,
    },

    /// The ambient session began.
    AmbientStarted {
        /// When the session started.
        timestamp: DateTime<Utc>,
    },

    /// The ambient session was stopped.
    AmbientStopped {
        /// When the session stopped.
        timestamp: DateTime<Utc>,
    },

    /// The run is over.
    RunStopped {
        /// When the run stopped.
        timestamp: DateTime<Utc>,
        /// Why it stopped.
        reason: StopReason,
        /// Run totals.
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RunSummary>,
    },
}

/// Wraps an [`Event`] with a sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; an event sink must never
/// disturb the animation.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
