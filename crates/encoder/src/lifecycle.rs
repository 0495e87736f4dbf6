//! Encoder lifecycle state machine.

/// State of one engine invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Invocation built, engine has not reported anything yet.
    Idle,
    /// Engine reported start.
    Running,
    /// Engine finished and the output is complete.
    Succeeded,
    /// Engine reported an error.
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// The four lifecycle signals an engine emits, without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Start,
    Progress,
    End,
    Error,
}

/// Tracks the lifecycle and rejects transitions that are not allowed.
#[derive(Debug)]
pub struct Lifecycle {
    state: JobState,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: JobState::Idle,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Apply a signal. Returns `true` when the signal was accepted and should
    /// be acted on; terminal states accept nothing.
    pub fn apply(&mut self, signal: Signal) -> bool {
        let next = match (self.state, signal) {
            (JobState::Idle, Signal::Start) => JobState::Running,
            (JobState::Running, Signal::Progress) => JobState::Running,
            (JobState::Idle | JobState::Running, Signal::End) => JobState::Succeeded,
            (JobState::Idle | JobState::Running, Signal::Error) => JobState::Failed,
            (state, signal) => {
                tracing::debug!(?state, ?signal, "Ignoring encoder signal");
                return false;
            }
        };
        self.state = next;
        true
    }
}
