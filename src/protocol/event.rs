//! Typed events decoded from the assistant CLI stream.

use serde::Deserialize;

/// Prefix the assistant CLI uses for externally registered (MCP) tools.
pub const EXTERNAL_TOOL_PREFIX: &str = "mcp__";

/// Known tool kinds the assistant may invoke, specialized by tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    /// Todo-list replacement (`TodoWrite`).
    TodoWrite,
    /// In-place file edit (`Edit`).
    EditFile,
    /// Whole-file write (`Write`).
    WriteFile,
    /// File read (`Read`).
    ReadFile,
    /// Shell command execution (`Bash`).
    Shell,
    /// Delegated subtask (`Task`).
    Subtask,
    /// Externally registered tool (name begins with [`EXTERNAL_TOOL_PREFIX`]).
    External(String),
    /// Any other tool name; still delivered, never dropped.
    Unknown(String),
}

impl ToolKind {
    /// Classify a raw tool name into its kind.
    #[must_use]
    pub fn classify(name: &str) -> Self {
        match name {
            "TodoWrite" => Self::TodoWrite,
            "Edit" => Self::EditFile,
            "Write" => Self::WriteFile,
            "Read" => Self::ReadFile,
            "Bash" => Self::Shell,
            "Task" => Self::Subtask,
            other if other.starts_with(EXTERNAL_TOOL_PREFIX) => Self::External(other.to_owned()),
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// The raw tool name this kind was classified from.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::TodoWrite => "TodoWrite",
            Self::EditFile => "Edit",
            Self::WriteFile => "Write",
            Self::ReadFile => "Read",
            Self::Shell => "Bash",
            Self::Subtask => "Task",
            Self::External(name) | Self::Unknown(name) => name,
        }
    }
}

/// Token usage reported by the assistant, accumulated over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    /// Prompt tokens consumed.
    #[serde(default)]
    pub input_tokens: u64,
    /// Completion tokens produced.
    #[serde(default)]
    pub output_tokens: u64,
    /// Tokens read from prompt cache.
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    /// Tokens written to prompt cache.
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage report into this one, saturating.
    pub fn accumulate(&mut self, other: &Self) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.cache_read_input_tokens = self
            .cache_read_input_tokens
            .saturating_add(other.cache_read_input_tokens);
        self.cache_creation_input_tokens = self
            .cache_creation_input_tokens
            .saturating_add(other.cache_creation_input_tokens);
    }

    /// Total tokens across all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_input_tokens)
            .saturating_add(self.cache_creation_input_tokens)
    }
}

/// One typed event decoded from the assistant CLI stream.
///
/// The variant set is closed: every line the subprocess emits maps to
/// exactly these cases, and anomalies become events ([`ParseFailure`],
/// [`StderrLine`], [`ProcessExited`]) rather than errors thrown out of
/// the parsing loop.
///
/// [`ParseFailure`]: StreamEvent::ParseFailure
/// [`StderrLine`]: StreamEvent::StderrLine
/// [`ProcessExited`]: StreamEvent::ProcessExited
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The CLI opened (or resumed) an assistant-side session.
    SessionInit {
        /// Assistant-side session identifier, used for later resumption.
        session_id: String,
        /// Model the session runs on, when reported.
        model: Option<String>,
        /// Permission mode in effect, when reported.
        permission_mode: Option<String>,
    },
    /// A chunk of assistant-visible prose.
    AssistantText {
        /// Rendered text content.
        text: String,
    },
    /// Assistant thinking content (reasoning, not final prose).
    AssistantThinking {
        /// Thinking text.
        text: String,
    },
    /// The assistant requested a tool invocation.
    ToolInvoked {
        /// Identifier correlating this call with its later result.
        tool_use_id: String,
        /// Specialized tool kind.
        kind: ToolKind,
        /// Raw tool input object.
        input: serde_json::Value,
    },
    /// Outcome of an earlier tool invocation.
    ToolResult {
        /// Identifier of the invocation this result answers.
        tool_use_id: String,
        /// Whether the tool reported failure.
        is_error: bool,
        /// Flattened textual content of the result.
        content: String,
        /// Set when `tool_use_id` was never seen earlier in this stream;
        /// the event is still delivered, flagged rather than dropped.
        unmatched: bool,
    },
    /// Terminal result for this subprocess invocation.
    TurnCompleted {
        /// Whether the turn ended in error.
        is_error: bool,
        /// Final result text on success.
        result: Option<String>,
        /// Error description on failure.
        error: Option<String>,
        /// Reported cost in USD, when present.
        cost_usd: Option<f64>,
        /// Wall-clock duration of the turn in milliseconds.
        duration_ms: Option<u64>,
        /// Token usage for the turn.
        usage: TokenUsage,
    },
    /// A line that could not be decoded as protocol JSON.
    ParseFailure {
        /// The raw offending line.
        line: String,
        /// Decoder error description.
        error: String,
    },
    /// A raw diagnostic line from the subprocess stderr.
    StderrLine {
        /// Diagnostic text, never parsed as protocol.
        text: String,
    },
    /// The subprocess exited.
    ProcessExited {
        /// OS exit code, if the process was not signal-killed.
        exit_code: Option<i32>,
        /// Whether a [`TurnCompleted`](StreamEvent::TurnCompleted) was
        /// seen before exit; `false` means the turn ended without a
        /// terminal result and is reported distinctly.
        saw_result: bool,
    },
}
