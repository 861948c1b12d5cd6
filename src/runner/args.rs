//! Assistant CLI argument construction.
//!
//! A pure function from conversation intent to the ordered argument list,
//! unit-testable without launching anything. The argument shapes are a
//! stable contract with the external CLI and must not drift.

/// How this turn relates to prior assistant-side conversation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnMode {
    /// Begin a fresh conversation.
    New,
    /// Continue the most recent conversation in the working directory.
    ///
    /// Used only when no explicit assistant-side identifier is known;
    /// directory-scoped continuation is a heuristic, not precise.
    ContinueLast,
    /// Resume the conversation with this exact assistant-side identifier.
    /// Preferred whenever an identifier is available.
    Resume(String),
}

/// Build the full argument list for one subprocess invocation.
///
/// The prompt is always the final positional argument. Resume and
/// continue modes prefix the base argument set with their flag.
#[must_use]
pub fn build_args(mode: &TurnMode, model: &str, prompt: &str) -> Vec<String> {
    let mut argv: Vec<String> = Vec::with_capacity(10);

    match mode {
        TurnMode::New => {}
        TurnMode::ContinueLast => argv.push("-c".to_owned()),
        TurnMode::Resume(session_id) => {
            argv.push("-r".to_owned());
            argv.push(session_id.clone());
        }
    }

    argv.push("-p".to_owned());
    argv.push("--model".to_owned());
    argv.push(model.to_owned());
    argv.push("--output-format".to_owned());
    argv.push("stream-json".to_owned());
    argv.push("--verbose".to_owned());
    argv.push("--dangerously-skip-permissions".to_owned());
    argv.push(prompt.to_owned());

    argv
}
