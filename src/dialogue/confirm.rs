use crate::command::DeleteCommand;
use crate::types::Memory;

/// The single armed action waiting behind a yes/no prompt. Destructive
/// deletes and structured-memory edits pass through here; plain creates
/// and text edits never do.
#[derive(Debug, Clone)]
pub enum PendingAction {
    Delete(DeleteCommand),
    /// Edit of a structured memory; carries the snapshot so resolution
    /// does not need a second store fetch.
    Edit(Memory),
}

/// Outcome of matching one input line against the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Yes,
    No,
    /// Neither yes nor no: the gate stays armed and the line is consumed
    /// here — it must not leak to the parser.
    Unrecognized,
}

/// Case-insensitive yes/y/no/n matching.
pub fn resolve(input: &str) -> GateDecision {
    match input.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => GateDecision::Yes,
        "no" | "n" => GateDecision::No,
        _ => GateDecision::Unrecognized,
    }
}
