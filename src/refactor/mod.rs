// Plan execution - reversible quarantine of planned assets

mod quarantine;
mod undo;

pub use quarantine::{close_selection, Quarantine, QuarantineError, QuarantineOutcome};
pub use undo::UndoScript;
