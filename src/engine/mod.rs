mod billing;
mod roster;
mod slots;
mod triage;

pub use billing::*;
pub use roster::*;
pub use slots::*;
pub use triage::*;
