mod client;
mod escalation;
mod invoice;
mod job;
mod ledger;
mod money;
mod movement;
mod period;

pub use client::*;
pub use escalation::*;
pub use invoice::*;
pub use job::*;
pub use ledger::*;
pub use money::*;
pub use movement::*;
pub use period::*;
