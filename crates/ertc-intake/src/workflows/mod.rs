pub mod intake;
pub mod qualification;
pub mod report;
