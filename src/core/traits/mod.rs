pub mod language;
pub mod runner;
