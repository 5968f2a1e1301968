//! Monte Carlo damage-per-second simulator for d20 melee and ranged builds.

pub mod cli;
pub mod combat;
pub mod data;
pub mod parallel;
pub mod report;
