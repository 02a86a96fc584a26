//! CLI subcommands

pub mod doctor;
pub mod hash;
pub mod token;
