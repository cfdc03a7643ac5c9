//! Matches first-author affiliations of Kepler and K2 publications to
//! Carnegie Classifications and tallies publications per classification.

pub mod aggregate;
pub mod aliases;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod output;
pub mod pipeline;
pub mod publications;
pub mod reference;
