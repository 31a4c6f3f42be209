//! phpbb-sl CLI: settings resolution, session handling and output for the
//! `phpbb` binary.

pub mod config;
pub mod output;
pub mod session;
