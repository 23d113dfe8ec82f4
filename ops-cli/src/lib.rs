//! Operations CLI for the DocVault document store
//!
//! Runs the periodic maintenance jobs of the storage lifecycle and offline
//! checks against the policy table.
//!
//! # Example Usage
//!
//! ```bash
//! # Storage usage per area
//! docvault stats
//! docvault --format json stats
//!
//! # Maintenance jobs (cron or systemd timers)
//! docvault cleanup-temp --max-age-hours 6
//! docvault daily-backup
//! docvault enforce-retention
//!
//! # Offline checks
//! docvault validate ./id-front.jpg --document-type identity_card
//! docvault policies
//! ```

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, OutputFormat};
