//! Purge files matching patterns from a Nextcloud trash bin.
//!
//! The decision engine lives in [`builders`]: rules are matched in
//! declaration order against a trash snapshot, the selection passes a
//! threshold gate, and an executor deletes item by item. [`core`] holds the
//! data model, the configuration units and the WebDAV trash repository, and
//! [`utils`] drives several units from the command line.
//!
//! The engine can run headless: give [`core::engine::PurgeEngine`] any
//! [`core::trash::TrashRepository`] and a
//! [`builders::reporter::NullObserver`].

pub mod builders;
pub mod core;
pub mod utils;
