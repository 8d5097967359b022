// This file is the module declaration file for the `core` module.
// It declares the submodules that hold the data model, the collaborators the
// purge talks to, and the engine that drives one configuration unit.

// `config` module:
// Reads a configuration unit (a TOML file describing one Nextcloud account and
// its pattern rules), validates it, and turns it into a runnable `PurgeUnit`.
pub mod config;

// `engine` module:
// Orchestrates one unit: list the trash bin, select, gate, execute, summarise.
pub mod engine;

// `error` module:
// The unit-level error taxonomy (`PurgeError`) and the per-item `DeleteError`.
pub mod error;

// `trash` module:
// The `TrashItem` model, the `TrashRepository` capability trait, and an
// in-memory repository.
pub mod trash;

// `webdav` module:
// The WebDAV implementation of `TrashRepository` used against real servers.
pub mod webdav;
