//! Configuration and show loading
//!
//! Settings and the show come from flash when present, otherwise from the
//! `show.toml` compiled into the firmware. The TOML is parsed by a small
//! custom no_std parser.

pub mod loader;
pub mod show;
pub mod toml;

pub use loader::ConfigPersistence;
pub use show::ShowPersistence;
pub use toml::{parse_show, ShowSettings};
