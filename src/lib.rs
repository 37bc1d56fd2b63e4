//! Configuration resolution for pull-request-driven plan/apply automation.
//!
//! The crate reconciles the operator's server policy with a repository's
//! own workflow document into per-project execution configs, enforcing that
//! repositories only customize what the operator permitted.
//! It performs no I/O in the resolution path and holds no shared mutable
//! state; every resolution reads its inputs and returns fresh values.

pub mod error;
pub mod parser;
pub mod raw;
pub mod valid;

pub use error::{ConfigError, FieldError, ValidationErrors};
pub use parser::{
    has_repo_cfg, parse_global_cfg, parse_global_cfg_file, parse_repo_cfg, parse_repo_cfg_file,
    ConfigFormat,
};
pub use valid::{GlobalCfg, GlobalCfgArgs, MergedProjectCfg, RepoCfg};
