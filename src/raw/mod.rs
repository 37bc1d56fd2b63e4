//! Mirror of the human-authored document schemas, before validation.
//!
//! Raw types decode strictly (unknown keys are hard errors), validate
//! locally with aggregated field reports, and convert into the canonical
//! `valid` types via their `to_valid`/`to_workflow` methods.

pub mod global_cfg;
pub mod policies;
pub mod project;
pub mod repo_cfg;
pub mod step;
pub mod workflow;

pub use global_cfg::{RawGlobalCfg, RawRepoEntry, RawWorkflowHook};
pub use policies::{RawOwners, RawPolicySet, RawPolicySets};
pub use project::{normalize_dir, RawAutoplan, RawProject};
pub use repo_cfg::{RawRepoCfg, SUPPORTED_VERSIONS};
pub use step::RawStep;
pub use workflow::{RawStage, RawWorkflow};
