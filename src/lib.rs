//! covpub - Code coverage summary publisher
//!
//! A CI step that:
//! - Reads the line/branch percentages from a markdown coverage summary
//! - Judges them against configured thresholds
//! - Publishes the report as a GitHub check run and a pull request comment,
//!   updating the comment left by a previous run instead of adding another

pub mod config;
pub mod context;
pub mod coverage;
pub mod github;
pub mod outputs;
pub mod publish;
pub mod report;

pub use config::{Cli, Config, ConfigError};
pub use context::{RunnerEnv, TriggerContext};
pub use coverage::{evaluate, Conclusion, CoverageOutcome, CoverageVerdict, Thresholds};
pub use github::{CommentIdentity, GithubApi, GithubClient};
pub use publish::{run, run_from_cli, RunReport};
