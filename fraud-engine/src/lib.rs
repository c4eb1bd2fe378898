//! Fraud scoring engine
//!
//! Scores card and wallet transactions by combining deterministic business
//! rules with an external probabilistic signal.
//!
//! # Pipeline
//!
//! - **Rules**: independent checks, each contributing a risk weight and a reason
//! - **Signal**: one probability in [0,1] from an external scorer
//! - **Combiner**: `clamp(rules * 0.4 + signal * 0.6) * 100`, rounded to 2 decimals
//! - **Classifier**: `> 80` BLOCK, `> 50` REVIEW, otherwise APPROVED

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod circuit;
pub mod classifier;
pub mod combiner;
pub mod config;
pub mod engine;
pub mod error;
pub mod lookup;
pub mod rules;
pub mod signal;
pub mod types;

pub use classifier::ActionClassifier;
pub use combiner::ScoreCombiner;
pub use config::EngineConfig;
pub use engine::{ScoringEngine, ScoringEngineBuilder};
pub use error::{Error, Result};
pub use types::*;
