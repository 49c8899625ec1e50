//! # dt-gateway
//!
//! The review gate between an agent's proposed change and the working tree.
//!
//! A protocol adapter drives a [`ReviewCoordinator`]:
//!
//! 1. [`ReviewCoordinator::preprocess`] validates `{summary, unified_diff}`
//!    and returns a [`dt_changeset::PreprocessedChange`] with a change id.
//! 2. [`ReviewCoordinator::build_review_payload`] registers it as pending
//!    and returns the [`ReviewPayload`] shown to a human.
//! 3. [`ReviewCoordinator::resolve_review`] consumes the pending entry,
//!    archives the decision and, on approval, applies the change through a
//!    staging checkout ([`apply_preprocessed_change`]).
//!
//! Where state lives on disk is described by [`GatewayConfig`].

pub mod apply;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod payload;

pub use apply::{apply_preprocessed_change, ApplyResult};
pub use config::GatewayConfig;
pub use coordinator::ReviewCoordinator;
pub use error::GatewayError;
pub use payload::{ReviewOutcome, ReviewPayload, ReviewResponse, ReviewStatus};
