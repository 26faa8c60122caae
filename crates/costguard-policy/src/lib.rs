//! Costguard policy enforcement.
//!
//! Declarative governance over scan results: an ordered rule set is
//! evaluated against each [`costguard_core::ResourceRecord`] together with
//! its graph-safety verdict, producing a [`Disposition`]. Resources that
//! require a human decision enter the approval lifecycle managed by
//! [`ApprovalLedger`].
//!
//! The engine is a pure decision function — it performs no network or
//! storage side effects. The only mutation surface is the explicit
//! approval transition API.

pub mod approval;
pub mod disposition;
pub mod engine;
pub mod error;
pub mod predicate;
pub mod rules;

pub use approval::{ApprovalLedger, ApprovalState, ApprovalStatus};
pub use disposition::{Disposition, DispositionAction};
pub use engine::PolicyEngine;
pub use error::{ApprovalError, PolicyError, PolicyEvaluationError};
pub use predicate::Predicate;
pub use rules::{Rule, RuleAction, RuleSet};
