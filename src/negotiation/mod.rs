//! 约束协商器：用户约束 × 可达成方案 → 冲突 + 排序后的备选方案

pub mod negotiator;
pub mod types;

pub use negotiator::Negotiator;
pub use types::{
    Alternative, Bound, CandidateOption, Conflict, Constraint, NegotiationOutcome, NegotiationRequest, COST_METRIC,
};
