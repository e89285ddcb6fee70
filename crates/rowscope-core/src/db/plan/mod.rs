//! Module: db::plan
//! Responsibility: executor-agnostic query plan IR, explain text, fingerprints.
//! Does not own: policy resolution or caller clause validation.
//! Boundary: the engine assembles plans; executors consume them read-only.

mod explain;
mod fingerprint;
mod node;

#[cfg(test)]
mod tests;

pub use fingerprint::PlanFingerprint;
pub use node::{PipelineMode, PlanError, PlanNode, QueryPlan, StageName};
