pub mod evaluation_ctx;
pub mod evaluation_flow;

pub use evaluation_ctx::{EvaluationCtx, StudentIdGenerator};
pub use evaluation_flow::EvaluationFlow;
