pub mod evaluation;
pub mod session;
pub mod stage;

pub use evaluation::{
    EvaluationOutcome, EvaluationRecord, SourceDocument, StageReport, Status, StudentName,
    Submission, MAX_SCORE, PASS_THRESHOLD, PDF_CONTENT_TYPE,
};
pub use session::{Role, Session};
pub use stage::{
    FeedbackOutput, FeedbackRequest, NlpOutput, OcrOutput, PipelineState, ScoringOutput, Stage,
    StageSource,
};
