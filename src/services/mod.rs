pub mod csv_export;
pub mod mock_stages;
pub mod reference_store;
pub mod result_store;
pub mod session_store;
pub mod stage;

pub use csv_export::{export_csv, render_csv};
pub use mock_stages::MockStageProvider;
pub use reference_store::ReferenceStore;
pub use result_store::ResultStore;
pub use session_store::SessionStore;
pub use stage::{FeedbackStage, NlpStage, OcrStage, ScoringStage, StageBackend};
