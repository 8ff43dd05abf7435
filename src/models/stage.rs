//! 流水线阶段与阶段间传递的数据

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 流水线的四个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Ocr,
    Nlp,
    Scoring,
    Feedback,
}

impl Stage {
    /// 按执行顺序排列的全部阶段
    pub const ALL: [Stage; 4] = [Stage::Ocr, Stage::Nlp, Stage::Scoring, Stage::Feedback];

    /// 相对于服务基础地址的路由
    pub fn route(self) -> &'static str {
        match self {
            Stage::Ocr => "ocr/process",
            Stage::Nlp => "nlp/analyze",
            Stage::Scoring => "scoring/evaluate",
            Stage::Feedback => "feedback/generate",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Ocr => "ocr",
            Stage::Nlp => "nlp",
            Stage::Scoring => "scoring",
            Stage::Feedback => "feedback",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 某个阶段最终由哪一层提供结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageSource {
    Remote,
    Mock,
}

/// OCR 阶段输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrOutput {
    pub extracted_text: String,
}

/// NLP 阶段输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NlpOutput {
    pub cleaned_text: String,
    pub keywords: Vec<String>,
}

/// 评分阶段输出，`score` 已保证在 [0, 20] 内
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringOutput {
    pub score: u8,
    pub missing_points: Vec<String>,
}

/// 反馈阶段输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackOutput {
    pub feedback: String,
}

/// 反馈阶段的输入
#[derive(Debug, Clone, Copy)]
pub struct FeedbackRequest<'a> {
    pub student_id: &'a str,
    pub score: u8,
    pub missing_points: &'a [String],
    pub student_text: &'a str,
    pub reference_text: &'a str,
}

/// 流水线状态机
///
/// `Idle → Ocr → Nlp → Scoring → Feedback → Complete`，任意阶段都可进入 `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running(Stage),
    Complete,
    Failed(Stage),
}

impl PipelineState {
    /// 成功路径上的下一个状态；终态返回 `None`
    pub fn next(self) -> Option<PipelineState> {
        match self {
            PipelineState::Idle => Some(PipelineState::Running(Stage::Ocr)),
            PipelineState::Running(Stage::Ocr) => Some(PipelineState::Running(Stage::Nlp)),
            PipelineState::Running(Stage::Nlp) => Some(PipelineState::Running(Stage::Scoring)),
            PipelineState::Running(Stage::Scoring) => {
                Some(PipelineState::Running(Stage::Feedback))
            }
            PipelineState::Running(Stage::Feedback) => Some(PipelineState::Complete),
            PipelineState::Complete | PipelineState::Failed(_) => None,
        }
    }

    /// 当前状态失败后的终态；只有运行中的阶段可以失败
    pub fn fail(self) -> Option<PipelineState> {
        match self {
            PipelineState::Running(stage) => Some(PipelineState::Failed(stage)),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed(_))
    }
}

impl Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "Idle"),
            PipelineState::Running(stage) => write!(f, "{}", stage.as_str().to_uppercase()),
            PipelineState::Complete => write!(f, "Complete"),
            PipelineState::Failed(stage) => write!(f, "Failed({})", stage),
        }
    }
}
