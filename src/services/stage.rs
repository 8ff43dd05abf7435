//! 阶段能力接口 - 业务能力层
//!
//! 每个阶段一个 trait，远程客户端和本地模拟都实现同一组接口，
//! 流程层可以任意替换其中一层。

use async_trait::async_trait;

use crate::error::StageFailure;
use crate::models::{
    FeedbackOutput, FeedbackRequest, NlpOutput, OcrOutput, ScoringOutput, SourceDocument,
};

/// OCR：答卷文件 → 文本
#[async_trait]
pub trait OcrStage: Send + Sync {
    async fn extract(&self, document: &SourceDocument) -> Result<OcrOutput, StageFailure>;
}

/// NLP：原始文本 → 清洗后的文本
#[async_trait]
pub trait NlpStage: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<NlpOutput, StageFailure>;
}

/// 评分：学生文本 + 参考答案 → 分数与缺失要点
#[async_trait]
pub trait ScoringStage: Send + Sync {
    async fn evaluate(
        &self,
        student_text: &str,
        reference_text: &str,
    ) -> Result<ScoringOutput, StageFailure>;
}

/// 反馈：评分结果 → 评语
#[async_trait]
pub trait FeedbackStage: Send + Sync {
    async fn generate(&self, request: FeedbackRequest<'_>)
        -> Result<FeedbackOutput, StageFailure>;
}

/// 同时具备四个阶段能力的后端
pub trait StageBackend: OcrStage + NlpStage + ScoringStage + FeedbackStage {}

impl<T> StageBackend for T where T: OcrStage + NlpStage + ScoringStage + FeedbackStage {}
