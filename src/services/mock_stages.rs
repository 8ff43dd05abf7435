//! 本地模拟阶段 - 业务能力层
//!
//! 远程服务不可用时的离线替代。除可选的人为延迟外没有副作用，
//! 相同输入总是得到相同输出。

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::error::StageFailure;
use crate::models::{
    FeedbackOutput, FeedbackRequest, NlpOutput, OcrOutput, ScoringOutput, SourceDocument,
    MAX_SCORE,
};
use crate::services::stage::{FeedbackStage, NlpStage, OcrStage, ScoringStage};

/// 分数未满时返回的占位缺失要点
pub const PLACEHOLDER_MISSING_POINTS: [&str; 2] =
    ["Some key concepts missing", "Incomplete explanation"];

/// NLP 模拟返回的占位关键词
pub const PLACEHOLDER_KEYWORDS: [&str; 3] = ["keyword1", "keyword2", "keyword3"];

/// 本地模拟阶段
#[derive(Debug, Clone, Default)]
pub struct MockStageProvider {
    delay: Duration,
}

impl MockStageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次调用前等待 `delay`，模拟网络耗时
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

/// OCR 模拟文本，只依赖文件名
pub fn mock_extracted_text(file_name: &str) -> String {
    format!(
        "[MOCK OCR] Extracted text from {}. This is a simulated OCR result. In production, this would contain the actual text extracted from the PDF.",
        file_name
    )
}

/// 词包含评分
///
/// 按空白切词，每个词若（忽略大小写）是参考答案的子串则计为命中，
/// `score = round(命中数 / max(总词数, 1) * 20)`，结果夹到 [0, 20]。
pub fn containment_score(student_text: &str, reference_text: &str) -> u8 {
    let reference = reference_text.to_lowercase();
    let tokens: Vec<String> = student_text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let matched = tokens
        .iter()
        .filter(|token| reference.contains(token.as_str()))
        .count();
    let total = tokens.len().max(1);

    let raw = (matched as f64 / total as f64 * f64::from(MAX_SCORE)).round();
    raw.clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// 分数对应的缺失要点
pub fn missing_points_for(score: u8) -> Vec<String> {
    if score < MAX_SCORE {
        PLACEHOLDER_MISSING_POINTS
            .iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        Vec::new()
    }
}

/// 反馈模拟文本
pub fn mock_feedback_text(score: u8, missing_points: &[String]) -> String {
    let remark = if missing_points.is_empty() {
        "Good work!".to_string()
    } else {
        format!("Missing points: {}", missing_points.join(", "))
    };
    format!(
        "[MOCK FEEDBACK] Score: {}/{}. {} This feedback is simulated. In production, it would provide detailed personalized feedback.",
        score, MAX_SCORE, remark
    )
}

#[async_trait]
impl OcrStage for MockStageProvider {
    async fn extract(&self, document: &SourceDocument) -> Result<OcrOutput, StageFailure> {
        self.simulate_latency().await;
        debug!("模拟 OCR: {}", document.file_name);
        Ok(OcrOutput {
            extracted_text: mock_extracted_text(&document.file_name),
        })
    }
}

#[async_trait]
impl NlpStage for MockStageProvider {
    async fn analyze(&self, text: &str) -> Result<NlpOutput, StageFailure> {
        self.simulate_latency().await;
        Ok(NlpOutput {
            cleaned_text: text.trim().to_string(),
            keywords: PLACEHOLDER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl ScoringStage for MockStageProvider {
    async fn evaluate(
        &self,
        student_text: &str,
        reference_text: &str,
    ) -> Result<ScoringOutput, StageFailure> {
        self.simulate_latency().await;
        let score = containment_score(student_text, reference_text);
        debug!("模拟评分: {}/{}", score, MAX_SCORE);
        Ok(ScoringOutput {
            score,
            missing_points: missing_points_for(score),
        })
    }
}

#[async_trait]
impl FeedbackStage for MockStageProvider {
    async fn generate(
        &self,
        request: FeedbackRequest<'_>,
    ) -> Result<FeedbackOutput, StageFailure> {
        self.simulate_latency().await;
        Ok(FeedbackOutput {
            feedback: mock_feedback_text(request.score, request.missing_points),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "the mitochondria is the powerhouse of the cell";

    #[test]
    fn identical_text_scores_full_marks() {
        assert_eq!(containment_score(REFERENCE, REFERENCE), 20);
        assert!(missing_points_for(20).is_empty());
    }

    #[test]
    fn containment_is_case_insensitive_substring() {
        // "mito" 是 "mitochondria" 的子串，"banana" 不是
        assert_eq!(containment_score("Mito banana", REFERENCE), 10);
    }

    #[test]
    fn ratio_is_rounded_half_up() {
        // 1/8 * 20 = 2.5 -> 3
        let text = "cell x1 x2 x3 x4 x5 x6 x7";
        assert_eq!(containment_score(text, REFERENCE), 3);
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(containment_score("", REFERENCE), 0);
        assert_eq!(containment_score("   ", REFERENCE), 0);
    }

    #[test]
    fn scoring_is_deterministic_and_bounded() {
        let samples = [
            ("", ""),
            ("a b c", ""),
            ("", "abc"),
            ("THE CELL", REFERENCE),
            ("the the the the", "the"),
            ("énergie cellulaire", "L'énergie est produite dans la cellule"),
        ];
        for (student, reference) in samples {
            let first = containment_score(student, reference);
            let second = containment_score(student, reference);
            assert_eq!(first, second);
            assert!(first <= 20);
        }
    }

    #[test]
    fn partial_score_returns_placeholder_missing_points() {
        let points = missing_points_for(12);
        assert_eq!(
            points,
            vec![
                "Some key concepts missing".to_string(),
                "Incomplete explanation".to_string()
            ]
        );
    }

    #[test]
    fn feedback_mentions_score_and_missing_points() {
        let points = missing_points_for(7);
        let text = mock_feedback_text(7, &points);
        assert!(text.contains("Score: 7/20"));
        assert!(text.contains("Some key concepts missing, Incomplete explanation"));

        let perfect = mock_feedback_text(20, &[]);
        assert!(perfect.contains("Good work!"));
    }

    #[tokio::test]
    async fn ocr_mock_embeds_file_name_without_reading_content() {
        let provider = MockStageProvider::new();
        let document = SourceDocument::new("copy1.pdf", "application/pdf", vec![0xde, 0xad]);
        let output = provider.extract(&document).await.unwrap();
        assert!(output.extracted_text.contains("copy1.pdf"));
        assert!(output.extracted_text.starts_with("[MOCK OCR]"));
    }

    #[tokio::test]
    async fn nlp_mock_trims_and_adds_keywords() {
        let provider = MockStageProvider::new();
        let output = provider.analyze("  some answer \n").await.unwrap();
        assert_eq!(output.cleaned_text, "some answer");
        assert_eq!(output.keywords.len(), 3);
    }
}
