//! 评估流程 - 流程层
//!
//! 核心职责：定义"一份答卷"的完整处理流程
//!
//! 流程顺序：
//! 1. 前置校验（参考答案 / PDF / 姓名），失败则不调用任何阶段
//! 2. OCR → NLP → 评分 → 反馈，逐个串行执行
//! 3. 每个阶段先尝试远程服务，不可用时改用本地模拟（只回退一次）
//! 4. 四个阶段全部完成后才写入报表

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{AppResult, StageError, StageFailure, ValidationError};
use crate::models::{
    EvaluationOutcome, EvaluationRecord, FeedbackRequest, PipelineState, Role, Session,
    SourceDocument, Stage, StageReport, StageSource, StudentName, Submission,
};
use crate::services::stage::{FeedbackStage, NlpStage, OcrStage, ScoringStage};
use crate::services::{MockStageProvider, ReferenceStore, ResultStore, StageBackend};
use crate::utils::logging::truncate_text;
use crate::workflow::evaluation_ctx::{EvaluationCtx, StudentIdGenerator};

/// 单次运行的状态
struct PipelineRun {
    state: PipelineState,
    stages: Vec<StageReport>,
}

impl PipelineRun {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            stages: Vec::with_capacity(Stage::ALL.len()),
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.state.next() {
            debug!("流水线状态: {} → {}", self.state, next);
            self.state = next;
        }
    }

    fn current_stage(&self) -> Option<Stage> {
        match self.state {
            PipelineState::Running(stage) => Some(stage),
            _ => None,
        }
    }

    fn fail(&mut self) {
        if let Some(failed) = self.state.fail() {
            self.state = failed;
        }
    }
}

/// 评估流程
///
/// - 编排四个阶段，决定何时回退到本地模拟
/// - 只依赖阶段能力接口和存储服务
/// - 会话由调用方显式传入
pub struct EvaluationFlow {
    remote: Option<Arc<dyn StageBackend>>,
    fallback: MockStageProvider,
    references: Arc<ReferenceStore>,
    results: Arc<ResultStore>,
    ids: StudentIdGenerator,
}

impl EvaluationFlow {
    /// `remote` 为 `None` 时所有阶段直接使用本地模拟
    pub fn new(
        remote: Option<Arc<dyn StageBackend>>,
        fallback: MockStageProvider,
        references: Arc<ReferenceStore>,
        results: Arc<ResultStore>,
    ) -> Self {
        Self {
            remote,
            fallback,
            references,
            results,
            ids: StudentIdGenerator::new(),
        }
    }

    pub async fn run(
        &self,
        session: &Session,
        submission: Submission,
    ) -> AppResult<EvaluationOutcome> {
        session.require(Role::Teacher)?;

        // 参考答案以运行开始时的值为准
        let reference = self.references.get().await?;
        let (ctx, document) = self.validate(&reference, submission)?;

        info!("{} 开始评估 (操作人: {})", ctx, session.email);

        let mut run = PipelineRun::new();
        let remote = self.remote.as_ref();

        // ========== 阶段 1: OCR ==========
        let ocr = self
            .resolve(
                &mut run,
                &ctx,
                remote.map(|r| r.extract(&document)),
                || self.fallback.extract(&document),
            )
            .await?;
        debug!("{} 提取文本: {}", ctx, truncate_text(&ocr.extracted_text, 80));

        // ========== 阶段 2: NLP ==========
        let nlp = self
            .resolve(
                &mut run,
                &ctx,
                remote.map(|r| r.analyze(&ocr.extracted_text)),
                || self.fallback.analyze(&ocr.extracted_text),
            )
            .await?;

        // ========== 阶段 3: 评分 ==========
        let scoring = self
            .resolve(
                &mut run,
                &ctx,
                remote.map(|r| r.evaluate(&nlp.cleaned_text, &reference)),
                || self.fallback.evaluate(&nlp.cleaned_text, &reference),
            )
            .await?;
        info!("{} 得分: {}/20", ctx, scoring.score);

        // ========== 阶段 4: 反馈 ==========
        let request = FeedbackRequest {
            student_id: &ctx.student_id,
            score: scoring.score,
            missing_points: &scoring.missing_points,
            student_text: &nlp.cleaned_text,
            reference_text: &reference,
        };
        let feedback = self
            .resolve(
                &mut run,
                &ctx,
                remote.map(|r| r.generate(request)),
                || self.fallback.generate(request),
            )
            .await?;

        run.advance();

        let record = EvaluationRecord::new(
            &ctx.name,
            ctx.student_id.clone(),
            scoring.score,
            feedback.feedback,
            Utc::now(),
        );
        self.results.append(record.clone()).await?;

        info!("{} ✅ 评估完成: {} ({})", ctx, record.score, record.status);

        Ok(EvaluationOutcome {
            record,
            extracted_text: ocr.extracted_text,
            cleaned_text: nlp.cleaned_text,
            keywords: nlp.keywords,
            missing_points: scoring.missing_points,
            stages: run.stages,
        })
    }

    /// 前置校验，全部通过后才生成学生编号
    fn validate(
        &self,
        reference: &str,
        submission: Submission,
    ) -> Result<(EvaluationCtx, SourceDocument), ValidationError> {
        if reference.trim().is_empty() {
            return Err(ValidationError::MissingReference);
        }

        let document = submission
            .document
            .ok_or(ValidationError::MissingDocument)?;
        if !document.is_pdf() {
            return Err(ValidationError::NotPdf {
                file_name: document.file_name,
                content_type: document.content_type,
            });
        }

        let last = submission.student_name.last.trim();
        if last.is_empty() {
            return Err(ValidationError::MissingLastName);
        }
        let first = submission.student_name.first.trim();
        if first.is_empty() {
            return Err(ValidationError::MissingFirstName);
        }

        // 调用方提供的编号原样使用，不检查重复
        let student_id = submission
            .student_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.next_id());

        let ctx = EvaluationCtx::new(
            student_id,
            StudentName::new(last, first),
            document.file_name.clone(),
        );
        Ok((ctx, document))
    }

    /// 执行一个阶段：远程优先，不可用时回退到本地模拟
    async fn resolve<T, R, M>(
        &self,
        run: &mut PipelineRun,
        ctx: &EvaluationCtx,
        remote: Option<R>,
        fallback: impl FnOnce() -> M,
    ) -> AppResult<T>
    where
        R: Future<Output = Result<T, StageFailure>>,
        M: Future<Output = Result<T, StageFailure>>,
    {
        run.advance();
        let Some(stage) = run.current_stage() else {
            // advance() 只会在终态时停住，四个阶段之内不会发生
            return Err(StageError::new(Stage::Feedback, "流水线状态异常").into());
        };

        info!("{} 🔍 {} 阶段...", ctx, stage);

        let attempt = match remote {
            Some(call) => match call.await {
                Ok(output) => Ok((output, StageSource::Remote)),
                Err(StageFailure::Unavailable { reason }) => {
                    warn!("{} ⚠️ {} 服务不可用，改用本地模拟: {}", ctx, stage, reason);
                    fallback().await.map(|output| (output, StageSource::Mock))
                }
                Err(rejected) => Err(rejected),
            },
            None => fallback().await.map(|output| (output, StageSource::Mock)),
        };

        match attempt {
            Ok((output, source)) => {
                run.stages.push(StageReport { stage, source });
                Ok(output)
            }
            Err(failure) => {
                run.fail();
                let message = match failure {
                    StageFailure::Rejected { message } => message,
                    StageFailure::Unavailable { reason } => reason,
                };
                error!("{} ❌ {} 阶段失败 ({}): {}", ctx, stage, run.state, message);
                Err(StageError::new(stage, message).into())
            }
        }
    }
}
