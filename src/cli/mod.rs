//! 命令行层
//!
//! 只负责解析参数并把调用转交给 `App`，不包含业务逻辑。

pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crate::models::{
    EvaluationOutcome, EvaluationRecord, SourceDocument, StudentName, Submission,
};
use crate::orchestrator::App;
use crate::utils::logging;
use commands::{Commands, EvaluateArgs, LookupArgs, ReferenceCommand, ReferenceSetArgs};

#[derive(Parser, Debug)]
#[command(
    name = "assess",
    version,
    about = "对学生答卷执行 OCR → NLP → 评分 → 反馈 流水线，并管理成绩报表"
)]
pub struct Cli {
    /// 配置文件路径（TOML）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// 分发子命令
    pub async fn run(self, app: &App) -> Result<()> {
        match self.command {
            Commands::Login(args) => {
                let session = app.login(&args.email, args.role.into()).await?;
                println!("已登录: {}", session);
            }
            Commands::Logout => {
                app.logout().await?;
                println!("已退出登录");
            }
            Commands::Reference(ReferenceCommand::Set(args)) => run_reference_set(app, args).await?,
            Commands::Reference(ReferenceCommand::Show) => {
                let reference = app.reference().await?;
                if reference.is_empty() {
                    println!("(尚未设置参考答案)");
                } else {
                    println!("{}", reference);
                }
            }
            Commands::Evaluate(args) => run_evaluate(app, args).await?,
            Commands::Report => {
                let records = app.report().await?;
                for record in &records {
                    println!("{}", format_record(record));
                }
                logging::log_report(&records);
            }
            Commands::Lookup(args) => run_lookup(app, args).await?,
            Commands::Export(args) => {
                let path = app.export(args.output).await?;
                println!("报表已导出: {}", path.display());
            }
        }
        Ok(())
    }
}

async fn run_reference_set(app: &App, args: ReferenceSetArgs) -> Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("读取参考答案失败: {}", path.display()))?,
        (None, None) => anyhow::bail!("需要 --text 或 --file"),
    };
    app.save_reference(&text).await?;
    println!("参考答案已保存 ({} 字符)", text.chars().count());
    Ok(())
}

async fn run_evaluate(app: &App, args: EvaluateArgs) -> Result<()> {
    info!("📄 读取答卷: {}", args.pdf.display());
    let document = SourceDocument::from_path(&args.pdf)
        .await
        .with_context(|| format!("读取答卷失败: {}", args.pdf.display()))?;

    let mut submission = Submission::new(StudentName::new(args.last, args.first), document);
    if let Some(id) = args.student_id {
        submission = submission.with_student_id(id);
    }

    let outcome = app.evaluate(submission).await?;
    logging::log_outcome(&outcome);
    println!("{}", format_outcome(&outcome));
    Ok(())
}

async fn run_lookup(app: &App, args: LookupArgs) -> Result<()> {
    match app.lookup(args.last.as_deref(), args.first.as_deref()).await? {
        Some(record) => println!("{}", format_record(&record)),
        None => println!("未找到该学生的成绩"),
    }
    Ok(())
}

const NO_FEEDBACK: &str = "Aucun feedback disponible";

fn format_record(record: &EvaluationRecord) -> String {
    let feedback = if record.feedback.trim().is_empty() {
        NO_FEEDBACK
    } else {
        record.feedback.as_str()
    };
    format!(
        "{} {} | {} | {}/20 | {} | {}\n  反馈: {}",
        record.last_name,
        record.first_name,
        record.student_id,
        record.score,
        record.status,
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        feedback
    )
}

fn format_outcome(outcome: &EvaluationOutcome) -> String {
    let mut lines = vec![format_record(&outcome.record)];
    if !outcome.missing_points.is_empty() {
        lines.push(format!("  缺失要点: {}", outcome.missing_points.join(", ")));
    }
    let sources = outcome
        .stages
        .iter()
        .map(|report| format!("{}={:?}", report.stage, report.source))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(format!("  阶段: {}", sources));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Stage, StageReport, StageSource};
    use chrono::Utc;

    fn record(feedback: &str) -> EvaluationRecord {
        EvaluationRecord::new(&StudentName::new("Doe", "Jane"), "STU1", 12, feedback, Utc::now())
    }

    #[test]
    fn record_line_shows_feedback() {
        let text = format_record(&record("Très bien"));
        assert!(text.starts_with("Doe Jane | STU1 | 12/20 | Réussi |"));
        assert!(text.ends_with("反馈: Très bien"));
    }

    #[test]
    fn empty_feedback_shows_placeholder() {
        let text = format_record(&record("  "));
        assert!(text.ends_with("反馈: Aucun feedback disponible"));
    }

    #[test]
    fn outcome_summary_lists_stage_sources() {
        let outcome = EvaluationOutcome {
            record: record("fb"),
            extracted_text: String::new(),
            cleaned_text: String::new(),
            keywords: vec![],
            missing_points: vec!["cell".to_string()],
            stages: vec![
                StageReport {
                    stage: Stage::Ocr,
                    source: StageSource::Remote,
                },
                StageReport {
                    stage: Stage::Feedback,
                    source: StageSource::Mock,
                },
            ],
        };
        let text = format_outcome(&outcome);
        assert!(text.contains("反馈: fb"));
        assert!(text.contains("缺失要点: cell"));
        assert!(text.contains("ocr=Remote feedback=Mock"));
    }
}
