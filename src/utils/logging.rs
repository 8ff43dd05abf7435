/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{EvaluationOutcome, EvaluationRecord, Status};

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；未设置时默认 `info`，`verbose` 为真时为 `debug`。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 评估流水线启动");
    if config.remote_enabled {
        info!("🌐 远程服务: {}", config.api_base_url);
        info!("⏱️ 请求超时: {} 秒", config.request_timeout_secs);
    } else {
        info!("📴 离线模式: 所有阶段使用本地模拟");
    }
    info!("📁 数据目录: {}", config.data_dir.display());
    info!("{}", "=".repeat(60));
}

/// 打印单次评估结果
pub fn log_outcome(outcome: &EvaluationOutcome) {
    let record = &outcome.record;
    info!("\n{}", "─".repeat(60));
    info!(
        "学生: {} {} (ID: {})",
        record.first_name, record.last_name, record.student_id
    );
    info!("提取文本: {}", truncate_text(&outcome.extracted_text, 80));
    info!("得分: {}/20 → {}", record.score, record.status);
    if !outcome.missing_points.is_empty() {
        info!("缺失要点: {}", outcome.missing_points.join(", "));
    }
    info!("反馈: {}", record.feedback);
    if outcome.used_fallback() {
        info!("💡 部分阶段使用了本地模拟");
    }
    info!("{}", "─".repeat(60));
}

/// 打印报表统计
pub fn log_report(records: &[EvaluationRecord]) {
    let passed = records.iter().filter(|r| r.status == Status::Pass).count();
    info!("\n{}", "=".repeat(60));
    info!("📊 报表: 共 {} 条记录", records.len());
    info!("✅ 及格: {}", passed);
    info!("❌ 不及格: {}", records.len() - passed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_text("réponse", 3), "rép...");
        assert_eq!(truncate_text("court", 10), "court");
    }
}
