//! 评估上下文
//!
//! 封装"我正在评估哪位学生的哪份答卷"这一信息

use chrono::Utc;
use std::fmt::Display;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::StudentName;

/// 单次评估的上下文，校验通过后才会创建
#[derive(Debug, Clone)]
pub struct EvaluationCtx {
    /// 学生编号（调用方提供或自动生成）
    pub student_id: String,

    /// 已去除首尾空白的学生姓名
    pub name: StudentName,

    /// 答卷文件名（仅用于日志显示）
    pub file_name: String,
}

impl EvaluationCtx {
    pub fn new(student_id: String, name: StudentName, file_name: String) -> Self {
        Self {
            student_id,
            name,
            file_name,
        }
    }
}

impl Display for EvaluationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[学生 ID#{} 姓名#{} 文件#{}]",
            self.student_id, self.name, self.file_name
        )
    }
}

/// 基于当前时间的学生编号 `STU<毫秒>`
///
/// 同一进程内生成的编号严格递增，同一毫秒内多次生成也不会重复。
#[derive(Debug, Default)]
pub struct StudentIdGenerator {
    last: AtomicI64,
}

impl StudentIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return format!("STU{}", candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_unique_and_time_based() {
        let generator = StudentIdGenerator::new();
        let before = Utc::now().timestamp_millis();

        let ids: Vec<String> = (0..100).map(|_| generator.next_id()).collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        let first: i64 = ids[0].trim_start_matches("STU").parse().unwrap();
        assert!(first >= before);
        assert!(ids.iter().all(|id| id.starts_with("STU")));
    }

    #[test]
    fn ctx_display_names_student_and_file() {
        let ctx = EvaluationCtx::new(
            "STU1".to_string(),
            StudentName::new("Doe", "Jane"),
            "copy1.pdf".to_string(),
        );
        let text = ctx.to_string();
        assert!(text.contains("STU1"));
        assert!(text.contains("Jane Doe"));
        assert!(text.contains("copy1.pdf"));
    }
}
