//! 答卷、评估记录等核心数据结构

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::path::Path;

use super::stage::{Stage, StageSource};

/// 及格线（含）
pub const PASS_THRESHOLD: u8 = 10;
/// 满分
pub const MAX_SCORE: u8 = 20;

/// PDF 的 MIME 类型
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// 学生姓名
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentName {
    /// 姓 (nom)
    pub last: String,
    /// 名 (prénom)
    pub first: String,
}

impl StudentName {
    pub fn new(last: impl Into<String>, first: impl Into<String>) -> Self {
        Self {
            last: last.into(),
            first: first.into(),
        }
    }
}

impl Display for StudentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

/// 上传的答卷文件
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// 从磁盘读取文件，根据扩展名推断 MIME 类型
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
    }
}

/// 一次评估的输入，只在流水线运行期间存在
#[derive(Debug, Clone)]
pub struct Submission {
    pub student_name: StudentName,
    /// 为空时自动生成
    pub student_id: Option<String>,
    pub document: Option<SourceDocument>,
}

impl Submission {
    pub fn new(student_name: StudentName, document: SourceDocument) -> Self {
        Self {
            student_name,
            student_id: None,
            document: Some(document),
        }
    }

    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }
}

/// 评估结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(alias = "Réussi")]
    Pass,
    #[serde(alias = "Échec")]
    Fail,
}

impl Status {
    /// 由分数唯一决定
    pub fn from_score(score: u8) -> Self {
        if score >= PASS_THRESHOLD {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    /// 报表中显示的标签
    pub fn label(self) -> &'static str {
        match self {
            Status::Pass => "Réussi",
            Status::Fail => "Échec",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 持久化的评估记录，创建后不可修改
///
/// 字段名与既有报表数据保持一致 (`nom`, `prenom`, `studentId`, `date`)。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(rename = "nom")]
    pub last_name: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(deserialize_with = "score_from_number")]
    pub score: u8,
    pub status: Status,
    #[serde(default)]
    pub feedback: String,
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,
}

impl EvaluationRecord {
    /// 创建记录，分数会被夹到 [0, 20]，状态由分数推出
    pub fn new(
        name: &StudentName,
        student_id: impl Into<String>,
        score: u8,
        feedback: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let score = score.min(MAX_SCORE);
        Self {
            last_name: name.last.clone(),
            first_name: name.first.clone(),
            student_id: student_id.into(),
            score,
            status: Status::from_score(score),
            feedback: feedback.into(),
            timestamp,
        }
    }
}

/// 旧报表里的分数可能是小数，四舍五入后夹到 [0, 20]
fn score_from_number<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(serde::de::Error::custom(format!("分数非法: {}", raw)));
    }
    Ok(raw.round().clamp(0.0, f64::from(MAX_SCORE)) as u8)
}

/// 单个阶段的执行情况
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub source: StageSource,
}

/// 返回给调用方的完整评估结果（包含中间文本，便于展示）
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub record: EvaluationRecord,
    pub extracted_text: String,
    pub cleaned_text: String,
    pub keywords: Vec<String>,
    pub missing_points: Vec<String>,
    pub stages: Vec<StageReport>,
}

impl EvaluationOutcome {
    /// 是否有阶段使用了本地模拟
    pub fn used_fallback(&self) -> bool {
        self.stages.iter().any(|s| s.source == StageSource::Mock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_pass_iff_score_reaches_threshold() {
        for score in 0..=MAX_SCORE {
            let expected = if score >= 10 { Status::Pass } else { Status::Fail };
            assert_eq!(Status::from_score(score), expected, "score {}", score);
        }
    }

    #[test]
    fn record_clamps_score_and_derives_status() {
        let name = StudentName::new("Doe", "Jane");
        let record = EvaluationRecord::new(&name, "STU1", 42, "ok", Utc::now());
        assert_eq!(record.score, 20);
        assert_eq!(record.status, Status::Pass);
    }

    #[test]
    fn record_uses_report_field_names() {
        let name = StudentName::new("Doe", "Jane");
        let record = EvaluationRecord::new(&name, "STU1", 9, "fb", Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["nom"], "Doe");
        assert_eq!(json["prenom"], "Jane");
        assert_eq!(json["studentId"], "STU1");
        assert_eq!(json["status"], "Fail");
        assert!(json.get("date").is_some());
    }

    #[test]
    fn legacy_report_entries_are_readable() {
        let json = r#"[
            {"nom":"Doe","prenom":"Jane","studentId":"STU1","score":12,"status":"Réussi","feedback":"Bien","date":"2025-01-01T10:00:00.000Z"},
            {"nom":"Martin","prenom":"Paul","studentId":"STU2","score":13.5,"status":"Pass","feedback":"ok","date":"2025-01-02T10:00:00Z"},
            {"nom":"Roy","prenom":"Léa","studentId":"STU3","score":4.2,"status":"Échec","date":"2025-01-03T10:00:00Z"}
        ]"#;
        let records: Vec<EvaluationRecord> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].status, Status::Pass);
        assert_eq!(records[0].score, 12);
        assert_eq!(records[1].score, 14);
        assert_eq!(records[2].score, 4);
        assert_eq!(records[2].status, Status::Fail);
        assert_eq!(records[2].feedback, "");
    }

    #[test]
    fn pdf_detection_uses_content_type() {
        let pdf = SourceDocument::new("a.pdf", "application/pdf", vec![]);
        let png = SourceDocument::new("a.png", "image/png", vec![]);
        assert!(pdf.is_pdf());
        assert!(!png.is_pdf());
    }
}
