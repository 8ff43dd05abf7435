//! CSV 报表导出 - 业务能力层

use chrono::{Local, NaiveDate};
use tokio::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ExportError;
use crate::models::EvaluationRecord;

/// 表头
pub const CSV_HEADERS: [&str; 5] = ["Nom", "Prénom", "Score", "Status", "Date"];

const UTF8_BOM: char = '\u{FEFF}';

/// 默认文件名 `rapport_YYYY-MM-DD.csv`
pub fn default_file_name(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("rapport_{}.csv", date.format("%Y-%m-%d")))
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

fn row(record: &EvaluationRecord) -> String {
    let date = record
        .timestamp
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string();
    let score = record.score.to_string();

    let cells: [&str; 5] = [
        &record.last_name,
        &record.first_name,
        &score,
        record.status.label(),
        &date,
    ];
    cells.iter().map(|cell| quote(cell)).collect::<Vec<_>>().join(",")
}

/// 生成 CSV 文本（带 BOM）；没有记录时返回 `ExportError::Empty`
pub fn render_csv(records: &[EvaluationRecord]) -> Result<String, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    lines.extend(records.iter().map(row));

    let mut content = String::new();
    content.push(UTF8_BOM);
    content.push_str(&lines.join("\n"));
    Ok(content)
}

/// 写入 CSV 文件，返回导出的记录数；没有记录时不创建文件
pub async fn export_csv(
    records: &[EvaluationRecord],
    path: &Path,
) -> Result<usize, ExportError> {
    let content = render_csv(records)?;
    fs::write(path, content).await.map_err(|source| ExportError::WriteFailed {
        path: path.display().to_string(),
        source,
    })?;

    info!("✓ 已导出 {} 条记录到 {}", records.len(), path.display());
    Ok(records.len())
}
