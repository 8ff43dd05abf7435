//! 评估记录存储 - 业务能力层
//!
//! 只追加、不修改、不删除。记录顺序即插入顺序。
//! 进程内用互斥锁串行化追加，进程之间依赖存储层的槽锁。

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StorageError;
use crate::infrastructure::{KeyValueStore, Slot};
use crate::models::EvaluationRecord;

/// 评估记录存储
pub struct ResultStore {
    kv: Arc<dyn KeyValueStore>,
    // 追加是"读-改-写"，需要整体串行化
    append_lock: Mutex<()>,
}

impl ResultStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            append_lock: Mutex::new(()),
        }
    }

    /// 追加一条记录，返回追加后的记录总数
    pub async fn append(&self, record: EvaluationRecord) -> Result<usize, StorageError> {
        let _guard = self.append_lock.lock().await;
        let _slot = self.kv.lock(Slot::Report).await?;

        let mut records = self.load().await?;
        records.push(record);

        let json = serde_json::to_string(&records).map_err(|source| {
            StorageError::SerializeFailed {
                key: Slot::Report.key().to_string(),
                source,
            }
        })?;
        self.kv.set(Slot::Report, &json).await?;

        debug!("报表已追加，共 {} 条记录", records.len());
        Ok(records.len())
    }

    /// 全部记录，按插入顺序
    pub async fn list_all(&self) -> Result<Vec<EvaluationRecord>, StorageError> {
        self.load().await
    }

    /// 按姓名查找，返回存储顺序中的第一条匹配
    pub async fn find_by_name(
        &self,
        last: Option<&str>,
        first: Option<&str>,
    ) -> Result<Option<EvaluationRecord>, StorageError> {
        let records = self.load().await?;
        Ok(find_first_match(&records, last, first).cloned())
    }

    async fn load(&self) -> Result<Vec<EvaluationRecord>, StorageError> {
        match self.kv.get(Slot::Report).await? {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .map_err(|source| StorageError::Corrupted {
                    key: Slot::Report.key().to_string(),
                    source,
                }),
            _ => Ok(Vec::new()),
        }
    }
}

/// 去空白、转小写；空串视为未提供
fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// 姓名匹配规则（忽略大小写）：
/// - 姓和名都提供：两者分别相等，或 "名 姓" 与记录的 "名 姓" / "姓 名" 之一相等
/// - 只提供一个：与记录中对应字段相等
pub fn matches_name(record: &EvaluationRecord, last: Option<&str>, first: Option<&str>) -> bool {
    let record_last = record.last_name.to_lowercase();
    let record_first = record.first_name.to_lowercase();

    match (normalize(last), normalize(first)) {
        (Some(last), Some(first)) => {
            let exact = record_last == last && record_first == first;
            let query = format!("{} {}", first, last);
            let full_name = query == format!("{} {}", record_first, record_last)
                || query == format!("{} {}", record_last, record_first);
            exact || full_name
        }
        (Some(last), None) => record_last == last,
        (None, Some(first)) => record_first == first,
        (None, None) => false,
    }
}

pub fn find_first_match<'a>(
    records: &'a [EvaluationRecord],
    last: Option<&str>,
    first: Option<&str>,
) -> Option<&'a EvaluationRecord> {
    records.iter().find(|r| matches_name(r, last, first))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryKeyValueStore;
    use crate::models::{Status, StudentName};
    use chrono::Utc;

    fn record(last: &str, first: &str, id: &str) -> EvaluationRecord {
        EvaluationRecord::new(&StudentName::new(last, first), id, 12, "fb", Utc::now())
    }

    fn store() -> ResultStore {
        ResultStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[tokio::test]
    async fn append_preserves_insertion_order() {
        let store = store();
        assert!(store.list_all().await.unwrap().is_empty());

        store.append(record("Doe", "Jane", "1")).await.unwrap();
        store.append(record("Martin", "Paul", "2")).await.unwrap();
        let count = store.append(record("Doe", "Jane", "3")).await.unwrap();
        assert_eq!(count, 3);

        let ids: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.student_id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn both_names_match_case_insensitively() {
        let r = record("Doe", "Jane", "1");
        assert!(matches_name(&r, Some("doe"), Some("JANE")));
        assert!(!matches_name(&r, Some("doe"), Some("john")));
    }

    #[test]
    fn both_names_match_in_swapped_order() {
        let swapped = record("Jane", "Doe", "1");
        assert!(matches_name(&swapped, Some("Doe"), Some("Jane")));
    }

    #[test]
    fn single_last_name_ignores_first_name() {
        assert!(matches_name(&record("DOE", "Jane", "1"), Some("Doe"), None));
        assert!(matches_name(&record("doe", "Xavier", "2"), Some("Doe"), None));
        assert!(!matches_name(&record("Jane", "Doe", "3"), Some("Doe"), None));
    }

    #[test]
    fn single_first_name_matches_first_field() {
        assert!(matches_name(&record("Doe", "Jane", "1"), None, Some("jane")));
        assert!(matches_name(&record("Doe", "Jane", "1"), Some("  "), Some("jane")));
    }

    #[test]
    fn nothing_supplied_matches_nothing() {
        assert!(!matches_name(&record("Doe", "Jane", "1"), None, None));
        assert!(!matches_name(&record("Doe", "Jane", "1"), Some(""), Some(" ")));
    }

    #[tokio::test]
    async fn first_match_in_store_order_wins() {
        let store = store();
        store.append(record("Doe", "Xavier", "first")).await.unwrap();
        store.append(record("Doe", "Jane", "second")).await.unwrap();

        let by_last = store.find_by_name(Some("doe"), None).await.unwrap().unwrap();
        assert_eq!(by_last.student_id, "first");

        let exact = store
            .find_by_name(Some("doe"), Some("jane"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exact.student_id, "second");

        assert!(store
            .find_by_name(Some("Nobody"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let store = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(record("Doe", "Jane", &i.to_string())).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut ids: Vec<u32> = store
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.student_id.parse().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn appends_from_separate_stores_share_one_report() {
        use crate::infrastructure::FileKeyValueStore;

        // 两个独立的 ResultStore 指向同一目录，相当于两个进程
        let dir = tempfile::tempdir().unwrap();
        let a = Arc::new(ResultStore::new(Arc::new(FileKeyValueStore::new(dir.path()))));
        let b = Arc::new(ResultStore::new(Arc::new(FileKeyValueStore::new(dir.path()))));

        let mut handles = Vec::new();
        for i in 0..10 {
            let (a, b) = (a.clone(), b.clone());
            handles.push(tokio::spawn(async move {
                a.append(record("Doe", "Jane", &format!("a{}", i))).await
            }));
            handles.push(tokio::spawn(async move {
                b.append(record("Doe", "Jane", &format!("b{}", i))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(a.list_all().await.unwrap().len(), 20);
        assert!(!dir.path().join("assessai_report.lock").exists());
    }

    #[tokio::test]
    async fn legacy_report_slot_is_readable() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(
            Slot::Report,
            r#"[{"nom":"Doe","prenom":"Jane","studentId":"STU1","score":12,"status":"Réussi","feedback":"Bien","date":"2025-01-01T10:00:00.000Z"},
                {"nom":"Roy","prenom":"Léa","studentId":"STU2","score":13.5,"status":"Pass","feedback":"ok","date":"2025-01-02T10:00:00.000Z"}]"#,
        )
        .await
        .unwrap();
        let store = ResultStore::new(kv);

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, Status::Pass);
        assert_eq!(records[1].score, 14);

        let found = store.find_by_name(Some("doe"), Some("jane")).await.unwrap();
        assert_eq!(found.map(|r| r.student_id).as_deref(), Some("STU1"));

        // 追加后旧记录按新格式写回
        store.append(record("Martin", "Paul", "STU3")).await.unwrap();
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn corrupted_report_slot_is_a_storage_error() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(Slot::Report, "{not json").await.unwrap();
        let store = ResultStore::new(kv);
        assert!(matches!(
            store.list_all().await,
            Err(StorageError::Corrupted { .. })
        ));
    }
}
