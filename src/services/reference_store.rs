//! 参考答案存储 - 业务能力层
//!
//! 全局只有一份参考答案，保存即覆盖，不保留历史版本。

use std::sync::Arc;
use tracing::info;

use crate::error::StorageError;
use crate::infrastructure::{KeyValueStore, Slot};

pub struct ReferenceStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ReferenceStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// 当前参考答案，未保存过时为空串
    pub async fn get(&self) -> Result<String, StorageError> {
        Ok(self.kv.get(Slot::Reference).await?.unwrap_or_default())
    }

    /// 覆盖保存参考答案
    pub async fn save(&self, text: &str) -> Result<(), StorageError> {
        self.kv.set(Slot::Reference, text).await?;
        info!("✓ 参考答案已保存 ({} 字符)", text.chars().count());
        Ok(())
    }
}
