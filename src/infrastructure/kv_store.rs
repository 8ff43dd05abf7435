//! 键值存储 - 基础设施层
//!
//! 三个互相独立的存储槽，每次整体读写，不做局部更新。

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::StorageError;

/// 存储槽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// 当前会话
    Auth,
    /// 参考答案
    Reference,
    /// 评估记录列表
    Report,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Slot::Auth => "assessai_auth",
            Slot::Reference => "assessai_reference",
            Slot::Report => "assessai_report",
        }
    }
}

/// 整体读写的键值存储
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 槽不存在时返回 `None`
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError>;
    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError>;
    async fn remove(&self, slot: Slot) -> Result<(), StorageError>;

    /// 独占某个槽，直到返回的守卫被释放
    ///
    /// 进程内的串行化由调用方负责；默认实现不做任何事。
    async fn lock(&self, _slot: Slot) -> Result<SlotGuard, StorageError> {
        Ok(SlotGuard::noop())
    }
}

/// 槽锁守卫，释放时删除锁文件
#[derive(Debug)]
pub struct SlotGuard {
    lock_file: Option<PathBuf>,
}

impl SlotGuard {
    fn noop() -> Self {
        Self { lock_file: None }
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Some(path) = self.lock_file.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("⚠️ 删除锁文件失败 {}: {}", path.display(), e);
            }
        }
    }
}

/// 等待锁的最长时间
const LOCK_WAIT: Duration = Duration::from_secs(10);
/// 超过这个时间的锁文件视为残留（持有进程已退出）
const LOCK_STALE_AFTER: Duration = Duration::from_secs(30);
const LOCK_POLL: Duration = Duration::from_millis(25);

/// 每个槽一个文件
///
/// 写入先落到临时文件再重命名，读方不会看到写了一半的内容。
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.key())
    }

    fn lock_path_for(&self, slot: Slot) -> PathBuf {
        self.path_for(slot).with_extension("lock")
    }

    async fn is_stale(path: &Path) -> bool {
        match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified
                .elapsed()
                .map(|age| age > LOCK_STALE_AFTER)
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(slot)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::read_failed(slot.key(), e)),
        }
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::write_failed(slot.key(), e))?;

        let path = self.path_for(slot);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)
            .await
            .map_err(|e| StorageError::write_failed(slot.key(), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::write_failed(slot.key(), e))?;

        debug!("写入存储槽 {} ({} 字节)", slot.key(), value.len());
        Ok(())
    }

    async fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(slot)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::write_failed(slot.key(), e)),
        }
    }

    /// 用 `create_new` 创建锁文件实现跨进程互斥
    async fn lock(&self, slot: Slot) -> Result<SlotGuard, StorageError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::write_failed(slot.key(), e))?;

        let path = self.lock_path_for(slot);
        let started = Instant::now();
        loop {
            let created = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;

            match created {
                Ok(_) => {
                    return Ok(SlotGuard {
                        lock_file: Some(path),
                    })
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if Self::is_stale(&path).await {
                        warn!("⚠️ 清理残留锁文件: {}", path.display());
                        let _ = fs::remove_file(&path).await;
                        continue;
                    }
                    if started.elapsed() > LOCK_WAIT {
                        return Err(StorageError::write_failed(
                            slot.key(),
                            std::io::Error::new(
                                std::io::ErrorKind::TimedOut,
                                format!("等待锁文件超时: {}", path.display()),
                            ),
                        ));
                    }
                    tokio::time::sleep(LOCK_POLL).await;
                }
                Err(e) => return Err(StorageError::write_failed(slot.key(), e)),
            }
        }
    }
}

/// 内存实现，用于测试和临时会话
#[derive(Default)]
pub struct MemoryKeyValueStore {
    slots: RwLock<HashMap<Slot, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, slot: Slot) -> Result<Option<String>, StorageError> {
        Ok(self.slots.read().await.get(&slot).cloned())
    }

    async fn set(&self, slot: Slot, value: &str) -> Result<(), StorageError> {
        self.slots.write().await.insert(slot, value.to_string());
        Ok(())
    }

    async fn remove(&self, slot: Slot) -> Result<(), StorageError> {
        self.slots.write().await.remove(&slot);
        Ok(())
    }
}
