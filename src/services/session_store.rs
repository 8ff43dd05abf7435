//! 会话存储 - 业务能力层
//!
//! 登录只记录邮箱和角色，不做真实认证。

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppResult, SessionError, StorageError};
use crate::infrastructure::{KeyValueStore, Slot};
use crate::models::{Role, Session};

pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// 登录并持久化会话
    pub async fn login(&self, email: &str, role: Role) -> AppResult<Session> {
        let email = email.trim();
        if email.is_empty() {
            return Err(SessionError::EmptyEmail.into());
        }

        let session = Session::new(email, role);
        let json = serde_json::to_string(&session).map_err(|source| {
            StorageError::SerializeFailed {
                key: Slot::Auth.key().to_string(),
                source,
            }
        })?;
        self.kv.set(Slot::Auth, &json).await?;

        info!("✓ 已登录: {}", session);
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), StorageError> {
        self.kv.remove(Slot::Auth).await?;
        info!("已退出登录");
        Ok(())
    }

    /// 当前会话；内容损坏时视为未登录
    pub async fn current(&self) -> Result<Option<Session>, StorageError> {
        let Some(content) = self.kv.get(Slot::Auth).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("⚠️ 会话数据无法解析，按未登录处理: {}", e);
                Ok(None)
            }
        }
    }

    /// 当前会话，未登录时报错
    pub async fn require(&self) -> AppResult<Session> {
        self.current()
            .await?
            .ok_or_else(|| SessionError::NotLoggedIn.into())
    }
}
