//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：根据配置创建存储、远程客户端和评估流程
//! 2. **会话检查**：每个操作先取出当前会话，再按角色放行
//! 3. **向下委托**：评估交给 `EvaluationFlow`，查询/导出交给存储服务

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::clients::RemoteStageClient;
use crate::config::Config;
use crate::error::{AppResult, ValidationError};
use crate::infrastructure::{FileKeyValueStore, KeyValueStore};
use crate::models::{EvaluationOutcome, EvaluationRecord, Role, Session, Submission};
use crate::services::csv_export::{default_file_name, export_csv};
use crate::services::{
    MockStageProvider, ReferenceStore, ResultStore, SessionStore, StageBackend,
};
use crate::workflow::EvaluationFlow;

/// 应用主结构
pub struct App {
    config: Config,
    sessions: SessionStore,
    references: Arc<ReferenceStore>,
    results: Arc<ResultStore>,
    flow: EvaluationFlow,
}

impl App {
    /// 初始化应用，数据保存在 `config.data_dir`
    pub fn initialize(config: Config) -> AppResult<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(&config.data_dir));
        Self::with_store(config, kv)
    }

    /// 使用指定的键值存储初始化
    pub fn with_store(config: Config, kv: Arc<dyn KeyValueStore>) -> AppResult<Self> {
        let remote = if config.remote_enabled {
            let client: Arc<dyn StageBackend> = Arc::new(RemoteStageClient::new(&config)?);
            Some(client)
        } else {
            None
        };

        let references = Arc::new(ReferenceStore::new(kv.clone()));
        let results = Arc::new(ResultStore::new(kv.clone()));
        let flow = EvaluationFlow::new(
            remote,
            MockStageProvider::with_delay(config.mock_delay()),
            references.clone(),
            results.clone(),
        );

        Ok(Self {
            config,
            sessions: SessionStore::new(kv),
            references,
            results,
            flow,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn login(&self, email: &str, role: Role) -> AppResult<Session> {
        self.sessions.login(email, role).await
    }

    pub async fn logout(&self) -> AppResult<()> {
        Ok(self.sessions.logout().await?)
    }

    pub async fn current_session(&self) -> AppResult<Option<Session>> {
        Ok(self.sessions.current().await?)
    }

    async fn require_role(&self, role: Role) -> AppResult<Session> {
        let session = self.sessions.require().await?;
        session.require(role)?;
        Ok(session)
    }

    /// 保存参考答案（教师）
    pub async fn save_reference(&self, text: &str) -> AppResult<()> {
        self.require_role(Role::Teacher).await?;
        Ok(self.references.save(text).await?)
    }

    /// 当前参考答案（教师）
    pub async fn reference(&self) -> AppResult<String> {
        self.require_role(Role::Teacher).await?;
        Ok(self.references.get().await?)
    }

    /// 评估一份答卷（教师）
    pub async fn evaluate(&self, submission: Submission) -> AppResult<EvaluationOutcome> {
        let session = self.sessions.require().await?;
        self.flow.run(&session, submission).await
    }

    /// 全部评估记录（教师）
    pub async fn report(&self) -> AppResult<Vec<EvaluationRecord>> {
        self.require_role(Role::Teacher).await?;
        Ok(self.results.list_all().await?)
    }

    /// 按姓名查询成绩（任意已登录用户）
    pub async fn lookup(
        &self,
        last: Option<&str>,
        first: Option<&str>,
    ) -> AppResult<Option<EvaluationRecord>> {
        let session = self.sessions.require().await?;

        let blank = |v: Option<&str>| v.map(|s| s.trim().is_empty()).unwrap_or(true);
        if blank(last) && blank(first) {
            return Err(ValidationError::EmptyLookup.into());
        }

        let found = self.results.find_by_name(last, first).await?;
        info!(
            "{} 查询 {:?} {:?}: {}",
            session,
            last,
            first,
            if found.is_some() { "找到" } else { "未找到" }
        );
        Ok(found)
    }

    /// 导出 CSV 报表（教师），返回写入的路径
    pub async fn export(&self, output: Option<PathBuf>) -> AppResult<PathBuf> {
        self.require_role(Role::Teacher).await?;
        let records = self.results.list_all().await?;
        let path = output.unwrap_or_else(|| default_file_name(Local::now().date_naive()));
        export_csv(&records, &path).await?;
        Ok(path)
    }
}
