//! # Assess Pipeline
//!
//! 答卷自动评估流水线：OCR → NLP → 评分 → 反馈
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 键值存储（文件 / 内存），按槽位保存数据
//! - `clients/` - 远程阶段服务的 HTTP 客户端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - 四个阶段 trait，以及本地模拟实现 `MockStageProvider`
//! - `ResultStore` / `ReferenceStore` / `SessionStore` / CSV 导出
//!
//! ### ③ 流程层（Workflow）
//! - `EvaluationCtx` - 上下文封装（学生 ID + 姓名 + 文件）
//! - `EvaluationFlow` - 单份答卷的完整流程（校验 → 四个阶段 → 记录）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator::App` - 组装依赖，按会话角色放行
//! - `cli/` - 命令行入口

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::RemoteStageClient;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use models::{EvaluationOutcome, EvaluationRecord, Role, Session, Submission};
pub use orchestrator::App;
pub use services::{MockStageProvider, ResultStore};
pub use workflow::EvaluationFlow;
