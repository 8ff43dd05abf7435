//! 编排层（Orchestration Layer）
//!
//! ## 层次关系
//!
//! ```text
//! cli (命令解析)
//!     ↓
//! orchestrator::App (会话检查、组装依赖)
//!     ↓
//! workflow::EvaluationFlow (处理单份答卷)
//!     ↓
//! services (能力层：阶段 / 报表 / 参考答案 / 会话 / 导出)
//!     ↓
//! clients + infrastructure (远程服务、键值存储)
//! ```

pub mod app;

pub use app::App;
