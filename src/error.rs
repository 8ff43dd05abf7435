use thiserror::Error;

use crate::models::Stage;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误（用户可修正，不会调用任何阶段）
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 阶段处理错误（远程服务明确拒绝，流程终止）
    #[error("阶段错误: {0}")]
    Stage(#[from] StageError),
    /// 持久化错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// CSV 导出错误
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
}

/// 输入校验错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 尚未保存参考答案
    #[error("参考答案为空，请先保存参考答案")]
    MissingReference,
    /// 未选择文件
    #[error("未提供答卷文件")]
    MissingDocument,
    /// 文件不是 PDF
    #[error("只接受 PDF 文件: {file_name} (类型: {content_type})")]
    NotPdf {
        file_name: String,
        content_type: String,
    },
    /// 姓为空
    #[error("学生姓 (nom) 不能为空")]
    MissingLastName,
    /// 名为空
    #[error("学生名 (prénom) 不能为空")]
    MissingFirstName,
    /// 查询时姓和名都为空
    #[error("查询需要提供姓或名")]
    EmptyLookup,
}

/// 阶段错误：阶段有响应，但明确表示处理失败
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} 阶段处理失败: {message}")]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

impl StageError {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// 单次阶段调用的失败类型
///
/// `Unavailable` 只是回退信号，由流程层吸收；`Rejected` 会终止流程。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageFailure {
    /// 服务不可用（传输失败、超时、5xx、响应格式错误）
    #[error("服务不可用: {reason}")]
    Unavailable { reason: String },
    /// 服务拒绝了输入
    #[error("服务拒绝: {message}")]
    Rejected { message: String },
}

impl StageFailure {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StageFailure::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        StageFailure::Rejected {
            message: message.into(),
        }
    }
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取存储槽失败
    #[error("读取存储槽失败 ({key}): {source}")]
    ReadFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入存储槽失败
    #[error("写入存储槽失败 ({key}): {source}")]
    WriteFailed {
        key: String,
        #[source]
        source: std::io::Error,
    },
    /// 存储内容无法解析
    #[error("存储内容损坏 ({key}): {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// 序列化失败
    #[error("序列化失败 ({key}): {source}")]
    SerializeFailed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// CSV 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 没有可导出的数据
    #[error("没有可导出的数据")]
    Empty,
    /// 写入文件失败
    #[error("写入 CSV 文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 构建 HTTP 客户端失败
    #[error("构建 HTTP 客户端失败: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 会话错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 未登录
    #[error("未登录，请先执行 login")]
    NotLoggedIn,
    /// 角色无权执行该操作
    #[error("角色 {actual} 无权执行此操作 (需要: {required})")]
    Forbidden { required: String, actual: String },
    /// 邮箱为空
    #[error("邮箱不能为空")]
    EmptyEmail,
}

// ========== 便捷构造函数 ==========

impl StorageError {
    pub fn read_failed(key: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::ReadFailed {
            key: key.into(),
            source,
        }
    }

    pub fn write_failed(key: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::WriteFailed {
            key: key.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_carries_stage_context() {
        let err = AppError::from(StageError::new(Stage::Scoring, "corrupt pdf"));
        let text = err.to_string();
        assert!(text.contains("scoring"));
        assert!(text.contains("corrupt pdf"));
    }

    #[test]
    fn validation_error_converts_into_app_error() {
        let err: AppError = ValidationError::MissingReference.into();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::MissingReference)
        ));
    }
}
