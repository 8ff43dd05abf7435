/// 远程阶段服务客户端
///
/// 每个阶段一次 HTTP 调用，不重试。服务不可达、超时、5xx、响应格式错误
/// 都归为 `StageFailure::Unavailable`；服务明确拒绝输入时归为 `Rejected`。
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{ConfigError, StageFailure};
use crate::models::{
    FeedbackOutput, FeedbackRequest, NlpOutput, OcrOutput, ScoringOutput, SourceDocument, Stage,
    MAX_SCORE,
};
use crate::services::stage::{FeedbackStage, NlpStage, OcrStage, ScoringStage};

/// 远程阶段客户端
pub struct RemoteStageClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteStageClient {
    /// 创建新的远程客户端
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, stage: Stage) -> String {
        format!("{}/{}", self.base_url, stage.route())
    }

    fn post(&self, stage: Stage) -> RequestBuilder {
        let request = self.http.post(self.endpoint(stage));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求并按状态码分类
    async fn send<T: DeserializeOwned>(
        &self,
        stage: Stage,
        request: RequestBuilder,
    ) -> Result<T, StageFailure> {
        debug!("调用远程阶段: {}", self.endpoint(stage));

        let response = request
            .send()
            .await
            .map_err(|e| StageFailure::unavailable(format!("请求失败: {}", e)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| StageFailure::unavailable(format!("读取响应失败: {}", e)))?;

        debug!("{} 阶段响应: HTTP {} ({} 字节)", stage, status, body.len());

        classify_response(status, &body)
    }
}

// ========== 请求 / 响应结构 ==========

#[derive(Serialize)]
struct NlpBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoringBody<'a> {
    student_text: &'a str,
    reference_text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackBody<'a> {
    student_id: &'a str,
    score: u8,
    missing_points: &'a [String],
    student_text: &'a str,
    reference_text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OcrResponse {
    extracted_text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NlpResponse {
    cleaned_text: String,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoringResponse {
    score: f64,
    #[serde(default)]
    missing_points: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct FeedbackResponse {
    feedback: String,
}

// ========== 响应分类 ==========

/// 可由回退处理的状态码
///
/// 鉴权失败（401/403/407）同样按不可用处理。
fn is_availability_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::NOT_FOUND
                | StatusCode::PROXY_AUTHENTICATION_REQUIRED
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        )
}

fn error_message(value: &Value) -> Option<String> {
    ["errorMessage", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// 2xx 响应体中显式的失败标记
fn rejection_message(value: &Value) -> Option<String> {
    let success_false = value.get("success").and_then(Value::as_bool) == Some(false);
    let status_error = value
        .get("status")
        .and_then(Value::as_str)
        .map(|s| s.eq_ignore_ascii_case("error"))
        .unwrap_or(false);

    if success_false || status_error {
        Some(error_message(value).unwrap_or_else(|| "服务返回失败状态".to_string()))
    } else {
        None
    }
}

fn classify_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &[u8],
) -> Result<T, StageFailure> {
    if status.is_success() {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| StageFailure::unavailable(format!("响应不是合法 JSON: {}", e)))?;
        if let Some(message) = rejection_message(&value) {
            return Err(StageFailure::rejected(message));
        }
        return serde_json::from_value(value)
            .map_err(|e| StageFailure::unavailable(format!("响应字段缺失: {}", e)));
    }

    if is_availability_status(status) {
        return Err(StageFailure::unavailable(format!("HTTP {}", status)));
    }

    if status.is_client_error() {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(StageFailure::rejected(message));
    }

    Err(StageFailure::unavailable(format!("HTTP {}", status)))
}

/// 远程分数可能是小数，四舍五入后夹到 [0, 20]
fn normalize_score(score: f64) -> Result<u8, StageFailure> {
    if !score.is_finite() {
        return Err(StageFailure::unavailable(format!("分数非法: {}", score)));
    }
    Ok(score.round().clamp(0.0, f64::from(MAX_SCORE)) as u8)
}

// ========== 阶段实现 ==========

#[async_trait]
impl OcrStage for RemoteStageClient {
    async fn extract(&self, document: &SourceDocument) -> Result<OcrOutput, StageFailure> {
        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(&document.content_type)
            .map_err(|e| StageFailure::unavailable(format!("无法构建上传请求: {}", e)))?;
        let form = Form::new().part("file", part);

        let response: OcrResponse = self
            .send(Stage::Ocr, self.post(Stage::Ocr).multipart(form))
            .await?;

        Ok(OcrOutput {
            extracted_text: response.extracted_text,
        })
    }
}

#[async_trait]
impl NlpStage for RemoteStageClient {
    async fn analyze(&self, text: &str) -> Result<NlpOutput, StageFailure> {
        let response: NlpResponse = self
            .send(Stage::Nlp, self.post(Stage::Nlp).json(&NlpBody { text }))
            .await?;

        Ok(NlpOutput {
            cleaned_text: response.cleaned_text,
            keywords: response.keywords.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ScoringStage for RemoteStageClient {
    async fn evaluate(
        &self,
        student_text: &str,
        reference_text: &str,
    ) -> Result<ScoringOutput, StageFailure> {
        let body = ScoringBody {
            student_text,
            reference_text,
        };
        let response: ScoringResponse = self
            .send(Stage::Scoring, self.post(Stage::Scoring).json(&body))
            .await?;

        Ok(ScoringOutput {
            score: normalize_score(response.score)?,
            missing_points: response.missing_points.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl FeedbackStage for RemoteStageClient {
    async fn generate(
        &self,
        request: FeedbackRequest<'_>,
    ) -> Result<FeedbackOutput, StageFailure> {
        let body = FeedbackBody {
            student_id: request.student_id,
            score: request.score,
            missing_points: request.missing_points,
            student_text: request.student_text,
            reference_text: request.reference_text,
        };
        let response: FeedbackResponse = self
            .send(Stage::Feedback, self.post(Stage::Feedback).json(&body))
            .await?;

        Ok(FeedbackOutput {
            feedback: response.feedback,
        })
    }
}
