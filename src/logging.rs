// ==========================================
// 数据管理平台 - 日志初始化
// ==========================================
// 职责: 按环境变量选择日志过滤器与输出格式（文本 / JSON）
// 约束: 全局订阅器只能安装一次，重复初始化返回错误而不 panic
// ==========================================

use std::error::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// 日志过滤器环境变量（tracing-subscriber 约定）
pub const LOG_FILTER_ENV: &str = "RUST_LOG";
/// 日志格式环境变量: text | json
pub const LOG_FORMAT_ENV: &str = "DATA_MANAGER_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// 每行一个 JSON 对象，带当前 span（供日志采集系统解析）
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "plain" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: LogFormat,
    /// EnvFilter 指令，例如 "info" 或 "data_manager=debug,slow_sql=warn"
    pub directive: String,
    /// 输出交给测试框架捕获
    pub test_writer: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从自定义查找函数读取（无法识别的格式回退为文本）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = lookup(LOG_FORMAT_ENV)
            .and_then(|raw| LogFormat::parse(&raw))
            .unwrap_or_default();
        let directive = lookup(LOG_FILTER_ENV)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string());
        Self {
            format,
            directive,
            test_writer: false,
        }
    }

    /// 测试环境: debug 级别文本日志
    pub fn for_tests() -> Self {
        Self {
            format: LogFormat::Text,
            directive: "debug".to_string(),
            test_writer: true,
        }
    }
}

/// 指令无法解析时回退为默认级别
fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// 按配置安装全局订阅器
///
/// # 返回
/// - Err: 全局订阅器已被安装
pub fn try_init_with(settings: &LogSettings) -> Result<(), Box<dyn Error + Send + Sync>> {
    let builder = fmt()
        .with_env_filter(env_filter(&settings.directive))
        .with_target(true)
        .with_line_number(true);

    match (settings.format, settings.test_writer) {
        (LogFormat::Text, false) => builder.try_init(),
        (LogFormat::Text, true) => builder.with_test_writer().try_init(),
        (LogFormat::Json, false) => builder.json().with_current_span(true).try_init(),
        (LogFormat::Json, true) => builder
            .json()
            .with_current_span(true)
            .with_test_writer()
            .try_init(),
    }
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 过滤器（默认: info），例如 RUST_LOG=data_manager=trace,slow_sql=warn
/// - DATA_MANAGER_LOG_FORMAT: text（默认）| json
///
/// # 示例
/// ```no_run
/// use data_manager::logging;
/// logging::init();
/// ```
pub fn init() {
    if let Err(e) = try_init_with(&LogSettings::from_env()) {
        tracing::warn!(error = %e, "日志系统已初始化，忽略重复调用");
    }
}

/// 初始化测试环境的日志系统（重复调用安全）
pub fn init_test() {
    let _ = try_init_with(&LogSettings::for_tests());
}
