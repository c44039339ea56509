use anyhow::{bail, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration, read once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub llm: LLMConfig,
    pub parser: ParserConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub environment: Environment,
    pub cors_allowed_origins: Vec<String>,
    pub static_dir: PathBuf,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_node_env(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub max_file_size: usize,
    pub pdf_strategy: PdfStrategy,
    pub max_content_chars: usize,
    pub rasterize_dpi: u32,
    pub rasterize_timeout: Duration,
}

/// How PDF uploads are turned into model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    /// Local text layer, first-page rasterization when there is none.
    Local,
    /// Hosted parsing job, polled for markdown.
    Hosted,
    /// PDFs are rejected at validation.
    Disabled,
}

impl std::str::FromStr for PdfStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(PdfStrategy::Local),
            "hosted" => Ok(PdfStrategy::Hosted),
            "disabled" | "none" => Ok(PdfStrategy::Disabled),
            other => bail!("Unknown PDF_STRATEGY '{}' (expected local, hosted or disabled)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub groq_api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub llama_cloud_api_key: Option<String>,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_LLAMA_CLOUD_BASE_URL: &str = "https://api.cloud.llamaindex.ai/api/parsing";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let max_file_size = megabytes_to_bytes(parse_var("MAX_FILE_SIZE_MB", 10)?)?;

        let max_attempts: u32 = parse_var("PARSER_MAX_ATTEMPTS", 60)?;
        if max_attempts == 0 {
            bail!("PARSER_MAX_ATTEMPTS must be greater than zero");
        }
        let poll_interval = Duration::from_secs(parse_var("PARSER_POLL_INTERVAL_SECS", 5)?);
        if poll_interval.checked_mul(max_attempts).is_none() {
            bail!("PARSER_POLL_INTERVAL_SECS * PARSER_MAX_ATTEMPTS overflows");
        }

        Ok(Self {
            server: ServerConfig {
                port: parse_var("PORT", 5000)?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                environment: Environment::from_node_env(
                    &env::var("NODE_ENV").unwrap_or_default(),
                ),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|origins| split_list(&origins))
                    .unwrap_or_default(),
                static_dir: env::var("STATIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("public")),
                http_timeout: Duration::from_secs(parse_var("HTTP_TIMEOUT_SECS", 60)?),
            },
            upload: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("data/uploads")),
                max_file_size,
                pdf_strategy: env::var("PDF_STRATEGY")
                    .unwrap_or_else(|_| "local".to_string())
                    .parse()?,
                max_content_chars: parse_var("MAX_CONTENT_CHARS", 15_000)?,
                rasterize_dpi: parse_var("RASTERIZE_DPI", 150)?,
                rasterize_timeout: Duration::from_secs(parse_var("RASTERIZE_TIMEOUT_SECS", 30)?),
            },
            llm: LLMConfig {
                groq_api_key: non_empty_var("GROQ_API_KEY"),
                base_url: env::var("GROQ_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GROQ_BASE_URL.to_string()),
                model: env::var("GROQ_MODEL").unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string()),
                max_tokens: parse_var("GROQ_MAX_TOKENS", 1024)?,
            },
            parser: ParserConfig {
                llama_cloud_api_key: non_empty_var("LLAMA_CLOUD_API_KEY"),
                base_url: env::var("LLAMA_CLOUD_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_LLAMA_CLOUD_BASE_URL.to_string()),
                poll_interval,
                max_attempts,
            },
            auth: AuthConfig {
                jwt_secret: non_empty_var("AUTH_JWT_SECRET"),
            },
        })
    }

    /// Configuration rooted at `upload_dir`, with both hosted services pointed
    /// at `upstream_url`.
    #[cfg(test)]
    pub fn for_upstream(upload_dir: impl Into<PathBuf>, upstream_url: &str) -> Self {
        Self {
            server: ServerConfig {
                port: 0,
                host: "127.0.0.1".to_string(),
                environment: Environment::Development,
                cors_allowed_origins: Vec::new(),
                static_dir: PathBuf::from("public"),
                http_timeout: Duration::from_secs(10),
            },
            upload: UploadConfig {
                dir: upload_dir.into(),
                max_file_size: 5 * 1024 * 1024,
                pdf_strategy: PdfStrategy::Local,
                max_content_chars: 15_000,
                rasterize_dpi: 150,
                rasterize_timeout: Duration::from_secs(30),
            },
            llm: LLMConfig {
                groq_api_key: Some("test-groq-key".to_string()),
                base_url: upstream_url.to_string(),
                model: DEFAULT_GROQ_MODEL.to_string(),
                max_tokens: 1024,
            },
            parser: ParserConfig {
                llama_cloud_api_key: Some("test-llama-key".to_string()),
                base_url: upstream_url.to_string(),
                poll_interval: Duration::ZERO,
                max_attempts: 60,
            },
            auth: AuthConfig { jwt_secret: None },
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e)),
        _ => Ok(default),
    }
}

/// Largest accepted `MAX_FILE_SIZE_MB`.
const MAX_FILE_SIZE_MB_LIMIT: usize = 1024;

fn megabytes_to_bytes(mb: usize) -> Result<usize> {
    if !(1..=MAX_FILE_SIZE_MB_LIMIT).contains(&mb) {
        bail!(
            "MAX_FILE_SIZE_MB must be between 1 and {}, got {}",
            MAX_FILE_SIZE_MB_LIMIT,
            mb
        );
    }
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_FILE_SIZE_MB is too large: {}", mb))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_strategy_parsing() {
        assert_eq!("local".parse::<PdfStrategy>().unwrap(), PdfStrategy::Local);
        assert_eq!(" Hosted ".parse::<PdfStrategy>().unwrap(), PdfStrategy::Hosted);
        assert_eq!("disabled".parse::<PdfStrategy>().unwrap(), PdfStrategy::Disabled);
        assert!("llama".parse::<PdfStrategy>().is_err());
    }

    #[test]
    fn test_environment_from_node_env() {
        assert!(Environment::from_node_env("production").is_production());
        assert!(Environment::from_node_env("PROD").is_production());
        assert!(!Environment::from_node_env("development").is_production());
        assert!(!Environment::from_node_env("").is_production());
    }

    #[test]
    fn test_megabytes_to_bytes_is_bounded() {
        assert_eq!(megabytes_to_bytes(10).unwrap(), 10 * 1024 * 1024);
        assert_eq!(megabytes_to_bytes(1024).unwrap(), 1024 * 1024 * 1024);

        assert!(megabytes_to_bytes(0).is_err());
        assert!(megabytes_to_bytes(1025).is_err());
        let err = megabytes_to_bytes(usize::MAX).unwrap_err();
        assert!(err.to_string().contains("MAX_FILE_SIZE_MB"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list("http://a.test, http://b.test,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }
}
