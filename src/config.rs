use std::path::PathBuf;

use anyhow::{bail, Context};
use serde::Deserialize;

const DEFAULT_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub folder: String,
}

/// Where uploaded resumes live. Chosen once at startup.
#[derive(Debug, Clone, Deserialize)]
pub enum StorageConfig {
    Local { uploads_dir: PathBuf },
    Remote(S3Config),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    /// Any origin whose host is this domain or one of its sub-domains is allowed.
    pub allowed_suffix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("required environment variable '{key}' is not set"))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let database_url = require("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: require("JWT_SECRET")?,
            issuer: or_default("JWT_ISSUER", "referral-tracker"),
            audience: or_default("JWT_AUDIENCE", "referral-tracker-users"),
            ttl_minutes: lookup("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_TTL_MINUTES),
        };

        let server = ServerConfig {
            host: or_default("APP_HOST", "0.0.0.0"),
            port: or_default("APP_PORT", "5001")
                .parse::<u16>()
                .context("APP_PORT must be a valid port number")?,
        };

        let storage = match or_default("RESUME_STORAGE", "local").to_lowercase().as_str() {
            "local" => StorageConfig::Local {
                uploads_dir: PathBuf::from(or_default("UPLOADS_DIR", "uploads")),
            },
            "s3" | "remote" => StorageConfig::Remote(S3Config {
                endpoint: lookup("S3_ENDPOINT").filter(|v| !v.trim().is_empty()),
                bucket: require("S3_BUCKET")?,
                access_key: require("S3_ACCESS_KEY")?,
                secret_key: require("S3_SECRET_KEY")?,
                region: or_default("S3_REGION", "us-east-1"),
                folder: or_default("S3_FOLDER", "referral-resumes")
                    .trim_matches('/')
                    .to_string(),
            }),
            other => bail!("RESUME_STORAGE must be 'local' or 's3', got '{other}'"),
        };

        let cors = CorsConfig {
            allowed_origins: parse_origins(&or_default("CLIENT_URL", "http://localhost:5173")),
            allowed_suffix: Some(or_default("CORS_ALLOWED_SUFFIX", "vercel.app"))
                .map(|s| s.trim().trim_start_matches('.').to_lowercase())
                .filter(|s| !s.is_empty()),
        };

        Ok(Self {
            database_url,
            jwt,
            server,
            storage,
            cors,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
