use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_days: i64,
    /// Origin allowed to make credentialed requests; permissive CORS if unset.
    pub cors_origin: Option<String>,
    /// Compiled frontend served for every unmatched path.
    pub static_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("AMITY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("AMITY_JWT_SECRET is unset or still a placeholder");
        }

        let host = get("AMITY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = get("AMITY_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse::<u16>()
            .context("AMITY_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        let max_upload_bytes: usize = match get("AMITY_MAX_UPLOAD_BYTES") {
            Some(v) => v.parse::<usize>().context("AMITY_MAX_UPLOAD_BYTES must be a byte count")?,
            None => 5 * 1024 * 1024,
        };
        let session_days: i64 = match get("AMITY_SESSION_DAYS") {
            Some(v) => v.parse::<i64>().context("AMITY_SESSION_DAYS must be a number of days")?,
            None => 30,
        };
        if session_days <= 0 {
            bail!("AMITY_SESSION_DAYS must be positive");
        }

        Ok(Self {
            jwt_secret,
            db_path: get("AMITY_DB_PATH").unwrap_or_else(|| "amity.db".into()).into(),
            addr,
            upload_dir: get("AMITY_UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            max_upload_bytes,
            session_days,
            cors_origin: get("AMITY_CORS_ORIGIN").filter(|v| !v.is_empty()),
            static_dir: get("AMITY_STATIC_DIR").filter(|v| !v.is_empty()).map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = load(&[("AMITY_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.addr, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.db_path, PathBuf::from("amity.db"));
        assert_eq!(cfg.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(cfg.session_days, 30);
        assert!(cfg.cors_origin.is_none());
        assert!(cfg.static_dir.is_none());
    }

    #[test]
    fn test_placeholder_secret_is_rejected() {
        assert!(load(&[]).is_err());
        assert!(load(&[("AMITY_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cfg = load(&[
            ("AMITY_JWT_SECRET", "s3cret"),
            ("AMITY_HOST", "127.0.0.1"),
            ("AMITY_PORT", "8080"),
            ("AMITY_CORS_ORIGIN", "http://localhost:5173"),
            ("AMITY_SESSION_DAYS", "7"),
        ])
        .unwrap();
        assert_eq!(cfg.addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.cors_origin.as_deref(), Some("http://localhost:5173"));
        assert_eq!(cfg.session_days, 7);

        assert!(load(&[("AMITY_JWT_SECRET", "s"), ("AMITY_PORT", "http")]).is_err());
        assert!(load(&[("AMITY_JWT_SECRET", "s"), ("AMITY_SESSION_DAYS", "0")]).is_err());
    }
}
