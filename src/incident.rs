//! Per-run error log files
//!
//! 실행 한 번당 하나의 로그 파일 이름을 미리 정해 두고, 실패가 발생했을 때만
//! 디렉토리를 만들고 에러 전체 내용을 기록합니다.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::WrapperError;

const FILE_PREFIX: &str = "OpenVPNWrapper";

#[derive(Debug, Clone)]
pub struct IncidentLog {
    dir: PathBuf,
    timestamp: u64,
}

impl IncidentLog {
    /// Log stamped with the current Unix time.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_timestamp(dir, current_timestamp())
    }

    pub fn with_timestamp(dir: impl Into<PathBuf>, timestamp: u64) -> Self {
        Self {
            dir: dir.into(),
            timestamp,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `err` with its cause chain and returns the file path.
    ///
    /// A numeric suffix keeps runs started within the same second apart.
    pub fn record(&self, err: &WrapperError) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create log directory {}", self.dir.display()))?;

        let path = self.free_path();
        let body = format!(
            "Error occurred during run of OpenVPNWrapper [{}]: {}\n",
            err.error_code(),
            err.detail()
        );
        std::fs::write(&path, body)
            .with_context(|| format!("Failed to write log file {}", path.display()))?;

        tracing::info!("Wrote error log {}", path.display());
        Ok(path)
    }

    fn free_path(&self) -> PathBuf {
        let base = self.dir.join(format!("{}_{}.log", FILE_PREFIX, self.timestamp));
        if !base.exists() {
            return base;
        }
        (1u32..)
            .map(|n| self.dir.join(format!("{}_{}_{}.log", FILE_PREFIX, self.timestamp, n)))
            .find(|p| !p.exists())
            .unwrap_or(base)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
