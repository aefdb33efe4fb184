//! Wrapper 설정 — `openvpn-wrapper.toml`
//!
//! 실행 파일 옆의 TOML 파일에서 읽으며, 파일이 없으면 기본값을 사용합니다.
//!
//! | 환경 변수                  | 용도                         |
//! |----------------------------|------------------------------|
//! | `OPENVPN_WRAPPER_CONFIG`   | 설정 파일 경로 오버라이드    |
//! | `OPENVPN_WRAPPER_SCRIPT`   | 리졸버 스크립트 경로         |
//! | `OPENVPN_WRAPPER_LOG_DIR`  | 에러 로그 디렉토리           |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "openvpn-wrapper.toml";
pub const DEFAULT_SCRIPT_NAME: &str = "ResolveIPv6.ps1";

/// 기본 프롬프트 대기 시간 (초)
pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 5;
/// 기본 리졸버 스크립트 타임아웃 (초)
pub const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 120;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WrapperConfig {
    /// PowerShell script that resolves the address and names the profile
    pub script_path: PathBuf,
    /// Directory for per-run error logs
    pub log_dir: PathBuf,
    pub prompt_timeout_secs: u64,
    pub resolver_timeout_secs: u64,
    /// PowerShell executable
    pub interpreter: String,
    /// Statement run in the same session before the script
    pub execution_policy: String,
    /// Variable naming the .ovpn profile
    pub config_variable: String,
    /// Variable caching the OpenVPN GUI path in the script source
    pub launcher_variable: String,
    /// Install locations tried after the cached path, in order
    pub launcher_candidates: Vec<PathBuf>,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            script_path: exe_dir().join(DEFAULT_SCRIPT_NAME),
            log_dir: default_log_dir(),
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
            resolver_timeout_secs: DEFAULT_RESOLVER_TIMEOUT_SECS,
            interpreter: default_interpreter().to_string(),
            execution_policy: "Set-ExecutionPolicy -Scope CurrentUser -ExecutionPolicy Unrestricted"
                .to_string(),
            config_variable: "ovpnFile".to_string(),
            launcher_variable: "ovpnProgram".to_string(),
            launcher_candidates: default_launcher_candidates(),
        }
    }
}

impl WrapperConfig {
    /// Loads the config file (defaults if absent) and applies env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("OPENVPN_WRAPPER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| exe_dir().join(CONFIG_FILE_NAME));

        let mut cfg = if path.exists() {
            let s = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let cfg = Self::from_toml_str(&s, &exe_dir())
                .with_context(|| format!("Invalid config file {}", path.display()))?;
            tracing::info!("Loaded config from {}", path.display());
            cfg
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// Parses TOML; a relative `script_path` is resolved against `base_dir`.
    pub fn from_toml_str(s: &str, base_dir: &Path) -> Result<Self> {
        let mut cfg: Self = toml::from_str(s)?;
        if cfg.script_path.is_relative() {
            cfg.script_path = base_dir.join(&cfg.script_path);
        }
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(script) = std::env::var_os("OPENVPN_WRAPPER_SCRIPT") {
            self.script_path = PathBuf::from(script);
        }
        if let Some(dir) = std::env::var_os("OPENVPN_WRAPPER_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }
}

/// 실행 파일이 있는 디렉토리 (알 수 없으면 현재 디렉토리)
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Windows: `%USERPROFILE%\Documents\OpenVPNWrapper`
/// Linux/macOS: `~/Documents/OpenVPNWrapper`
pub fn default_log_dir() -> PathBuf {
    let home_var = if cfg!(target_os = "windows") { "USERPROFILE" } else { "HOME" };
    let home = std::env::var_os(home_var)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    home.join("Documents").join("OpenVPNWrapper")
}

fn default_interpreter() -> &'static str {
    if cfg!(target_os = "windows") {
        "powershell.exe"
    } else {
        "pwsh"
    }
}

fn default_launcher_candidates() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from(r"C:\Program Files\OpenVPN\bin\openvpn-gui.exe"),
            PathBuf::from(r"C:\Program Files (x86)\OpenVPN\bin\openvpn-gui.exe"),
        ]
    }

    #[cfg(not(target_os = "windows"))]
    {
        vec![
            PathBuf::from("/usr/bin/openvpn-gui"),
            PathBuf::from("/usr/local/bin/openvpn-gui"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = WrapperConfig::default();
        assert_eq!(cfg.prompt_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.resolver_timeout(), Duration::from_secs(120));
        assert_eq!(cfg.config_variable, "ovpnFile");
        assert_eq!(cfg.launcher_variable, "ovpnProgram");
        assert_eq!(cfg.launcher_candidates.len(), 2);
        assert!(cfg.script_path.ends_with(DEFAULT_SCRIPT_NAME));
        assert!(cfg.log_dir.ends_with("OpenVPNWrapper"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = WrapperConfig::from_toml_str(
            "prompt_timeout_secs = 10\nscript_path = \"scripts/resolve.ps1\"\n",
            Path::new("/opt/wrapper"),
        )
        .unwrap();

        assert_eq!(cfg.prompt_timeout_secs, 10);
        assert_eq!(cfg.script_path, Path::new("/opt/wrapper").join("scripts/resolve.ps1"));
        assert_eq!(cfg.resolver_timeout_secs, DEFAULT_RESOLVER_TIMEOUT_SECS);
        assert_eq!(cfg.execution_policy, WrapperConfig::default().execution_policy);
    }

    #[test]
    fn test_launcher_candidates_override() {
        let cfg = WrapperConfig::from_toml_str(
            "launcher_candidates = [\"/a/gui\", \"/b/gui\", \"/c/gui\"]\ninterpreter = \"pwsh-preview\"\n",
            Path::new("."),
        )
        .unwrap();

        assert_eq!(
            cfg.launcher_candidates,
            vec![PathBuf::from("/a/gui"), PathBuf::from("/b/gui"), PathBuf::from("/c/gui")]
        );
        assert_eq!(cfg.interpreter, "pwsh-preview");
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(WrapperConfig::from_toml_str("prompt_timeout_secs = \"soon\"", Path::new(".")).is_err());
    }
}
