//! OpenVPN GUI 실행 파일 탐색 및 실행

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::utils::spawn_detached;

/// Where a launch candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// Path cached in the resolver script
    Cached,
    /// Configured install location (index in the candidate list)
    Default(usize),
    /// Typed in by the operator
    Manual,
}

/// First existing executable among the configured install locations.
pub fn locate_default(candidates: &[PathBuf]) -> Option<(CandidateSource, PathBuf)> {
    candidates.iter().enumerate().find_map(|(i, path)| {
        if path.is_file() {
            tracing::info!("Found OpenVPN GUI at: {}", path.display());
            Some((CandidateSource::Default(i), path.clone()))
        } else {
            tracing::debug!("No OpenVPN GUI at {}", path.display());
            None
        }
    })
}

/// Normalizes a path typed by the operator (surrounding whitespace/quotes).
pub fn parse_manual_path(input: &str) -> Option<PathBuf> {
    let trimmed = input.trim().trim_matches('"').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(PathBuf::from(trimmed))
    }
}

/// Starts the launcher executable.
pub trait Spawn {
    fn spawn(&self, program: &Path) -> std::io::Result<()>;
}

/// Starts the program detached from this console.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSpawner;

impl Spawn for DetachedSpawner {
    fn spawn(&self, program: &Path) -> std::io::Result<()> {
        let mut cmd = Command::new(program);
        if let Some(dir) = program.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        spawn_detached(&mut cmd)?;
        tracing::info!("Started {}", program.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_default_skips_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let x86 = tmp.path().join("x86").join("openvpn-gui.exe");
        std::fs::create_dir_all(x86.parent().unwrap()).unwrap();
        std::fs::write(&x86, b"").unwrap();

        let candidates = vec![tmp.path().join("missing").join("openvpn-gui.exe"), x86.clone()];
        assert_eq!(locate_default(&candidates), Some((CandidateSource::Default(1), x86)));
    }

    #[test]
    fn test_locate_default_ignores_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("openvpn-gui.exe");
        std::fs::create_dir_all(&dir).unwrap();

        assert_eq!(locate_default(&[dir]), None);
        assert_eq!(locate_default(&[]), None);
    }

    #[test]
    fn test_parse_manual_path() {
        assert_eq!(
            parse_manual_path("  \"C:\\Program Files\\OpenVPN\\bin\\openvpn-gui.exe\"  "),
            Some(PathBuf::from("C:\\Program Files\\OpenVPN\\bin\\openvpn-gui.exe"))
        );
        assert_eq!(parse_manual_path("/usr/bin/openvpn-gui"), Some(PathBuf::from("/usr/bin/openvpn-gui")));
        assert_eq!(parse_manual_path("   "), None);
        assert_eq!(parse_manual_path("\"\""), None);
    }

    #[test]
    fn test_detached_spawner_reports_missing_program() {
        let tmp = tempfile::tempdir().unwrap();
        let err = DetachedSpawner
            .spawn(&tmp.path().join("no-such-gui"))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
