//! Wrapper 전용 에러 타입 — 실패 종류에 따라 로그 파일 작성 여부와
//! 콘솔 안내 문구가 달라집니다.

use std::path::PathBuf;

/// Failures of a wrapper run.
#[derive(thiserror::Error, Debug)]
pub enum WrapperError {
    #[error("Resolver script execution failed")]
    ResolverInvocation(#[source] anyhow::Error),

    #[error("Resolved IPv6 address was empty")]
    EmptyResolution,

    #[error("Variable '${0}' with the OpenVPN configuration path was not found")]
    ConfigPathMissing(String),

    #[error("OpenVPN GUI executable not found")]
    LauncherNotFound,

    #[error("No OpenVPN GUI executable was selected")]
    LauncherSelectionCancelled,

    #[error("Failed to start '{}'", path.display())]
    LaunchFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WrapperError {
    /// 머신 리더블 에러 코드
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ResolverInvocation(_) => "RESOLVER_INVOCATION_FAILED",
            Self::EmptyResolution => "RESOLUTION_EMPTY",
            Self::ConfigPathMissing(_) => "CONFIG_PATH_MISSING",
            Self::LauncherNotFound => "LAUNCHER_NOT_FOUND",
            Self::LauncherSelectionCancelled => "LAUNCHER_SELECTION_CANCELLED",
            Self::LaunchFailed { .. } => "LAUNCH_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Faults get an incident log file; expected operational outcomes don't.
    pub fn writes_incident(&self) -> bool {
        match self {
            Self::ResolverInvocation(_)
            | Self::LauncherSelectionCancelled
            | Self::LaunchFailed { .. }
            | Self::Internal(_) => true,
            Self::EmptyResolution | Self::ConfigPathMissing(_) | Self::LauncherNotFound => false,
        }
    }

    /// Console lines shown to the operator.
    pub fn console_lines(&self) -> Vec<String> {
        match self {
            Self::ResolverInvocation(_) => {
                vec!["Exception occurred during execution of PowerShell script.".to_string()]
            }
            Self::EmptyResolution => vec![
                "Error: Result of PowerShell script resolving IPv6 address was null or empty.".to_string(),
                "Please ensure correctness of the DNS server in the PowerShell script and IPv6 network availability."
                    .to_string(),
            ],
            Self::ConfigPathMissing(variable) => vec![
                "Error: OpenVPN configuration file (.ovpn) could not be received from PowerShell script.".to_string(),
                "Please ensure it is specified as absolute path correctly between quotation marks as variable."
                    .to_string(),
                format!(
                    "Example: ${} = \"C:\\Program Files\\OpenVPN\\config\\example.ovpn\"",
                    variable
                ),
            ],
            Self::LauncherNotFound => vec![
                "OpenVPN GUI (openvpn-gui.exe) not found automatically. Please specify the path manually."
                    .to_string(),
            ],
            Self::LauncherSelectionCancelled => vec!["No OpenVPN GUI path selected.".to_string()],
            Self::LaunchFailed { .. } => {
                vec!["Exception occurred during call of OpenVPN GUI application.".to_string()]
            }
            Self::Internal(_) => vec!["Exception occurred during execution of OpenVPNWrapper.".to_string()],
        }
    }

    /// Display of this error followed by its `source()` chain.
    pub fn detail(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\nCaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}
