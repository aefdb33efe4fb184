//! Wrapper run — resolve, rewrite the profile, start OpenVPN GUI
//!
//! 각 단계의 실패는 단계 경계에서 잡아 로그 파일/안내 문구/대기 후 종료합니다.
//! 예상하지 못한 실패(`WrapperError::Internal`)만 호출자에게 전달됩니다.

use std::path::PathBuf;

use anyhow::Result;

use crate::config::WrapperConfig;
use crate::error::WrapperError;
use crate::incident::IncidentLog;
use crate::launcher::{self, CandidateSource, Spawn};
use crate::prompt::TimedPrompt;
use crate::resolver::{Resolve, ResolverOutput};
use crate::rewriter::{ConfigRewriter, FileDocument, RewriteOutcome};
use crate::script::{self, ScriptSource};

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Launched {
        program: PathBuf,
        rewrite: RewriteOutcome,
    },
    /// Stopped at a step boundary; the error was already reported.
    Stopped(WrapperError),
    /// Manual launcher selection was cancelled by the operator; reported
    /// like a step failure.
    Cancelled,
}

pub struct Wrapper<R, S> {
    config: WrapperConfig,
    prompt: TimedPrompt,
    resolver: R,
    spawner: S,
    incidents: IncidentLog,
    rewriter: ConfigRewriter,
}

impl<R: Resolve, S: Spawn> Wrapper<R, S> {
    pub fn new(
        config: WrapperConfig,
        prompt: TimedPrompt,
        resolver: R,
        spawner: S,
        incidents: IncidentLog,
        rewriter: ConfigRewriter,
    ) -> Self {
        Self {
            config,
            prompt,
            resolver,
            spawner,
            incidents,
            rewriter,
        }
    }

    /// Builds the wrapper once its rewriter is ready. On failure the error
    /// goes through [`report_failure`] before `None` is returned.
    pub async fn assemble(
        config: WrapperConfig,
        prompt: TimedPrompt,
        resolver: R,
        spawner: S,
        incidents: IncidentLog,
        rewriter: Result<ConfigRewriter>,
    ) -> Option<Self> {
        match rewriter {
            Ok(rewriter) => Some(Self::new(config, prompt, resolver, spawner, incidents, rewriter)),
            Err(e) => {
                tracing::error!("Failed to initialize wrapper: {:#}", e);
                report_failure(&prompt, &incidents, &WrapperError::Internal(e)).await;
                None
            }
        }
    }

    pub fn config(&self) -> &WrapperConfig {
        &self.config
    }

    pub fn prompt(&self) -> &TimedPrompt {
        &self.prompt
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    pub async fn run(&self) -> Result<RunOutcome, WrapperError> {
        let script = ScriptSource::load(&self.config.script_path)?;

        let rewrite = match self.update_profile(&script).await {
            Ok(outcome) => outcome,
            Err(err) => return self.stop(err).await,
        };

        let program = match self.launch(&script).await {
            Ok(program) => program,
            Err(WrapperError::LauncherNotFound) => {
                print_lines(&WrapperError::LauncherNotFound);
                match self.select_launcher_manually(&script).await {
                    Ok(Some(program)) => program,
                    Ok(None) => {
                        report_failure(&self.prompt, &self.incidents, &WrapperError::LauncherSelectionCancelled)
                            .await;
                        return Ok(RunOutcome::Cancelled);
                    }
                    Err(err) => return self.stop(err).await,
                }
            }
            Err(err) => return self.stop(err).await,
        };

        Ok(RunOutcome::Launched { program, rewrite })
    }

    /// Resolves the current address and writes it into the profile.
    async fn update_profile(&self, script: &ScriptSource) -> Result<RewriteOutcome, WrapperError> {
        println!("Running script {} in PowerShell...", script.path().display());
        let output = self
            .resolver
            .resolve(script.text())
            .await
            .map_err(WrapperError::ResolverInvocation)?;

        let address = output.address();
        if address.is_empty() {
            return Err(WrapperError::EmptyResolution);
        }
        tracing::info!("Resolved address: {}", address);

        println!("Opening OpenVPN configuration file...");
        let profile = self
            .profile_path(&output, script)
            .ok_or_else(|| WrapperError::ConfigPathMissing(self.config.config_variable.clone()))?;

        println!("Exchanging current IPv6 address with address {} resolved...", address);
        let outcome = self.rewriter.rewrite(&FileDocument::new(&profile), address)?;

        match &outcome {
            RewriteOutcome::Changed { .. } => {
                println!(
                    "IPv6 address of server was successfully written to configuration file. Starting OpenVPN GUI..."
                );
            }
            RewriteOutcome::Unchanged => {
                println!(
                    "No changes on IPv6 address registered. Please check the correct behaviour of the attempted address resolution."
                );
                println!(
                    "Starting OpenVPN GUI in {} seconds, press Enter to start immediately...",
                    self.prompt.timeout().as_secs()
                );
                self.prompt.await_interrupt(self.prompt.timeout()).await;
            }
        }
        Ok(outcome)
    }

    /// Profile path from the resolver output, falling back to the script source.
    fn profile_path(&self, output: &ResolverOutput, script: &ScriptSource) -> Option<PathBuf> {
        let variable = &self.config.config_variable;
        let text = output.text();
        script::extract(&text, variable)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| script.variable(variable).map(PathBuf::from))
    }

    async fn launch(&self, script: &ScriptSource) -> Result<PathBuf, WrapperError> {
        if let Some(cached) = script.variable(&self.config.launcher_variable) {
            println!(
                "Using cached OpenVPN GUI program path automatically in {} seconds, press Enter to declare path manually again...",
                self.prompt.timeout().as_secs()
            );
            if self.prompt.await_interrupt(self.prompt.timeout()).await {
                return Err(WrapperError::LauncherNotFound);
            }

            let cached = PathBuf::from(cached);
            if cached.is_file() {
                return self.start(CandidateSource::Cached, cached);
            }
            tracing::warn!("Cached OpenVPN GUI path does not exist: {}", cached.display());
            println!("Cached path {} does not exist, trying default locations...", cached.display());
        }

        let (source, program) = launcher::locate_default(&self.config.launcher_candidates)
            .ok_or(WrapperError::LauncherNotFound)?;
        self.start(source, program)
    }

    fn start(&self, origin: CandidateSource, program: PathBuf) -> Result<PathBuf, WrapperError> {
        tracing::debug!("Launching {:?} candidate {}", origin, program.display());
        match self.spawner.spawn(&program) {
            Ok(()) => Ok(program),
            Err(source) => Err(WrapperError::LaunchFailed { path: program, source }),
        }
    }

    /// Asks for the launcher path on the console and caches it in the script.
    ///
    /// The old cached assignment is dropped from the script file whatever the
    /// operator answers.
    async fn select_launcher_manually(&self, script: &ScriptSource) -> Result<Option<PathBuf>, WrapperError> {
        let variable = &self.config.launcher_variable;

        let selected = loop {
            println!("Enter the full path of openvpn-gui.exe (empty line to cancel):");
            let Some(line) = self.prompt.read_line().await else {
                break None;
            };
            match launcher::parse_manual_path(&line) {
                None => break None,
                Some(path) if path.is_file() => break Some(path),
                Some(path) => println!("File not found: {}", path.display()),
            }
        };

        let Some(program) = selected else {
            script.persist_assignment(variable, None)?;
            return Ok(None);
        };

        if let Err(err) = self.start(CandidateSource::Manual, program.clone()) {
            script.persist_assignment(variable, None)?;
            return Err(err);
        }
        script.persist_assignment(variable, Some(&program.to_string_lossy()))?;
        Ok(Some(program))
    }

    /// Reports a step failure; only internal errors are passed on.
    async fn stop(&self, err: WrapperError) -> Result<RunOutcome, WrapperError> {
        if matches!(err, WrapperError::Internal(_)) {
            return Err(err);
        }
        report_failure(&self.prompt, &self.incidents, &err).await;
        Ok(RunOutcome::Stopped(err))
    }
}

fn print_lines(err: &WrapperError) {
    for line in err.console_lines() {
        println!("{}", line);
    }
}

/// Prints the failure, writes the incident log when the error calls for one,
/// then holds the console open for the prompt window.
pub async fn report_failure(prompt: &TimedPrompt, incidents: &IncidentLog, err: &WrapperError) {
    print_lines(err);

    if err.writes_incident() {
        tracing::error!("{} ({})", err.detail(), err.error_code());
        match incidents.record(err) {
            Ok(path) => println!("See {} for details.", path.display()),
            Err(e) => {
                tracing::error!("Failed to write error log: {:#}", e);
                println!("Error details: {}", err.detail());
            }
        }
    } else {
        tracing::warn!("{} ({})", err, err.error_code());
    }

    prompt.hold_before_exit().await;
}
