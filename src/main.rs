use openvpn_wrapper::config::WrapperConfig;
use openvpn_wrapper::error::WrapperError;
use openvpn_wrapper::incident::IncidentLog;
use openvpn_wrapper::launcher::DetachedSpawner;
use openvpn_wrapper::prompt::TimedPrompt;
use openvpn_wrapper::resolver::PowerShellResolver;
use openvpn_wrapper::rewriter::ConfigRewriter;
use openvpn_wrapper::workflow::{report_failure, RunOutcome, Wrapper};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 콘솔 안내 문구(stdout)와 섞이지 않도록 진단 로그는 stderr로
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OPENVPN_WRAPPER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (cfg, cfg_error) = match WrapperConfig::load() {
        Ok(cfg) => (cfg, None),
        Err(e) => (WrapperConfig::default(), Some(e)),
    };

    let prompt = TimedPrompt::stdin(cfg.prompt_timeout());
    let incidents = IncidentLog::new(&cfg.log_dir);

    if let Some(e) = cfg_error {
        report_failure(&prompt, &incidents, &WrapperError::Internal(e)).await;
        return Ok(());
    }

    let resolver = PowerShellResolver::new(
        cfg.interpreter.clone(),
        cfg.execution_policy.clone(),
        cfg.resolver_timeout(),
    );
    let Some(wrapper) = Wrapper::assemble(
        cfg,
        prompt,
        resolver,
        DetachedSpawner,
        incidents,
        ConfigRewriter::new(),
    )
    .await
    else {
        return Ok(());
    };

    match wrapper.run().await {
        Ok(RunOutcome::Launched { program, rewrite }) => {
            tracing::info!("Started {} ({:?})", program.display(), rewrite);
        }
        Ok(RunOutcome::Stopped(err)) => {
            tracing::info!("Run stopped: {}", err.error_code());
        }
        Ok(RunOutcome::Cancelled) => {
            tracing::info!("Launcher selection cancelled");
        }
        Err(err) => {
            // 예상하지 못한 실패: 항상 로그 파일 + 대기
            report_failure(wrapper.prompt(), wrapper.incidents(), &err).await;
        }
    }

    Ok(())
}
