// # svcpub - publish a service through the reverse proxy and DNS
//
// Interactive operator tool. One run: load settings, prompt for a service
// name, backend address, and scheme, append the router/service pair to the
// reverse proxy's dynamic config file, then create the matching CNAME
// record at Cloudflare.
//
// The binary is a thin integration layer: prompting, logging setup, and
// exit-status mapping. All publishing logic lives in svcpub-core.
//
// ## Configuration
//
// Read from the environment (an adjacent `.env` file is loaded first):
//
// - `CLOUDFLARE_API_TOKEN`: API token with Zone:DNS:Edit permission
// - `CLOUDFLARE_ZONE_ID`: zone to create the record in
// - `DOMAIN_NAME`: base domain services are published under
// - `CONFIG_FILE_PATH`: path to the dynamic config file
// - `CLOUDFLARE_PROXIED`: optional, `true` (default) or `false`
// - `AUTHELIA_CONFIG_PATH`: optional; when set, the published host is
//   also added to the auth portal's access-control rules
// - `SVCPUB_LOG_LEVEL`: optional, trace|debug|info|warn|error
//
// ## Exit status
//
// 0 on full success; otherwise non-zero, distinguishable by failure
// stage: 1 config-load, 2 input, 3 edit, 4 publish, 5 access-update.

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use svcpub_core::{
    AccessChange, Orchestrator, Outcome, Settings, Stage, collect_service_definition,
};
use svcpub_provider_cloudflare::CloudflareProvider;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes, one per failure stage
#[derive(Debug, Clone, Copy)]
enum AppExitCode {
    /// Config edited and record created
    Success = 0,
    /// Settings missing or invalid
    ConfigLoad = 1,
    /// Operator input rejected
    Input = 2,
    /// Dynamic config edit failed
    Edit = 3,
    /// DNS record creation failed
    Publish = 4,
    /// Access-control update failed
    AccessUpdate = 5,
}

impl From<AppExitCode> for ExitCode {
    fn from(code: AppExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<Stage> for AppExitCode {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::ConfigLoad => AppExitCode::ConfigLoad,
            Stage::Input => AppExitCode::Input,
            Stage::Edit => AppExitCode::Edit,
            Stage::Publish => AppExitCode::Publish,
            Stage::AccessUpdate => AppExitCode::AccessUpdate,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {}", e);
        return AppExitCode::ConfigLoad.into();
    }

    // Settings load before any prompting, so a missing credential fails fast
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("FAILED at config-load: {}", e);
            return AppExitCode::ConfigLoad.into();
        }
    };

    if let Err(e) = validate_settings(&settings) {
        eprintln!("FAILED at config-load: {}", e);
        return AppExitCode::ConfigLoad.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {}", e);
            return AppExitCode::ConfigLoad.into();
        }
    };

    match rt.block_on(run(settings)) {
        Ok(outcome) => {
            println!(
                "Success: router and service added to {} (backup: {})",
                outcome.change.config_path.display(),
                outcome.change.backup_path.display()
            );
            println!(
                "Success: CNAME record {} created (id: {})",
                outcome.record_name, outcome.record_id
            );
            match &outcome.access {
                Some(AccessChange::Updated(change)) => println!(
                    "Success: access rule updated in {} (backup: {})",
                    change.config_path.display(),
                    change.backup_path.display()
                ),
                Some(AccessChange::AlreadyListed) => {
                    println!("Success: host already covered by the access rules")
                }
                None => {}
            }
            AppExitCode::Success.into()
        }
        Err(e) => {
            let stage = e.stage();
            error!("run failed at stage {}: {}", stage, e);
            eprintln!("FAILED at {}: {}", stage, e);
            if stage == Stage::Publish {
                eprintln!("Note: the dynamic config edit was kept; see the backup for recovery.");
            }
            if stage == Stage::AccessUpdate {
                eprintln!(
                    "Note: the dynamic config edit and the DNS record were kept; \
                    only the access rules need manual attention."
                );
            }
            AppExitCode::from(stage).into()
        }
    }
}

/// One publishing run: prompt, edit, publish
async fn run(settings: Settings) -> svcpub_core::Result<Outcome> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let svc = collect_service_definition(&mut input, &mut output)?;
    info!(
        "publishing service '{}' at {} ({})",
        svc.name, svc.address, svc.scheme
    );

    let publisher = CloudflareProvider::new(settings.api_token.clone(), settings.zone_id.clone());
    let orchestrator = Orchestrator::new(&settings, &publisher);
    orchestrator.run(&svc).await
}

/// Catch obviously wrong tokens before prompting the operator
fn validate_settings(settings: &Settings) -> Result<()> {
    let token_lower = settings.api_token.to_lowercase();
    if token_lower.contains("your_token")
        || token_lower.contains("replace_me")
        || token_lower == "token"
    {
        anyhow::bail!(
            "CLOUDFLARE_API_TOKEN appears to be a placeholder. \
            Use an actual API token from your DNS provider."
        );
    }

    if settings.domain_name.contains('/') || !settings.domain_name.contains('.') {
        anyhow::bail!(
            "DOMAIN_NAME '{}' does not look like a domain name",
            settings.domain_name
        );
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    let level = match std::env::var("SVCPUB_LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
