//! CLI entrypoint for llm-council
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Result, bail};
use clap::Parser;
use council_application::{
    AccountProfile, AccountRole, BillingProfile, ConversationStore, CouncilConfig,
    CouncilOrchestrator, QuotaLedger, StreamTurnInput, StreamTurnUseCase, TitleGenerator,
    TurnInput, TurnOutput,
};
use council_domain::{Model, Plan, TurnEvent};
use council_infrastructure::{
    ConfigLoader, InMemoryStore, JsonlTurnLogger, OpenRouterGateway, ResolvedConfig,
    supabase::{SupabaseRest, SupabaseStore},
};
use council_presentation::{
    Cli, ConsoleFormatter, EventReporter, OutputFormat, ProgressReporter, SimpleProgress,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.show_config {
        print_config_sources(&cli);
        return Ok(());
    }

    let file = ConfigLoader::load(cli.config.as_ref())?;
    let mut resolved = ConfigLoader::resolve(file)?;
    apply_model_overrides(&mut resolved.council, &cli);

    info!("Starting llm-council");

    let question = match cli.question.clone() {
        Some(q) => q,
        None => bail!("Question is required."),
    };

    // === Dependency Injection ===
    let gateway = Arc::new(match &resolved.openrouter_api_url {
        Some(url) => OpenRouterGateway::with_api_url(&resolved.openrouter_api_key, url),
        None => OpenRouterGateway::new(&resolved.openrouter_api_key),
    });

    if !cli.quiet {
        print_header(&question, &resolved.council.council);
    }

    let result = if cli.stream {
        // Supabase-backed when credentials are configured, in-memory otherwise
        match &resolved.supabase {
            Some(creds) => {
                let rest = SupabaseRest::new(&creds.url, &creds.secret_key);
                let store = Arc::new(SupabaseStore::new(rest));
                run_stream(&cli, &question, &resolved, gateway, store).await?
            }
            None => {
                let store = Arc::new(InMemoryStore::new());
                run_stream(&cli, &question, &resolved, gateway, store).await?
            }
        }
    } else {
        let orchestrator = CouncilOrchestrator::new(gateway, resolved.council.clone());
        let mut input = TurnInput::new(question);
        if let Some(session_id) = &cli.session_id {
            input = input.with_session_id(session_id.clone());
        }
        Some(orchestrator.execute(&input).await?)
    };

    let Some(result) = result else {
        // Terminal event was Cancelled or Error; the reporter already said so
        return Ok(());
    };

    let output = match cli.output {
        OutputFormat::Full => ConsoleFormatter::format(&result),
        OutputFormat::Synthesis => ConsoleFormatter::format_synthesis_only(&result),
        OutputFormat::Json => ConsoleFormatter::format_json(&result),
    };

    println!("{}", output);

    Ok(())
}

/// Run the full streaming pipeline against the given store.
///
/// Creates a fresh conversation, streams the turn with Ctrl-C mapped to
/// cancellation, and reassembles the stage payloads into a [`TurnOutput`]
/// when the turn completes.
async fn run_stream<S: ConversationStore + 'static>(
    cli: &Cli,
    question: &str,
    resolved: &ResolvedConfig,
    gateway: Arc<OpenRouterGateway>,
    store: Arc<S>,
) -> Result<Option<TurnOutput>> {
    let config = resolved.council.clone();
    let orchestrator = Arc::new(CouncilOrchestrator::new(gateway.clone(), config.clone()));
    let titles = Arc::new(TitleGenerator::new(gateway, config.clone()));
    let ledger = Arc::new(QuotaLedger::new(store.clone(), config.clone()));
    let use_case = StreamTurnUseCase::new(orchestrator, titles, ledger, store.clone(), config);

    let account = local_account(cli.pro);
    let conversation = store.create_conversation(&account.id).await?;

    let cancellation = CancellationToken::new();
    let ctrl_c = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut stream = use_case
        .execute(StreamTurnInput {
            conversation_id: conversation.id,
            account,
            query: question.to_string(),
            attachments: Vec::new(),
            timezone: cli.timezone.clone(),
            cancellation,
        })
        .await?;

    let reporter: Option<Box<dyn EventReporter>> = if cli.quiet {
        None
    } else if cli.verbose > 0 {
        // Spinners and log lines fight over the terminal
        Some(Box::new(SimpleProgress))
    } else {
        Some(Box::new(ProgressReporter::new()))
    };
    let logger = resolved
        .turn_log
        .as_ref()
        .and_then(JsonlTurnLogger::new);

    let mut stage1 = Vec::new();
    let mut stage2 = Vec::new();
    let mut stage3 = None;
    let mut metadata = None;

    while let Some(event) = stream.next_event().await {
        if let Some(logger) = &logger {
            logger.log(&event);
        }
        if let Some(reporter) = &reporter {
            reporter.on_event(&event);
        }
        match event {
            TurnEvent::Stage1Complete { data } => stage1 = data,
            TurnEvent::Stage2Complete { data, .. } => stage2 = data,
            TurnEvent::Stage3Complete { data } => stage3 = Some(data),
            TurnEvent::Complete { metadata: m, .. } => metadata = Some(m),
            _ => {}
        }
    }

    Ok(match (stage3, metadata) {
        (Some(stage3), Some(metadata)) => Some(TurnOutput {
            stage1,
            stage2,
            stage3,
            metadata,
        }),
        _ => None,
    })
}

fn local_account(pro: bool) -> AccountProfile {
    AccountProfile {
        id: "local".to_string(),
        email: None,
        role: AccountRole::User,
        billing: BillingProfile {
            plan: if pro { Plan::Pro } else { Plan::Free },
            stripe_customer_id: None,
            stripe_subscription_id: None,
        },
    }
}

fn apply_model_overrides(config: &mut CouncilConfig, cli: &Cli) {
    if !cli.model.is_empty() {
        // Model::from_str is infallible; unknown ids become Custom(...)
        config.council = cli.model.iter().map(|s| s.parse().unwrap()).collect();
    }
    if let Some(chairman) = &cli.chairman {
        config.chairman = chairman.parse().unwrap();
    }
}

fn print_header(question: &str, council: &[Model]) {
    println!();
    println!("+============================================================+");
    println!("|                 llm-council - LLM Council                  |");
    println!("+============================================================+");
    println!();
    println!("Question: {}", question);
    println!(
        "Council: {}",
        council
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
}

fn print_config_sources(cli: &Cli) {
    println!("Configuration sources (highest priority first):");
    println!("  1. COUNCIL_* environment variables (e.g. COUNCIL_OPENROUTER__API_KEY)");
    if let Some(path) = &cli.config {
        println!("  2. --config {}", path.display());
    } else {
        println!("  2. --config <path> (not set)");
    }
    for filename in ["council.toml", ".council.toml"] {
        let exists = std::path::Path::new(filename).exists();
        println!(
            "  3. ./{} {}",
            filename,
            if exists { "(present)" } else { "(absent)" }
        );
    }
    match ConfigLoader::global_config_path() {
        Some(path) => {
            let exists = path.exists();
            println!(
                "  4. {} {}",
                path.display(),
                if exists { "(present)" } else { "(absent)" }
            );
        }
        None => println!("  4. <no global config directory>"),
    }
}
