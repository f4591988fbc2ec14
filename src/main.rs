use std::sync::Arc;

use anyhow::{Context, Result};
use soliscan::{
    cli::{commands::analyzers::run_analyzers_list, Command, CommandLineArgs, GlobalArgs},
    reporter,
    runtime::DockerRuntime,
    scanner::{print_scan_summary, run_scan},
    sink::MemorySink,
    summarizer::{OpenAiSummarizer, Summarizer},
};
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_core::metadata::LevelFilter;
use tracing_subscriber::{
    fmt, prelude::__tracing_subscriber_SubscriberExt, registry, util::SubscriberInitExt,
};

fn main() -> Result<()> {
    let args = CommandLineArgs::parse_args();

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

fn setup_logging(global_args: &GlobalArgs) {
    let level = LevelFilter::from_level(global_args.log_level());
    let all_targets = global_args.verbose > 2;

    let filter = if all_targets {
        tracing_subscriber::filter::Targets::new().with_default(LevelFilter::TRACE)
    } else {
        // Per-target filtering, chatty only for this crate
        tracing_subscriber::filter::Targets::new()
            .with_default(LevelFilter::ERROR)
            .with_target("soliscan", level)
    };
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .without_time();
    registry().with(fmt_layer).with(filter).init();
}

async fn async_main(args: CommandLineArgs) -> Result<()> {
    setup_logging(&args.global_args);

    match args.command {
        Command::Scan(scan_args) => {
            let spec = scan_args.to_spec()?;
            let engine = DockerRuntime::connect()?;

            let summarizer: Option<Arc<dyn Summarizer>> = if scan_args.no_summarize {
                None
            } else {
                match OpenAiSummarizer::from_env()? {
                    Some(s) => Some(Arc::new(s)),
                    None => {
                        info!("No summarizer API key configured; keeping raw analyzer output");
                        None
                    }
                }
            };

            // Ctrl-C raises the cancellation token; in-flight container
            // cleanup still runs before the job unwinds.
            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling scan");
                    signal_cancel.cancel();
                }
            });

            let mut sink = MemorySink::new();
            let totals = run_scan(
                &spec,
                Arc::new(engine),
                summarizer,
                &mut sink,
                cancel,
                args.global_args.use_progress(),
            )
            .await?;

            for batch in sink.batches() {
                reporter::run(batch, &scan_args.output_args)?;
            }
            print_scan_summary(&totals, args.global_args.quiet);

            // Partial failures under --keep-going get their own exit code so
            // CI can tell them apart from a clean batch.
            if totals.failed > 0 {
                std::process::exit(201);
            }
        }
        Command::Analyzers(_) => run_analyzers_list(),
    }
    Ok(())
}
