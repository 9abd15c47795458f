use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use doc_submit::DEFAULT_HOST;
use doc_submit::Document;
use doc_submit::DocumentSubmitter;
use doc_submit::SubmitError;
use doc_submit::SubmitterConfig;
use hdrhistogram::Histogram;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tower::BoxError;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Submit documents to the registry without exceeding a rolling rate limit.
#[derive(Parser, Debug)]
#[command(name = "doc-submit", version, about)]
struct Args {
    /// Registry base URL
    #[arg(long, env = "DOC_SUBMIT_HOST", default_value = DEFAULT_HOST)]
    host: Url,

    /// Value sent in the Signature header
    #[arg(long, env = "DOC_SUBMIT_SIGNATURE")]
    signature: String,

    /// Submissions allowed per window
    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Length of the rolling window, e.g. "1m" or "500ms"
    #[arg(long, default_value = "1m", value_parser = humantime::parse_duration)]
    window: Duration,

    /// Per request HTTP timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Give up on a submission not admitted within this long
    #[arg(long, value_parser = humantime::parse_duration)]
    max_wait: Option<Duration>,

    /// How many times to submit the document
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// JSON document to submit. An empty document is sent when omitted.
    document: Option<PathBuf>,
}

impl Args {
    fn config(&self) -> SubmitterConfig {
        let mut config = SubmitterConfig::new(self.host.clone())
            .with_limit(self.limit)
            .with_window(self.window);
        if let Some(timeout) = self.timeout {
            config = config.with_request_timeout(timeout);
        }
        if let Some(max_wait) = self.max_wait {
            config = config.with_max_wait(max_wait);
        }
        config
    }
}

#[derive(Default)]
struct FailureCounter {
    abandoned: usize,
    transport: usize,
    other: usize,
}

impl FailureCounter {
    fn count(&mut self, err: &SubmitError) {
        match err {
            SubmitError::Cancelled(_) => self.abandoned += 1,
            SubmitError::Transport(_) => self.transport += 1,
            _ => self.other += 1,
        }
    }

    fn total(&self) -> usize {
        self.abandoned + self.transport + self.other
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let document = match &args.document {
        Some(path) => Document::from_wire(&tokio::fs::read_to_string(path).await?)?,
        None => Document::default(),
    };
    let config = args.config();
    let submitter = DocumentSubmitter::from_config(&config)?;
    info!(
        host = %config.host(),
        limit = config.limit(),
        window = ?config.window(),
        count = args.count,
        "submitting"
    );

    let document = Arc::new(document);
    let mut tasks = JoinSet::new();
    let start = Instant::now();
    for i in 0..args.count {
        let submitter = submitter.clone();
        let document = Arc::clone(&document);
        let signature = args.signature.clone();
        tasks.spawn(async move {
            let req_start = Instant::now();
            let outcome = submitter.submit(&document, &signature).await;
            (i, outcome, req_start.elapsed())
        });
    }

    let mut waits = Histogram::<u64>::new_with_bounds(1, 24 * 60 * 60 * 1_000, 3)?;
    let mut failures = FailureCounter::default();
    while let Some(task) = tasks.join_next().await {
        let (i, outcome, elapsed) = task?;
        match outcome {
            Ok(result) => {
                println!("[{i:03}] {result}");
                waits.saturating_record(elapsed.as_millis() as u64);
            }
            Err(err) => {
                println!("[{i:03}] error: {err}");
                failures.count(&err);
            }
        }
    }

    let succeeded = args.count - failures.total();
    println!("--- Summary ---");
    println!("Total Duration:  {:.2?}", start.elapsed());
    println!("Success/Total:   {}/{}", succeeded, args.count);
    if succeeded > 0 {
        println!("P50 (Elapsed):   {}ms", waits.value_at_quantile(0.5));
        println!("P99 (Elapsed):   {}ms", waits.value_at_quantile(0.99));
        println!("Max (Elapsed):   {}ms", waits.max());
    }
    if failures.total() > 0 {
        println!("Errors:          {}", failures.total());
        println!("  └─ Abandoned:  {}", failures.abandoned);
        println!("  └─ Transport:  {}", failures.transport);
        if failures.other > 0 {
            println!("  └─ Other:      {}", failures.other);
        }
    }

    Ok(())
}
