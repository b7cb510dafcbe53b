use std::io::BufRead;
use std::sync::Arc;

use sms_triage::config::PipelineConfig;
use sms_triage::extract::{Extractor, GeminiExtractor, gemini};
use sms_triage::pipeline::{PipelineStatus, RawMessage, SmsPipeline};
use sms_triage::store::{LibSqlStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = PipelineConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let model = std::env::var("SMS_TRIAGE_MODEL").unwrap_or_else(|_| gemini::DEFAULT_MODEL.into());

    // The primary extractor is optional; without a key the regex fallback
    // handles everything.
    let primary: Option<Arc<dyn Extractor>> = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            eprintln!("📨 SMS Triage v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   Extractor: gemini ({model})");
            Some(Arc::new(GeminiExtractor::new(
                secrecy::SecretString::from(key),
                model,
            )))
        }
        _ => {
            eprintln!("📨 SMS Triage v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("   Extractor: regex fallback (GEMINI_API_KEY not set)");
            None
        }
    };
    eprintln!("   One SMS per line on stdin, optionally \"sender|text\". Ctrl-D to finish.\n");

    let db_path =
        std::env::var("SMS_TRIAGE_DB_PATH").unwrap_or_else(|_| "./data/sms-triage.db".to_string());
    let store: Arc<dyn Store> = Arc::new(
        LibSqlStore::new_local(std::path::Path::new(&db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {db_path}: {e}");
                std::process::exit(1);
            }),
    );

    let pipeline = SmsPipeline::new(Arc::clone(&store), &config, primary);

    let mut processed = 0u64;
    let mut filtered = 0u64;
    let mut errors = 0u64;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        // "sender|text" or bare text
        let (sender, text) = match line.split_once('|') {
            Some((sender, text)) if !sender.trim().is_empty() => {
                (Some(sender.trim().to_string()), text.trim().to_string())
            }
            _ => (None, line.trim().to_string()),
        };

        let result = pipeline.process(RawMessage::new(text, sender)).await;
        match result.status {
            PipelineStatus::Success => processed += 1,
            PipelineStatus::FilteredOut => filtered += 1,
            PipelineStatus::Error => errors += 1,
        }
        println!("{}", serde_json::to_string(&result)?);
    }

    // Detached writes may still be in flight; the summary counts need them.
    pipeline.flush_writes().await;

    eprintln!("\nSummary:");
    eprintln!("  processed:    {processed}");
    eprintln!("  filtered out: {filtered}");
    eprintln!("  errors:       {errors}");
    eprintln!("  stored transactions: {}", store.count_transactions().await?);
    eprintln!("  stored fraud logs:   {}", store.count_fraud_logs().await?);
    eprintln!("  stored promotional:  {}", store.count_promotional().await?);

    Ok(())
}
