use anyhow::Context;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use size_reporter::{
    Config, FunctionResponse, MessageSink, ObjectStore, S3ObjectStore, SizeReportProcessor,
    SqsMessageSink, UploadEvent,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(
        service = %config.service.name,
        queue_url = %config.queue.url,
        "Starting size reporter"
    );

    // Initialize external collaborators once; they are shared read-only
    // across invocations.
    let store = S3ObjectStore::new(&config.s3)
        .await
        .context("Failed to initialize object store")?;
    let sink = SqsMessageSink::new(&config.queue)
        .await
        .context("Failed to initialize message sink")?;

    let processor = SizeReportProcessor::new(store, sink);

    run(service_fn(|event| function_handler(event, &processor))).await
}

async fn function_handler<S, Q>(
    event: LambdaEvent<UploadEvent>,
    processor: &SizeReportProcessor<S, Q>,
) -> Result<FunctionResponse, Error>
where
    S: ObjectStore,
    Q: MessageSink,
{
    info!(records = event.payload.records.len(), "Received event");
    Ok(processor.handle(event.payload).await?)
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}
