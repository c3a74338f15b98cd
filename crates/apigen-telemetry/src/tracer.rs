//! Tracer setup and management

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::{SimpleSpanProcessor, TracerProvider};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Global tracer provider holder
static TRACER_PROVIDER: OnceLock<Arc<TracerProvider>> = OnceLock::new();

/// Span processor builders registered before initialization
type ProcessorBuilder = Box<dyn FnOnce() -> SimpleSpanProcessor + Send>;
static SPAN_PROCESSOR_BUILDERS: Mutex<Option<Vec<ProcessorBuilder>>> = Mutex::new(Some(Vec::new()));

/// Subscriber options
#[derive(Debug, Clone)]
pub struct TelemetryOptions {
    pub service_name: String,
    /// Emit log lines as JSON objects instead of human-readable text
    pub json_logs: bool,
}

impl Default for TelemetryOptions {
    fn default() -> Self {
        Self {
            service_name: crate::attributes::SYSTEM_NAME.to_string(),
            json_logs: false,
        }
    }
}

fn builders() -> MutexGuard<'static, Option<Vec<ProcessorBuilder>>> {
    SPAN_PROCESSOR_BUILDERS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Register a span processor builder to be used when telemetry is initialized.
///
/// Must be called BEFORE `init_telemetry()`; later registrations are ignored.
///
/// # Example
///
/// ```ignore
/// use apigen_telemetry::{register_span_processor, init_telemetry, TelemetryOptions};
/// use opentelemetry_sdk::trace::SimpleSpanProcessor;
///
/// register_span_processor(Box::new(|| {
///     SimpleSpanProcessor::new(Box::new(/* your exporter */))
/// }));
/// init_telemetry(TelemetryOptions::default());
/// ```
pub fn register_span_processor(builder: ProcessorBuilder) {
    if let Some(ref mut vec) = *builders() {
        vec.push(builder);
    } else {
        tracing::warn!("span processor registered after telemetry initialization; ignored");
    }
}

/// Initialize the global subscriber: env filter, fmt layer and OpenTelemetry layer.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_telemetry(options: TelemetryOptions) -> bool {
    // Take the span processor builders (can only initialize once)
    let processors = builders().take().unwrap_or_default();

    let mut provider_builder = TracerProvider::builder();
    for builder in processors {
        provider_builder = provider_builder.with_span_processor(builder());
    }
    let tracer_provider = provider_builder.build();
    let tracer = tracer_provider.tracer(options.service_name.clone());

    let _ = TRACER_PROVIDER.set(Arc::new(tracer_provider));

    let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    let json_layer = options.json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
    });
    let text_layer = (!options.json_logs).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_line_number(true)
    });

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(json_layer)
        .with(text_layer)
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}

/// Get the global tracer provider if initialized
pub fn tracer_provider() -> Option<Arc<TracerProvider>> {
    TRACER_PROVIDER.get().cloned()
}
