//! LLM call instrumentation.

use tracing::{field, span, Level, Span};

/// Which pipeline stage issued a completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Question to candidate SQL
    Generate,
    /// Candidate SQL self-check
    Validate,
}

impl PipelineStage {
    /// Get stage name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Validate => "validate",
        }
    }
}

/// Create a span around one completion call.
///
/// # Arguments
///
/// * `stage` - Pipeline stage making the call
/// * `provider` - Provider name (`gen_ai.system`)
/// * `model` - Requested model
pub fn llm_span(stage: PipelineStage, provider: &str, model: &str) -> Span {
    span!(
        Level::INFO,
        "gen_ai.chat",
        otel.name = %format!("chat {}", model),
        otel.kind = "client",
        gen_ai.operation.name = "chat",
        gen_ai.system = provider,
        gen_ai.request.model = model,
        pipeline.stage = stage.as_str(),
        gen_ai.usage.input_tokens = field::Empty,
        gen_ai.usage.output_tokens = field::Empty,
        attempts = field::Empty,
    )
}

/// Record token usage reported by the provider in the current span.
pub fn record_llm_usage(input_tokens: Option<u64>, output_tokens: Option<u64>) {
    let span = Span::current();
    if let Some(tokens) = input_tokens {
        span.record("gen_ai.usage.input_tokens", tokens);
    }
    if let Some(tokens) = output_tokens {
        span.record("gen_ai.usage.output_tokens", tokens);
    }
}

/// Record how many attempts a call took.
pub fn record_llm_attempts(attempts: u32) {
    Span::current().record("attempts", attempts);
}
