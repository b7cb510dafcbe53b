//! Field extraction: a pluggable primary extractor with a deterministic
//! regex fallback that guarantees extraction never fails the pipeline.

pub mod fallback;
pub mod gemini;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ExtractorError;
use crate::pipeline::types::ExtractionResult;

pub use fallback::FallbackExtractor;
pub use gemini::GeminiExtractor;

/// A structured-field extractor. Implementations may call out to external
/// services and are bounded by the stack's timeout.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    async fn extract(&self, text: &str) -> Result<ExtractionResult, ExtractorError>;
}

/// Primary-plus-fallback extractor arrangement.
///
/// The primary is optional and best-effort: any failure or timeout is logged
/// and recovered by the fallback, so `extract` itself is infallible.
pub struct ExtractorStack {
    primary: Option<Arc<dyn Extractor>>,
    fallback: FallbackExtractor,
    timeout: Duration,
}

impl ExtractorStack {
    pub fn new(primary: Arc<dyn Extractor>, timeout: Duration) -> Self {
        Self {
            primary: Some(primary),
            fallback: FallbackExtractor::new(),
            timeout,
        }
    }

    /// Stack with no primary configured; every message goes through the
    /// regex extractor directly.
    pub fn fallback_only() -> Self {
        Self {
            primary: None,
            fallback: FallbackExtractor::new(),
            timeout: Duration::ZERO,
        }
    }

    pub async fn extract(&self, text: &str) -> ExtractionResult {
        let Some(primary) = &self.primary else {
            return self.fallback.parse(text);
        };

        match self.run_primary(primary, text).await {
            Ok(result) => result,
            Err(err) => {
                warn!(extractor = primary.name(), error = %err, "primary extractor failed, using fallback");
                self.fallback.parse(text)
            }
        }
    }

    /// Run the primary under the configured timeout, surfacing an elapsed
    /// deadline as a typed extractor error.
    async fn run_primary(
        &self,
        primary: &Arc<dyn Extractor>,
        text: &str,
    ) -> Result<ExtractionResult, ExtractorError> {
        match tokio::time::timeout(self.timeout, primary.extract(text)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractorError::Timeout {
                extractor: primary.name().to_string(),
                timeout: self.timeout,
            }),
        }
    }
}
