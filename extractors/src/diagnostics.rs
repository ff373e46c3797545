use shared_types::{DiagnosticSink, ExtractionEvent};
use tracing::{debug, warn};

/// Forwards extraction diagnostics to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: ExtractionEvent) {
        match event {
            ExtractionEvent::Attempted { source } => {
                debug!("Attempting to parse {} email", source.display_name());
            }
            ExtractionEvent::FieldMissing { source, field } => {
                warn!(
                    source = %source,
                    field = %field,
                    "Required field not found in {} email",
                    source.display_name()
                );
            }
            ExtractionEvent::FieldInvalid {
                source,
                field,
                raw,
                reason,
            } => {
                warn!(
                    source = %source,
                    field = %field,
                    raw = %raw,
                    "Failed to normalize {} value: {}",
                    field,
                    reason
                );
            }
            ExtractionEvent::RecordRejected { source, reason } => {
                warn!(source = %source, "Rejected extracted record: {}", reason);
            }
            ExtractionEvent::Matched { source } => {
                debug!("Successfully parsed {} email", source.display_name());
            }
        }
    }
}
