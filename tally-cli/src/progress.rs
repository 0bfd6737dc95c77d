use tally_ai::ProgressEvent;

/// Progress sink for long-running commands: events go to the log and to
/// stderr, and are kept for the activity entry.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Vec<String>,
}

impl ProgressLog {
    pub fn record(&mut self, event: &ProgressEvent) {
        tracing::info!(%event, "progress");
        eprintln!("  {event}");
        self.events.push(event.to_string());
    }

    pub fn into_events(self) -> Vec<String> {
        self.events
    }
}
