use std::fmt;

/// Which cursor a watermark tracks.
///
/// Polling and notification watermarks are persisted separately so that each
/// stays idempotent across restarts on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatermarkKind {
    /// Newest item fetched by the background poller.
    Poll,
    /// Newest item an alert was emitted for.
    Notify,
}

impl WatermarkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WatermarkKind::Poll => "poll",
            WatermarkKind::Notify => "notify",
        }
    }
}

impl fmt::Display for WatermarkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
