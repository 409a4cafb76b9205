#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDecision {
    pub capture: bool,
    pub upload: bool,
}

/// Decides from a reminder's duration whether chat context gets attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapturePolicy {
    pub min_duration: f64,
    /// May be `f64::INFINITY`.
    pub max_duration: f64,
    pub upload_configured: bool,
}

impl CapturePolicy {
    pub fn new(min_duration: f64, max_duration: f64, upload_configured: bool) -> Self {
        Self {
            min_duration,
            max_duration,
            upload_configured,
        }
    }

    pub fn decide(&self, duration_seconds: f64) -> CaptureDecision {
        let capture = self.min_duration <= duration_seconds && duration_seconds <= self.max_duration;

        CaptureDecision {
            capture,
            upload: capture && self.upload_configured,
        }
    }
}
