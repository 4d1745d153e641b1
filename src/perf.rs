use std::time::Duration;

/// Wall-clock cost of each render pass, in milliseconds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PassTimings {
    pub layout_ms: f64,
    pub display_ms: f64,
    pub text_ms: f64,
    pub annotation_ms: f64,
}

impl PassTimings {
    pub fn record_layout(&mut self, elapsed: Duration) {
        self.layout_ms = millis(elapsed);
        log::info!("layer used: retrieve = {:.1}ms", self.layout_ms);
    }

    pub fn record_display(&mut self, elapsed: Duration) {
        self.display_ms = millis(elapsed);
        log::info!("display layer used: render = {:.1}ms", self.display_ms);
    }

    pub fn record_text(&mut self, elapsed: Duration) {
        self.text_ms = millis(elapsed);
        log::info!("text layer used: render = {:.1}ms", self.text_ms);
    }

    pub fn record_annotation(&mut self, elapsed: Duration) {
        self.annotation_ms = millis(elapsed);
        log::info!("annotation layer used: render = {:.1}ms", self.annotation_ms);
    }

    pub fn total_ms(&self) -> f64 {
        self.layout_ms + self.display_ms + self.text_ms + self.annotation_ms
    }
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
