//! The built-in metrics overlay (toggled with the overlay key).

use ke_diagnostics::MetricsSnapshot;
use ke_renderer::{RenderApi, TextAnchor};

/// Renders a small metrics readout through [`RenderApi`] primitives.
pub struct DebugOverlay {
    key_prefix: String,
    x: f64,
    y: f64,
    line_height: f64,
    font_size: f64,
    z_text: f64,
}

impl Default for DebugOverlay {
    fn default() -> Self {
        Self {
            key_prefix: "debug:overlay".to_owned(),
            x: 2.0,
            y: 2.0,
            line_height: 9.0,
            font_size: 6.0,
            z_text: 5001.0,
        }
    }
}

impl DebugOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the overlay for the current metrics snapshot.
    pub fn draw(
        &self,
        renderer: &mut dyn RenderApi,
        snapshot: &MetricsSnapshot,
    ) -> Result<(), ke_renderer::RenderError> {
        let lines = self.format_lines(snapshot);
        let (text_x, text_y) = renderer.to_design_space(self.x, self.y);
        for (index, line) in lines.iter().enumerate() {
            renderer.add_text(
                Some(&format!("{}:line:{index}", self.key_prefix)),
                line,
                text_x,
                text_y + index as f64 * self.line_height,
                self.font_size,
                "#e5e7eb66",
                TextAnchor::TopLeft,
                self.z_text,
                false,
            )?;
        }
        Ok(())
    }

    pub fn format_lines(&self, snapshot: &MetricsSnapshot) -> Vec<String> {
        let Some(last) = &snapshot.last_frame else {
            return vec![
                "Diagnostics: waiting for first frame".to_owned(),
                "FPS=0.00".to_owned(),
                "FrameMs=0.00".to_owned(),
                "SchedulerQ=0".to_owned(),
                "Events=0".to_owned(),
                "1) -".to_owned(),
                "2) -".to_owned(),
                "3) -".to_owned(),
            ];
        };
        let mut lines = vec![
            format!("Frame {}", last.frame_index),
            format!("FPS={:.2}", snapshot.rolling_fps),
            format!("FrameMs={:.2}", last.dt_ms),
            format!("SchedulerQ={}", last.scheduler_queue_size),
            format!("Events={}", last.event_publish_count),
        ];
        for index in 0..3 {
            match snapshot.top_systems_last_frame.get(index) {
                Some((system_id, elapsed_ms)) => {
                    lines.push(format!("{}) {system_id}: {elapsed_ms:.2} ms", index + 1));
                }
                None => lines.push(format!("{}) -", index + 1)),
            }
        }
        lines
    }
}
