//! Engine-neutral UI coordinate-space transform.

/// Bidirectional mapping between engine design-space and app authored-space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UiSpaceTransform {
    pub engine_width: f64,
    pub engine_height: f64,
    pub app_width: f64,
    pub app_height: f64,
}

impl UiSpaceTransform {
    pub fn identity(width: f64, height: f64) -> Self {
        Self {
            engine_width: width,
            engine_height: height,
            app_width: width,
            app_height: height,
        }
    }

    pub fn scale_x(&self) -> f64 {
        self.engine_width / self.app_width
    }

    pub fn scale_y(&self) -> f64 {
        self.engine_height / self.app_height
    }

    /// Scale applied to font sizes (and other isotropic metrics).
    pub fn font_scale(&self) -> f64 {
        self.scale_x().min(self.scale_y())
    }

    pub fn is_identity(&self) -> bool {
        (self.scale_x() - 1.0).abs() <= 1e-6 && (self.scale_y() - 1.0).abs() <= 1e-6
    }

    pub fn engine_to_app(&self, x: f64, y: f64) -> (f64, f64) {
        (x / self.scale_x(), y / self.scale_y())
    }

    pub fn app_to_engine(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_x(), y * self.scale_y())
    }
}

/// Resolve the app ↔ engine transform.
///
/// Falls back to identity when the app does not author in its own
/// resolution. Non-positive app dimensions are ignored.
pub fn resolve_ui_space_transform(
    engine_size: (f64, f64),
    app_design_resolution: Option<(f64, f64)>,
) -> UiSpaceTransform {
    let (engine_width, engine_height) = engine_size;
    match app_design_resolution {
        Some((app_width, app_height)) if app_width > 0.0 && app_height > 0.0 => UiSpaceTransform {
            engine_width,
            engine_height,
            app_width,
            app_height,
        },
        _ => UiSpaceTransform::identity(engine_width, engine_height),
    }
}
