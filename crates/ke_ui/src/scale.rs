//! Scaling of render snapshots from app-space into engine design-space.

use ke_types::{DataValue, RenderCommand, RenderPassSnapshot, RenderSnapshot};

use crate::transform::UiSpaceTransform;

/// Scale a snapshot's command payload from app-space into engine-space.
///
/// Identity transforms return the snapshot untouched. `x/w/width` scale
/// with the horizontal factor, `y/h/height` with the vertical one, and
/// isotropic metrics (`font_size`, `radius`, `thickness`) with the font
/// scale.
pub fn scale_render_snapshot(
    snapshot: RenderSnapshot,
    transform: &UiSpaceTransform,
) -> RenderSnapshot {
    if transform.is_identity() {
        return snapshot;
    }
    RenderSnapshot {
        frame_index: snapshot.frame_index,
        passes: snapshot
            .passes
            .into_iter()
            .map(|pass| RenderPassSnapshot {
                name: pass.name,
                commands: pass
                    .commands
                    .into_iter()
                    .map(|command| scale_render_command(command, transform))
                    .collect(),
            })
            .collect(),
    }
}

fn scale_render_command(command: RenderCommand, transform: &UiSpaceTransform) -> RenderCommand {
    let sx = transform.scale_x();
    let sy = transform.scale_y();
    let font_scale = transform.font_scale();

    let data = command
        .data
        .into_iter()
        .map(|(name, value)| {
            let scaled = match (name.as_str(), value.as_f64()) {
                ("x" | "w" | "width", Some(number)) => DataValue::F64(number * sx),
                ("y" | "h" | "height", Some(number)) => DataValue::F64(number * sy),
                ("font_size" | "radius" | "thickness", Some(number)) => {
                    DataValue::F64(number * font_scale)
                }
                _ => value,
            };
            (name, scaled)
        })
        .collect();

    RenderCommand {
        kind: command.kind,
        layer: command.layer,
        sort_key: command.sort_key,
        transform: command.transform,
        data,
    }
}
