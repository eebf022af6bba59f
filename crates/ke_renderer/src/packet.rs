//! Backend-facing flattened draw packets.

use ke_types::{color_or_white, srgb_to_linear, CommandKind, DataValue, RenderCommand};

/// Backend-ready form of one [`RenderCommand`].
///
/// The transform is flattened to 16 floats and the payload is extended
/// with precomputed `srgb_rgba` and `linear_rgba` channels.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawPacket {
    pub kind: CommandKind,
    pub layer: i32,
    pub sort_key: String,
    pub transform: [f32; 16],
    pub data: Vec<(String, DataValue)>,
}

/// Translate one command into its packet.
///
/// The color channels derive from the command's `color` datum; anything
/// missing or unparseable is opaque white.
pub fn command_to_packet(command: &RenderCommand) -> DrawPacket {
    let srgb = command
        .datum("color")
        .and_then(DataValue::as_str)
        .map(color_or_white)
        .unwrap_or(ke_types::color::OPAQUE_WHITE);
    let linear = srgb_to_linear(srgb);

    let mut data = command.data.clone();
    data.push(("srgb_rgba".to_owned(), rgba_value(srgb)));
    data.push(("linear_rgba".to_owned(), rgba_value(linear)));

    DrawPacket {
        kind: command.kind,
        layer: command.layer,
        sort_key: command.sort_key.clone(),
        transform: command.transform.to_cols_array(),
        data,
    }
}

fn rgba_value(rgba: ke_types::Rgba) -> DataValue {
    DataValue::List(rgba.iter().map(|channel| DataValue::F64(*channel)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_carries_both_color_channels() {
        let command = RenderCommand::new(
            CommandKind::Rect,
            0,
            vec![("color".to_owned(), DataValue::Str("#808080".to_owned()))],
        );
        let packet = command_to_packet(&command);

        let srgb = packet
            .data
            .iter()
            .find(|(name, _)| name == "srgb_rgba")
            .map(|(_, value)| value.clone())
            .unwrap();
        let linear = packet
            .data
            .iter()
            .find(|(name, _)| name == "linear_rgba")
            .map(|(_, value)| value.clone())
            .unwrap();

        let DataValue::List(srgb) = srgb else { panic!() };
        let DataValue::List(linear) = linear else { panic!() };
        let srgb_r = srgb[0].as_f64().unwrap();
        let linear_r = linear[0].as_f64().unwrap();
        assert!((srgb_r - 128.0 / 255.0).abs() < 1e-9);
        assert!((linear_r - 0.2140).abs() < 5e-4);
        assert_eq!(srgb[3], DataValue::F64(1.0));
        assert_eq!(linear[3], DataValue::F64(1.0));
    }

    #[test]
    fn missing_color_defaults_to_white() {
        let command = RenderCommand::new(CommandKind::Text, 200, vec![]);
        let packet = command_to_packet(&command);
        let srgb = packet
            .data
            .iter()
            .find(|(name, _)| name == "srgb_rgba")
            .map(|(_, value)| value.clone())
            .unwrap();
        assert_eq!(
            srgb,
            DataValue::List(vec![
                DataValue::F64(1.0),
                DataValue::F64(1.0),
                DataValue::F64(1.0),
                DataValue::F64(1.0),
            ])
        );
    }

    #[test]
    fn transform_flattens_to_sixteen_floats() {
        let command = RenderCommand::new(CommandKind::Rect, 0, vec![]);
        let packet = command_to_packet(&command);
        assert_eq!(packet.transform.len(), 16);
        assert_eq!(packet.transform[0], 1.0);
        assert_eq!(packet.transform[5], 1.0);
    }
}
