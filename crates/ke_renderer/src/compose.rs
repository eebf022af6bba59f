//! Retained/immediate merge, pass resolution and deterministic sorting.

use indexmap::IndexMap;

use ke_types::{
    resolve_pass_descriptor, DataValue, RenderCommand, RenderPassSnapshot, RenderSnapshot,
};

/// The renderer's two command buffers.
///
/// `retained` is keyed `<kind>:<key>` with last-value-wins semantics
/// across frames; `immediate` is cleared every time the buffers are
/// composed into a snapshot.
#[derive(Default)]
pub struct SceneBuffers {
    retained: IndexMap<String, RenderCommand>,
    immediate: Vec<RenderCommand>,
}

impl SceneBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a retained command or append an immediate one.
    pub fn submit(&mut self, command: RenderCommand) {
        match command.retention_key() {
            Some(key) => {
                self.retained.insert(key, command);
            }
            None => self.immediate.push(command),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty() && self.immediate.is_empty()
    }

    pub fn retained_len(&self) -> usize {
        self.retained.len()
    }

    /// Merge the buffered commands into the snapshot's overlay pass.
    ///
    /// Retained commands (insertion order) followed by immediate ones are
    /// appended to the first pass canonicalizing to `overlay`; if none
    /// exists, a new `overlay` pass is appended. The immediate buffer is
    /// drained.
    pub fn compose_overlay(&mut self, snapshot: RenderSnapshot) -> RenderSnapshot {
        let mut overlay_commands: Vec<RenderCommand> =
            self.retained.values().cloned().collect();
        overlay_commands.append(&mut self.immediate);
        if overlay_commands.is_empty() {
            return snapshot;
        }

        let mut passes = snapshot.passes;
        let overlay_index = passes
            .iter()
            .position(|pass| resolve_pass_descriptor(&pass.name).canonical_name == "overlay");
        match overlay_index {
            Some(index) => passes[index].commands.append(&mut overlay_commands),
            None => passes.push(RenderPassSnapshot::new("overlay", overlay_commands)),
        }
        RenderSnapshot {
            frame_index: snapshot.frame_index,
            passes,
        }
    }
}

/// One canonicalized pass with its commands in final draw order.
#[derive(Clone, Debug, PartialEq)]
pub struct PassBatch {
    pub name: String,
    pub commands: Vec<RenderCommand>,
}

// The full deterministic ordering of commands within a pass. Arrival
// ordinal last, so equal commands keep their submission order.
type CommandSortKey = (
    i32,                          // layer
    String,                       // sort_key
    &'static str,                 // kind
    String,                       // retention key ("" when immediate)
    Vec<(String, DataValue)>,     // stable data repr
    Vec<DataValue>,               // stable transform repr
    usize,                        // ordinal
);

fn command_sort_key(command: &RenderCommand, ordinal: usize) -> CommandSortKey {
    (
        command.layer,
        command.sort_key.clone(),
        command.kind.as_str(),
        command.retention_key().unwrap_or_default(),
        command.data.clone(),
        command
            .transform
            .to_cols_array()
            .iter()
            .map(|value| DataValue::F64(f64::from(*value)))
            .collect(),
        ordinal,
    )
}

/// Sort every pass deterministically and order passes by priority.
///
/// Two snapshots with permuted but equal command sets produce identical
/// batch sequences.
pub fn build_pass_batches(snapshot: &RenderSnapshot) -> Vec<PassBatch> {
    let mut batches: Vec<(i32, PassBatch)> = snapshot
        .passes
        .iter()
        .map(|pass| {
            let descriptor = resolve_pass_descriptor(&pass.name);
            let mut indexed: Vec<(usize, &RenderCommand)> =
                pass.commands.iter().enumerate().collect();
            indexed.sort_by(|(ordinal_a, a), (ordinal_b, b)| {
                command_sort_key(a, *ordinal_a).cmp(&command_sort_key(b, *ordinal_b))
            });
            let commands = indexed.into_iter().map(|(_, command)| command.clone()).collect();
            (
                descriptor.priority,
                PassBatch {
                    name: descriptor.canonical_name,
                    commands,
                },
            )
        })
        .collect();
    batches.sort_by_key(|(priority, _)| *priority);
    batches.into_iter().map(|(_, batch)| batch).collect()
}

#[cfg(test)]
mod tests {
    use ke_types::CommandKind;

    use super::*;

    fn keyed_rect(key: &str, color: &str, layer: i32) -> RenderCommand {
        RenderCommand::new(
            CommandKind::Rect,
            layer,
            vec![
                ("key".to_owned(), DataValue::Str(key.to_owned())),
                ("color".to_owned(), DataValue::Str(color.to_owned())),
            ],
        )
    }

    fn immediate_text(text: &str, layer: i32) -> RenderCommand {
        RenderCommand::new(
            CommandKind::Text,
            layer,
            vec![
                ("key".to_owned(), DataValue::Null),
                ("text".to_owned(), DataValue::Str(text.to_owned())),
            ],
        )
    }

    #[test]
    fn retained_upserts_last_value_wins() {
        let mut buffers = SceneBuffers::new();
        buffers.submit(keyed_rect("r", "#ff0000", 0));
        buffers.submit(keyed_rect("r", "#00ff00", 0));
        buffers.submit(immediate_text("X", 200));
        assert_eq!(buffers.retained_len(), 1);

        let composed = buffers.compose_overlay(RenderSnapshot::empty(0));
        assert_eq!(composed.passes.len(), 1);
        assert_eq!(composed.passes[0].name, "overlay");

        let batches = build_pass_batches(&composed);
        assert_eq!(batches.len(), 1);
        let commands = &batches[0].commands;
        assert_eq!(commands.len(), 2);
        // Layer order: rect (0) before text (200); the rect is the green upsert.
        assert_eq!(commands[0].kind, CommandKind::Rect);
        assert_eq!(
            commands[0].datum("color"),
            Some(&DataValue::Str("#00ff00".to_owned()))
        );
        assert_eq!(commands[1].kind, CommandKind::Text);
    }

    #[test]
    fn immediate_buffer_is_drained_on_compose() {
        let mut buffers = SceneBuffers::new();
        buffers.submit(immediate_text("once", 0));
        let first = buffers.compose_overlay(RenderSnapshot::empty(0));
        assert_eq!(first.passes[0].commands.len(), 1);
        let second = buffers.compose_overlay(RenderSnapshot::empty(1));
        assert!(second.passes.is_empty());
    }

    #[test]
    fn overlay_merges_into_existing_overlay_pass() {
        let mut buffers = SceneBuffers::new();
        buffers.submit(keyed_rect("r", "#123456", 0));
        let external = RenderSnapshot {
            frame_index: 5,
            passes: vec![
                RenderPassSnapshot::new("world", vec![immediate_text("w", 0)]),
                RenderPassSnapshot::new("ui", vec![immediate_text("u", 0)]),
            ],
        };
        let composed = buffers.compose_overlay(external);
        assert_eq!(composed.passes.len(), 2);
        // Merged into the "ui" pass (canonical overlay), not a new one.
        assert_eq!(composed.passes[1].commands.len(), 2);
    }

    #[test]
    fn pass_priority_orders_world_overlay_post() {
        let snapshot = RenderSnapshot {
            frame_index: 0,
            passes: vec![
                RenderPassSnapshot::new("post_bloom", vec![]),
                RenderPassSnapshot::new("hud", vec![]),
                RenderPassSnapshot::new("main", vec![]),
            ],
        };
        let batches = build_pass_batches(&snapshot);
        let names: Vec<&str> = batches.iter().map(|batch| batch.name.as_str()).collect();
        assert_eq!(names, ["world", "overlay", "post_bloom"]);
    }

    #[test]
    fn sorting_is_permutation_invariant() {
        let commands = vec![
            keyed_rect("a", "#111111", 2),
            immediate_text("t", 2),
            keyed_rect("b", "#222222", -1),
            immediate_text("s", 0),
        ];
        let forward = RenderSnapshot {
            frame_index: 0,
            passes: vec![RenderPassSnapshot::new("overlay", commands.clone())],
        };
        let mut reversed_commands = commands;
        reversed_commands.reverse();
        let reversed = RenderSnapshot {
            frame_index: 0,
            passes: vec![RenderPassSnapshot::new("overlay", reversed_commands)],
        };

        assert_eq!(build_pass_batches(&forward), build_pass_batches(&reversed));
    }

    #[test]
    fn equal_commands_keep_submission_order() {
        let twin = immediate_text("same", 0);
        let snapshot = RenderSnapshot {
            frame_index: 0,
            passes: vec![RenderPassSnapshot::new(
                "overlay",
                vec![twin.clone(), twin.clone()],
            )],
        };
        let batches = build_pass_batches(&snapshot);
        assert_eq!(batches[0].commands.len(), 2);
    }

    #[test]
    fn negative_layers_draw_first() {
        let snapshot = RenderSnapshot {
            frame_index: 0,
            passes: vec![RenderPassSnapshot::new(
                "overlay",
                vec![immediate_text("front", 200), keyed_rect("bg", "#000000", -10000)],
            )],
        };
        let batches = build_pass_batches(&snapshot);
        assert_eq!(batches[0].commands[0].kind, CommandKind::Rect);
    }
}
