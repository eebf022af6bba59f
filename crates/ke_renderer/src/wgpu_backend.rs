//! The wgpu-backed render backend.

use std::path::PathBuf;

use ke_config::RendererConfig;
use ke_types::{SurfaceHandle, WindowResizeEvent};

use crate::backend::{plan_upload, OwnerThread, RenderBackend, ResizeTelemetry, UploadMode};
use crate::error::{BackendInitDetails, RenderError};
use crate::packet::DrawPacket;

const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;
const SURFACE_FORMAT_NAME: &str = "bgra8unorm-srgb";

/// Backend owning the wgpu device, queue, pipelines and frame target.
///
/// Rendering goes to an owned offscreen color target
/// (`RENDER_ATTACHMENT | COPY_SRC`); presentation submits the encoded
/// command buffer. Device and adapter are acquired once and reused for
/// the renderer's whole lifetime, including across resizes.
pub struct WgpuBackend {
    owner: OwnerThread,
    device: wgpu::Device,
    queue: wgpu::Queue,
    selected_backend: String,
    adapter_info: serde_json::Map<String, serde_json::Value>,
    font_path: PathBuf,
    present_mode: String,
    geometry_pipeline: wgpu::RenderPipeline,
    text_pipeline: wgpu::RenderPipeline,
    frame_view: wgpu::TextureView,
    encoder: Option<wgpu::CommandEncoder>,
    frame_in_flight: bool,
    title: String,
    target_width: u32,
    target_height: u32,
    dpi_scale: f64,
    upload_threshold: usize,
    upload_mode_last: UploadMode,
    stream_write_cursor: u64,
    reconfigure_retry_limit: u32,
    reconfigure_attempts_last: u32,
    reconfigure_failures: u64,
}

impl WgpuBackend {
    /// Run the full initialization sequence.
    ///
    /// Any failing step wraps into [`RenderError::BackendInit`] with
    /// structured details.
    pub fn new(
        surface: Option<&SurfaceHandle>,
        config: &RendererConfig,
        vsync: bool,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let _ = surface; // opaque; the frame target is renderer-owned

        let (adapter, selected_backend) = request_adapter(&config.backends)?;
        let adapter_info = describe_adapter(&adapter);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("kestrel.device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ))
        .map_err(|err| {
            RenderError::backend_init(
                "device request failed",
                BackendInitDetails {
                    selected_backend: selected_backend.clone(),
                    adapter_info: adapter_info.clone(),
                    attempted_surface_format: SURFACE_FORMAT_NAME.to_owned(),
                    platform: std::env::consts::OS.to_owned(),
                    exception_type: Some("wgpu::RequestDeviceError".to_owned()),
                    exception_message: Some(err.to_string()),
                    font_candidates_checked: Vec::new(),
                },
            )
        })?;

        let font_path = crate::fonts::resolve_system_font_path(&config.font_paths)
            .map_err(|checked| {
                RenderError::backend_init(
                    "system font discovery failed",
                    BackendInitDetails {
                        selected_backend: selected_backend.clone(),
                        adapter_info: adapter_info.clone(),
                        attempted_surface_format: SURFACE_FORMAT_NAME.to_owned(),
                        platform: std::env::consts::OS.to_owned(),
                        exception_type: None,
                        exception_message: None,
                        font_candidates_checked: checked,
                    },
                )
            })?;

        if !SURFACE_FORMAT_NAME.contains("srgb") {
            return Err(RenderError::backend_init(
                "surface format must be sRGB for presentation",
                BackendInitDetails {
                    selected_backend: selected_backend.clone(),
                    adapter_info: adapter_info.clone(),
                    attempted_surface_format: SURFACE_FORMAT_NAME.to_owned(),
                    platform: std::env::consts::OS.to_owned(),
                    ..Default::default()
                },
            ));
        }

        let present_mode = select_present_mode(vsync, &config.present_modes);

        let geometry_pipeline = build_pipeline(&device, "kestrel.geometry", GEOMETRY_WGSL);
        let text_pipeline = build_pipeline(&device, "kestrel.text", TEXT_WGSL);

        let target_width = width.max(1);
        let target_height = height.max(1);
        let frame_view = create_frame_target(&device, target_width, target_height);

        Ok(Self {
            owner: OwnerThread::capture(),
            device,
            queue,
            selected_backend,
            adapter_info,
            font_path,
            present_mode,
            geometry_pipeline,
            text_pipeline,
            frame_view,
            encoder: None,
            frame_in_flight: false,
            title: String::new(),
            target_width,
            target_height,
            dpi_scale: 1.0,
            upload_threshold: config.upload_threshold_packets.max(1),
            upload_mode_last: UploadMode::None,
            stream_write_cursor: 0,
            reconfigure_retry_limit: config.recovery_failure_streak_threshold.max(1),
            reconfigure_attempts_last: 0,
            reconfigure_failures: 0,
        })
    }

    pub fn selected_backend(&self) -> &str {
        &self.selected_backend
    }

    pub fn adapter_info(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.adapter_info
    }

    pub fn font_path(&self) -> &std::path::Path {
        &self.font_path
    }

    fn stage_packets(&mut self, packets: &[DrawPacket]) {
        let plan = plan_upload(packets.len(), self.upload_threshold);
        self.upload_mode_last = plan.mode;
        if plan.mode == UploadMode::None {
            return;
        }

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("kestrel.staging"),
            size: plan.buffer_size,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // 64 bytes per packet: the flattened transform.
        let floats: Vec<f32> = packets
            .iter()
            .flat_map(|packet| packet.transform)
            .collect();
        self.queue
            .write_buffer(&buffer, 0, bytemuck::cast_slice(&floats));

        if plan.mode == UploadMode::RingBuffer {
            self.stream_write_cursor =
                (self.stream_write_cursor + packets.len() as u64) % 1_000_000;
        }
    }

    fn rebuild_frame_target(&mut self) -> Result<(), String> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err("frame target dimensions must be non-zero".to_owned());
        }
        self.frame_view = create_frame_target(&self.device, self.target_width, self.target_height);
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        if self.frame_in_flight {
            return Err(RenderError::FrameInFlight);
        }
        self.frame_in_flight = true;
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("kestrel.frame"),
                }),
        );
        Ok(())
    }

    fn draw_packets(&mut self, pass_name: &str, packets: &[DrawPacket]) -> Result<(), RenderError> {
        self.owner.check()?;
        self.stage_packets(packets);
        let Some(encoder) = self.encoder.as_mut() else {
            return Ok(());
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass_name),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.frame_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        for packet in packets {
            let pipeline = if packet.kind == ke_types::CommandKind::Text {
                &self.text_pipeline
            } else {
                &self.geometry_pipeline
            };
            pass.set_pipeline(pipeline);
            pass.draw(0..3, 0..1);
        }
        drop(pass);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(Some(encoder.finish()));
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        self.encoder = None;
        self.frame_in_flight = false;
        Ok(())
    }

    fn close(&mut self) {
        self.encoder = None;
        self.frame_in_flight = false;
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
    }

    fn reconfigure(&mut self, event: &WindowResizeEvent) -> Result<(), RenderError> {
        self.owner.check()?;
        self.target_width = event.physical_width.max(1);
        self.target_height = event.physical_height.max(1);
        self.dpi_scale = event.dpi_scale.max(0.01);

        self.reconfigure_attempts_last = 0;
        let mut last_error = String::new();
        for attempt in 1..=self.reconfigure_retry_limit {
            self.reconfigure_attempts_last = attempt;
            match self.rebuild_frame_target() {
                Ok(()) => return Ok(()),
                Err(err) => {
                    self.reconfigure_failures += 1;
                    last_error = err;
                }
            }
        }
        ke_log::warn!("frame target rebuild kept failing: {last_error}");
        Err(RenderError::SurfaceReconfigureFailed {
            attempts: self.reconfigure_attempts_last,
            width: self.target_width,
            height: self.target_height,
            format: SURFACE_FORMAT_NAME.to_owned(),
            present_mode: self.present_mode.clone(),
        })
    }

    fn resize_telemetry(&self) -> ResizeTelemetry {
        ResizeTelemetry {
            renderer_reused: true,
            device_reused: true,
            adapter_reused: true,
            reconfigure_attempts: self.reconfigure_attempts_last,
            reconfigure_failures: self.reconfigure_failures,
            present_mode: self.present_mode.clone(),
            surface_format: SURFACE_FORMAT_NAME.to_owned(),
            width: self.target_width,
            height: self.target_height,
            dpi_scale: self.dpi_scale,
        }
    }
}

fn backend_bits(name: &str) -> Option<wgpu::Backends> {
    match name {
        "vulkan" => Some(wgpu::Backends::VULKAN),
        "metal" => Some(wgpu::Backends::METAL),
        "dx12" => Some(wgpu::Backends::DX12),
        "gl" | "opengl" => Some(wgpu::Backends::GL),
        _ => None,
    }
}

fn request_adapter(backend_order: &[String]) -> Result<(wgpu::Adapter, String), RenderError> {
    let mut attempted = Vec::new();
    for name in backend_order {
        let Some(backends) = backend_bits(name) else {
            ke_log::warn_once!("unknown render backend name {name:?} skipped");
            continue;
        };
        attempted.push(name.clone());
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }));
        if let Some(adapter) = adapter {
            return Ok((adapter, name.clone()));
        }
    }
    Err(RenderError::backend_init(
        "no adapter available for any configured backend",
        BackendInitDetails {
            selected_backend: attempted.last().cloned().unwrap_or_else(|| "unknown".to_owned()),
            attempted_surface_format: SURFACE_FORMAT_NAME.to_owned(),
            platform: std::env::consts::OS.to_owned(),
            exception_message: Some(format!("attempted backends: {attempted:?}")),
            ..Default::default()
        },
    ))
}

fn describe_adapter(adapter: &wgpu::Adapter) -> serde_json::Map<String, serde_json::Value> {
    let info = adapter.get_info();
    let mut map = serde_json::Map::new();
    map.insert("name".to_owned(), info.name.into());
    map.insert("vendor".to_owned(), info.vendor.into());
    map.insert("device".to_owned(), info.device.into());
    map.insert(
        "device_type".to_owned(),
        format!("{:?}", info.device_type).into(),
    );
    map.insert("driver".to_owned(), info.driver.into());
    map.insert("driver_info".to_owned(), info.driver_info.into());
    map.insert("backend".to_owned(), format!("{:?}", info.backend).into());
    map
}

/// Present-mode preference: vsync favors fifo, otherwise low latency.
/// Intersected with the configured supported list; fifo is the fallback.
fn select_present_mode(vsync: bool, supported: &[String]) -> String {
    let preferred: [&str; 3] = if vsync {
        ["fifo", "mailbox", "immediate"]
    } else {
        ["mailbox", "immediate", "fifo"]
    };
    preferred
        .iter()
        .find(|mode| supported.iter().any(|supported| supported == *mode))
        .map(|mode| (*mode).to_owned())
        .unwrap_or_else(|| "fifo".to_owned())
}

fn build_pipeline(device: &wgpu::Device, label: &str, shader_source: &str) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: None,
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: SURFACE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_frame_target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("kestrel.frame_target"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: SURFACE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

const GEOMETRY_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    var pos = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0),
    );
    return vec4<f32>(pos[vertex_index], 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.1, 0.1, 0.1, 1.0);
}
"#;

const TEXT_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> @builtin(position) vec4<f32> {
    var pos = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 3.0, -1.0),
        vec2<f32>(-1.0,  3.0),
    );
    return vec4<f32>(pos[vertex_index], 0.0, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_mode_preference_respects_vsync() {
        let all = ["fifo", "mailbox", "immediate"]
            .map(str::to_owned)
            .to_vec();
        assert_eq!(select_present_mode(true, &all), "fifo");
        assert_eq!(select_present_mode(false, &all), "mailbox");

        let limited = vec!["immediate".to_owned()];
        assert_eq!(select_present_mode(true, &limited), "immediate");

        let unsupported = vec!["exotic".to_owned()];
        assert_eq!(select_present_mode(true, &unsupported), "fifo");
    }

    #[test]
    fn backend_names_map_to_bits() {
        assert_eq!(backend_bits("vulkan"), Some(wgpu::Backends::VULKAN));
        assert_eq!(backend_bits("metal"), Some(wgpu::Backends::METAL));
        assert_eq!(backend_bits("dx12"), Some(wgpu::Backends::DX12));
        assert_eq!(backend_bits("webgpu"), None);
    }
}
