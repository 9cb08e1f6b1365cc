//! egui control panel.
//!
//! Only compiled with the `egui` feature. Widgets edit the panel's parameter
//! buffer and queue intents; nothing reaches the simulation until the loop
//! dispatches them.

use std::f32::consts::TAU;
use std::sync::Arc;

use winit::window::Window;

use crate::backend::ProjectionMode;
use crate::control::{Intent, ParameterPanel};
use crate::time::ScrollingSeries;

/// Read-only figures shown under the widgets.
pub struct PanelStats<'a> {
    pub fps: f32,
    pub compute_ms: f32,
    pub compute_history: &'a ScrollingSeries,
    pub projection: ProjectionMode,
}

/// Tessellated output of one UI pass.
pub struct UiFrame {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    textures_delta: egui::TexturesDelta,
    pixels_per_point: f32,
}

/// egui context, winit state and wgpu renderer.
pub struct ControlPanel {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl ControlPanel {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Arc<Window>) -> Self {
        let ctx = egui::Context::default();

        let mut style = egui::Style::default();
        style.visuals = egui::Visuals::dark();
        style.visuals.window_shadow = egui::Shadow::NONE;
        style.visuals.popup_shadow = egui::Shadow::NONE;
        ctx.set_style(style);

        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window.as_ref(),
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            None,  // depth format
            1,     // msaa samples
            false, // dithering
        );

        Self { ctx, state, renderer }
    }

    /// Feed a window event to egui. Returns true if egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether egui wants pointer input (dragging a widget, hovering the panel).
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Run the panel widgets for one frame.
    pub fn run(&mut self, window: &Window, panel: &mut ParameterPanel, stats: &PanelStats<'_>) -> UiFrame {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |ctx| show_panel(ctx, panel, stats));

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let paint_jobs = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        UiFrame {
            paint_jobs,
            textures_delta: full_output.textures_delta,
            pixels_per_point: full_output.pixels_per_point,
        }
    }

    /// Draw a UI frame on top of `view`.
    pub fn paint(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size_in_pixels: [u32; 2],
        frame: UiFrame,
    ) {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point: frame.pixels_per_point,
        };

        for (id, image_delta) in &frame.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        self.renderer
            .update_buffers(device, queue, encoder, &frame.paint_jobs, &screen);

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Panel Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer
                .render(&mut pass.forget_lifetime(), &frame.paint_jobs, &screen);
        }

        for id in &frame.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn show_panel(ctx: &egui::Context, panel: &mut ParameterPanel, stats: &PanelStats<'_>) {
    egui::Window::new("Parameters")
        .default_pos([10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            let edits = &mut panel.edits;
            ui.add(egui::Slider::new(&mut edits.initial_angle, 0.0..=TAU).text("angle"));

            egui::Grid::new("scalars").num_columns(2).show(ui, |ui| {
                ui.label("Temperature");
                ui.add(egui::DragValue::new(&mut edits.temperature).speed(0.0005).range(0.0..=f32::MAX));
                ui.end_row();

                ui.label("Radial exponent");
                ui.add(egui::DragValue::new(&mut edits.radial_exponent).speed(0.01));
                ui.end_row();

                ui.label("Longitudinal field");
                ui.add(egui::DragValue::new(&mut edits.longitudinal_field).speed(0.01));
                ui.end_row();

                ui.label("Transverse field");
                ui.add(egui::DragValue::new(&mut edits.transverse_field).speed(0.001));
                ui.end_row();

                ui.label("Time step");
                ui.add(egui::DragValue::new(&mut edits.time_step).speed(0.01).range(0.0..=f32::MAX));
                ui.end_row();
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("(U)pdate").clicked() {
                    panel.push(Intent::Update);
                }
                if ui.button("(R)estart").clicked() {
                    panel.push(Intent::Restart);
                }
            });
            ui.horizontal(|ui| {
                let mono = stats.projection == ProjectionMode::Monocular;
                if ui.selectable_label(mono, "(M)onocular").clicked() {
                    panel.push(Intent::Projection(ProjectionMode::Monocular));
                }
                if ui.selectable_label(!mono, "(B)inocular").clicked() {
                    panel.push(Intent::Projection(ProjectionMode::Binocular));
                }
                if ui.button("(E)xit").clicked() {
                    panel.push(Intent::Exit);
                }
            });

            ui.separator();
            ui.label(format!(
                "{:.1} fps, compute {:.3} ms",
                stats.fps, stats.compute_ms
            ));
            sparkline(ui, stats.compute_history);
        });
}

fn sparkline(ui: &mut egui::Ui, series: &ScrollingSeries) {
    let (rect, _) = ui.allocate_exact_size(egui::vec2(220.0, 48.0), egui::Sense::hover());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 2.0, egui::Color32::from_gray(24));

    let count = series.len();
    if count < 2 {
        return;
    }
    let max = series.max_y().max(1e-3);
    let points: Vec<egui::Pos2> = series
        .points()
        .enumerate()
        .map(|(i, [_, y])| {
            egui::pos2(
                rect.left() + rect.width() * i as f32 / (count - 1) as f32,
                rect.bottom() - rect.height() * (y / max) as f32,
            )
        })
        .collect();
    painter.add(egui::Shape::line(
        points,
        egui::Stroke::new(1.0, egui::Color32::LIGHT_GREEN),
    ));
}
