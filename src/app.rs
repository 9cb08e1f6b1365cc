//! Window, event loop and the frontend that ties the GPU to the controller.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::backend::{ComputeBackend, Kernel, ProjectionMode, RenderBackend, WaitPolicy};
use crate::config::SimConfig;
use crate::control::{Controller, ParameterPanel, Phase};
use crate::error::{GpuError, SimulationError};
use crate::gpu::{Camera, GpuState};
use crate::input::{Input, MouseButton};
use crate::shader::KernelSources;
use crate::state::BufferSlot;
use crate::time::{FrameTimer, ScrollingSeries};
#[cfg(feature = "egui")]
use crate::ui::{ControlPanel, PanelStats};

const HISTORY_LEN: usize = 600;

/// Everything that needs a window: GPU, camera, input and the panel.
pub struct Frontend {
    window: Arc<Window>,
    gpu: GpuState,
    input: Input,
    camera: Camera,
    timer: FrameTimer,
    compute_history: ScrollingSeries,
    #[cfg(feature = "egui")]
    panel_ui: ControlPanel,
}

impl Frontend {
    pub fn new(window: Arc<Window>, gpu: GpuState, camera: Camera) -> Self {
        #[cfg(feature = "egui")]
        let panel_ui = ControlPanel::new(gpu.device(), gpu.config.format, &window);
        Self {
            window,
            gpu,
            input: Input::new(),
            camera,
            timer: FrameTimer::new(),
            compute_history: ScrollingSeries::new(HISTORY_LEN),
            #[cfg(feature = "egui")]
            panel_ui,
        }
    }

    fn handle_event(&mut self, event: &WindowEvent) {
        #[cfg(feature = "egui")]
        {
            if self.panel_ui.on_window_event(&self.window, event) {
                self.input.release_all();
                return;
            }
        }
        self.input.handle_event(event);
        if let WindowEvent::Resized(size) = event {
            self.gpu.resize(*size);
        }
    }

    #[cfg(feature = "egui")]
    fn pointer_free(&self) -> bool {
        !self.panel_ui.wants_pointer()
    }

    #[cfg(not(feature = "egui"))]
    fn pointer_free(&self) -> bool {
        true
    }
}

impl ComputeBackend for Frontend {
    fn acquire(&mut self) -> Result<(), GpuError> {
        self.timer.tic();
        self.gpu.acquire()
    }

    fn execute(&mut self, kernel: Kernel, wait: WaitPolicy) -> Result<(), GpuError> {
        self.gpu.execute(kernel, wait)
    }

    fn release(&mut self) -> Result<(), GpuError> {
        let released = self.gpu.release();
        let ms = self.timer.toc();
        self.compute_history
            .push(self.timer.frame_count() as f64, ms as f64);
        released
    }

    fn write_buffer(&mut self, slot: BufferSlot, bytes: &[u8]) -> Result<(), GpuError> {
        self.gpu.write_buffer(slot, bytes)
    }
}

impl RenderBackend for Frontend {
    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.timer.frame();
        self.gpu.begin_frame()
    }

    fn draw(&mut self, projection: ProjectionMode, panel: &mut ParameterPanel) -> Result<(), GpuError> {
        let encoder = self.gpu.encode_lattice(projection, &self.camera);

        #[cfg(feature = "egui")]
        {
            let stats = PanelStats {
                fps: self.timer.fps(),
                compute_ms: self.timer.compute_ms(),
                compute_history: &self.compute_history,
                projection,
            };
            let ui_frame = self.panel_ui.run(&self.window, panel, &stats);
            if let Some(mut encoder) = encoder {
                if let Some(view) = self.gpu.frame_view() {
                    let size = [self.gpu.config.width, self.gpu.config.height];
                    self.panel_ui.paint(
                        self.gpu.device(),
                        self.gpu.queue(),
                        &mut encoder,
                        view,
                        size,
                        ui_frame,
                    );
                }
                self.gpu.submit(encoder);
            }
        }

        #[cfg(not(feature = "egui"))]
        {
            let _ = panel;
            if let Some(encoder) = encoder {
                self.gpu.submit(encoder);
            }
        }

        Ok(())
    }

    fn poll_input(&mut self, panel: &mut ParameterPanel) {
        for intent in self.input.intents() {
            panel.push(intent);
        }

        if self.pointer_free() {
            let delta = self.input.mouse_delta();
            if self.input.mouse_held(MouseButton::Left) {
                self.camera.rotate(delta);
            } else if self.input.mouse_held(MouseButton::Right) {
                self.camera.translate(delta);
            }
            self.camera.zoom(self.input.scroll_delta());
        }

        self.input.begin_frame();
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        self.gpu.present();
        Ok(())
    }
}

struct App {
    config: SimConfig,
    controller: Controller,
    sources: KernelSources,
    frontend: Option<Frontend>,
    error: Option<SimulationError>,
}

impl App {
    fn new(config: SimConfig, controller: Controller, sources: KernelSources) -> Self {
        Self {
            config,
            controller,
            sources,
            frontend: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: SimulationError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }

    fn create_frontend(&self, event_loop: &ActiveEventLoop) -> Result<Frontend, SimulationError> {
        let window_attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let gpu = pollster::block_on(GpuState::new(
            window.clone(),
            self.controller.state(),
            &self.sources,
        ))?;

        Ok(Frontend::new(window, gpu, Camera::new(&self.config.camera)))
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.frontend.is_some() {
            return;
        }
        let mut frontend = match self.create_frontend(event_loop) {
            Ok(frontend) => frontend,
            Err(e) => return self.fail(event_loop, e),
        };
        if let Err(e) = self.controller.start(&mut frontend) {
            return self.fail(event_loop, e);
        }
        frontend.window.request_redraw();
        self.frontend = Some(frontend);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(frontend) = self.frontend.as_mut() else {
            return;
        };
        frontend.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => match self.controller.frame(frontend) {
                Ok(Phase::Exited) => event_loop.exit(),
                Ok(_) => frontend.window.request_redraw(),
                Err(e) => self.fail(event_loop, e),
            },
            _ => {}
        }
    }
}

/// Open the window and run the control loop until exit.
pub fn run(config: SimConfig, controller: Controller) -> Result<(), SimulationError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, controller, KernelSources::default());
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
