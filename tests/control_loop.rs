//! Integration tests for the control loop against a recording backend.

use std::collections::VecDeque;

use spinbubble::state::{BufferSlot, ScalarValue};
use spinbubble::{
    ComputeBackend, Controller, GpuError, Intent, Kernel, ParameterPanel, Parameters, Phase,
    ProjectionMode, RenderBackend, Seeding, SimulationError, SimulationState, WaitPolicy,
};

#[derive(Default)]
struct Recorder {
    calls: Vec<&'static str>,
    kernels: Vec<Kernel>,
    writes: Vec<BufferSlot>,
    /// Intents injected on each `poll_input`, one batch per frame.
    script: VecDeque<Vec<Intent>>,
    fail_kernel: Option<Kernel>,
    projections: Vec<ProjectionMode>,
}

impl Recorder {
    fn reset(&mut self) {
        self.calls.clear();
        self.kernels.clear();
        self.writes.clear();
    }
}

impl ComputeBackend for Recorder {
    fn acquire(&mut self) -> Result<(), GpuError> {
        self.calls.push("acquire");
        Ok(())
    }

    fn execute(&mut self, kernel: Kernel, wait: WaitPolicy) -> Result<(), GpuError> {
        assert_eq!(wait, WaitPolicy::Wait);
        self.calls.push("execute");
        if self.fail_kernel == Some(kernel) {
            return Err(GpuError::Bracket("injected failure"));
        }
        self.kernels.push(kernel);
        Ok(())
    }

    fn release(&mut self) -> Result<(), GpuError> {
        self.calls.push("release");
        Ok(())
    }

    fn write_buffer(&mut self, slot: BufferSlot, _bytes: &[u8]) -> Result<(), GpuError> {
        self.writes.push(slot);
        Ok(())
    }
}

impl RenderBackend for Recorder {
    fn begin_frame(&mut self) -> Result<(), GpuError> {
        self.calls.push("begin_frame");
        Ok(())
    }

    fn draw(&mut self, projection: ProjectionMode, _panel: &mut ParameterPanel) -> Result<(), GpuError> {
        self.calls.push("draw");
        self.projections.push(projection);
        Ok(())
    }

    fn poll_input(&mut self, panel: &mut ParameterPanel) {
        self.calls.push("poll_input");
        for intent in self.script.pop_front().unwrap_or_default() {
            panel.push(intent);
        }
    }

    fn end_frame(&mut self) -> Result<(), GpuError> {
        self.calls.push("end_frame");
        Ok(())
    }
}

fn controller(nodes: usize) -> Controller {
    let params = Parameters::default();
    let mut state = SimulationState::new(Seeding::Fixed(5));
    state.apply(&params);
    state.initialize(nodes, params.initial_angle).unwrap();
    Controller::new(state, params, ProjectionMode::Monocular)
}

fn started(nodes: usize) -> (Controller, Recorder) {
    let mut controller = controller(nodes);
    let mut backend = Recorder::default();
    controller.start(&mut backend).unwrap();
    backend.reset();
    (controller, backend)
}

#[test]
fn test_frame_before_start_fails() {
    let mut controller = controller(4);
    let mut backend = Recorder::default();
    assert!(matches!(
        controller.frame(&mut backend),
        Err(SimulationError::NotStarted)
    ));
    assert!(backend.calls.is_empty());
}

#[test]
fn test_start_uploads_everything_then_ramps_up() {
    let mut controller = controller(4);
    let mut backend = Recorder::default();
    controller.start(&mut backend).unwrap();

    assert_eq!(backend.writes, (0..16).collect::<Vec<_>>());
    assert_eq!(backend.kernels, vec![Kernel::RampUp]);
    assert_eq!(backend.calls, vec!["acquire", "execute", "release"]);
    assert_eq!(controller.phase(), Phase::Steady);
    assert!(controller.checkpoints().has_checkpoint());
}

#[test]
fn test_frame_order() {
    let (mut controller, mut backend) = started(4);
    assert_eq!(controller.frame(&mut backend).unwrap(), Phase::Steady);

    assert_eq!(
        backend.calls,
        vec![
            "acquire",
            "execute",
            "execute",
            "execute",
            "release",
            "begin_frame",
            "draw",
            "poll_input",
            "end_frame",
        ]
    );
    assert_eq!(backend.kernels, Kernel::STEP.to_vec());
    assert!(backend.writes.is_empty());
}

#[test]
fn test_update_uploads_only_edited_scalars() {
    let (mut controller, mut backend) = started(4);
    controller.panel_mut().edits.temperature = 0.05;
    controller.panel_mut().edits.transverse_field = 0.2;
    backend.script.push_back(vec![Intent::Update]);

    controller.frame(&mut backend).unwrap();

    assert_eq!(backend.writes, vec![10, 11, 12, 13, 15]);
    let state = controller.state();
    assert_eq!(state.get_scalar("temperature").unwrap(), ScalarValue::F32(0.05));
    assert_eq!(state.get_scalar("transverse_field").unwrap(), ScalarValue::F32(0.2));
    assert!(controller.sync().dirty().next().is_none());
}

#[test]
fn test_restart_restores_and_uploads_kinematics() {
    let (mut controller, mut backend) = started(3);
    controller.panel_mut().edits.initial_angle = 1.0;
    backend.script.push_back(vec![Intent::Restart]);

    controller.frame(&mut backend).unwrap();

    assert_eq!(backend.writes, vec![1, 5, 6]);
    assert_eq!(controller.state().theta(), &[1.0, 1.0, 1.0]);
    assert_eq!(controller.state().theta_int(), &[0.0, 0.0, 0.0]);
}

#[test]
fn test_projection_changes_next_draw_only() {
    let (mut controller, mut backend) = started(2);
    backend.script.push_back(vec![Intent::Projection(ProjectionMode::Binocular)]);

    controller.frame(&mut backend).unwrap();
    controller.frame(&mut backend).unwrap();

    assert_eq!(
        backend.projections,
        vec![ProjectionMode::Monocular, ProjectionMode::Binocular]
    );
    assert_eq!(controller.projection(), ProjectionMode::Binocular);
    assert!(backend.writes.is_empty());
}

#[test]
fn test_exit_stops_dispatch_and_loop() {
    let (mut controller, mut backend) = started(2);
    backend.script.push_back(vec![Intent::Exit, Intent::Update]);

    assert_eq!(controller.frame(&mut backend).unwrap(), Phase::Exited);
    assert!(backend.writes.is_empty());

    backend.reset();
    assert_eq!(controller.frame(&mut backend).unwrap(), Phase::Exited);
    assert!(backend.calls.is_empty());
}

#[test]
fn test_kernel_failure_ends_frame_after_release() {
    let (mut controller, mut backend) = started(2);
    backend.fail_kernel = Some(Kernel::Bond);

    let err = controller.frame(&mut backend).unwrap_err();
    assert!(matches!(err, SimulationError::Gpu(GpuError::Bracket(_))));
    assert_eq!(backend.calls, vec!["acquire", "execute", "execute", "release"]);
}

#[test]
fn test_frame_without_intent_uploads_nothing() {
    let (mut controller, mut backend) = started(2);
    backend.script.push_back(vec![Intent::Update]);
    backend.script.push_back(vec![]);

    controller.frame(&mut backend).unwrap();
    assert_eq!(backend.writes.len(), 5);
    backend.reset();
    controller.frame(&mut backend).unwrap();
    assert!(backend.writes.is_empty());
}
