//! Host-side simulation state.
//!
//! [`SimulationState`] owns every buffer the compute kernels read or write:
//! per-node spin and RNG state, the neighbor graph, and a block of scalar
//! parameters. Each buffer has a [`BufferName`] with a fixed device slot, so
//! the synchronization layer can upload any of them by name.
//!
//! Per-node buffers are only exposed as slices once built, which keeps their
//! lengths equal to the node count for the lifetime of the store.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use bytemuck::{Pod, Zeroable};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::graph::NeighborGraph;
use crate::topology::Lattice;

/// Device slot identifier. Stable for the lifetime of the process.
pub type BufferSlot = u32;

/// Default node tint before the first kernel recolors it.
pub const DEFAULT_COLOR: [f32; 4] = [0.0, 1.0, 0.0, 1.0];

/// Position given to nodes that have no mesh coordinate yet.
pub const ORIGIN: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// How entries of a buffer relate to the lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    PerNode,
    PerEdge,
    Scalar,
}

/// Every buffer shared with the compute backend.
///
/// Declaration order is slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferName {
    Color,
    Position,
    Central,
    Neighbor,
    Offset,
    Theta,
    ThetaInt,
    ThetaState,
    ThresholdState,
    MaxRejections,
    LongitudinalField,
    TransverseField,
    Temperature,
    RadialExponent,
    LatticeSpacing,
    TimeStep,
}

impl BufferName {
    pub const ALL: [BufferName; 16] = [
        BufferName::Color,
        BufferName::Position,
        BufferName::Central,
        BufferName::Neighbor,
        BufferName::Offset,
        BufferName::Theta,
        BufferName::ThetaInt,
        BufferName::ThetaState,
        BufferName::ThresholdState,
        BufferName::MaxRejections,
        BufferName::LongitudinalField,
        BufferName::TransverseField,
        BufferName::Temperature,
        BufferName::RadialExponent,
        BufferName::LatticeSpacing,
        BufferName::TimeStep,
    ];

    pub fn slot(self) -> BufferSlot {
        self as BufferSlot
    }

    pub fn from_slot(slot: BufferSlot) -> Option<Self> {
        Self::ALL.get(slot as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            BufferName::Color => "color",
            BufferName::Position => "position",
            BufferName::Central => "central",
            BufferName::Neighbor => "neighbor",
            BufferName::Offset => "offset",
            BufferName::Theta => "theta",
            BufferName::ThetaInt => "theta_int",
            BufferName::ThetaState => "state_theta",
            BufferName::ThresholdState => "state_threshold",
            BufferName::MaxRejections => "max_rejections",
            BufferName::LongitudinalField => "longitudinal_field",
            BufferName::TransverseField => "transverse_field",
            BufferName::Temperature => "temperature",
            BufferName::RadialExponent => "radial_exponent",
            BufferName::LatticeSpacing => "lattice_spacing",
            BufferName::TimeStep => "time_step",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            BufferName::Central | BufferName::Neighbor => Arity::PerEdge,
            BufferName::Color
            | BufferName::Position
            | BufferName::Offset
            | BufferName::Theta
            | BufferName::ThetaInt
            | BufferName::ThetaState
            | BufferName::ThresholdState => Arity::PerNode,
            _ => Arity::Scalar,
        }
    }

    /// The scalar parameter stored in this buffer, if it is a scalar.
    pub fn scalar(self) -> Option<ScalarParam> {
        ScalarParam::ALL.iter().copied().find(|p| p.buffer() == self)
    }
}

impl fmt::Display for BufferName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Simulation-wide scalar parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarParam {
    MaxRejections,
    LongitudinalField,
    TransverseField,
    Temperature,
    RadialExponent,
    LatticeSpacing,
    TimeStep,
}

impl ScalarParam {
    pub const ALL: [ScalarParam; 7] = [
        ScalarParam::MaxRejections,
        ScalarParam::LongitudinalField,
        ScalarParam::TransverseField,
        ScalarParam::Temperature,
        ScalarParam::RadialExponent,
        ScalarParam::LatticeSpacing,
        ScalarParam::TimeStep,
    ];

    pub fn buffer(self) -> BufferName {
        match self {
            ScalarParam::MaxRejections => BufferName::MaxRejections,
            ScalarParam::LongitudinalField => BufferName::LongitudinalField,
            ScalarParam::TransverseField => BufferName::TransverseField,
            ScalarParam::Temperature => BufferName::Temperature,
            ScalarParam::RadialExponent => BufferName::RadialExponent,
            ScalarParam::LatticeSpacing => BufferName::LatticeSpacing,
            ScalarParam::TimeStep => BufferName::TimeStep,
        }
    }

    pub fn name(self) -> &'static str {
        self.buffer().label()
    }

    /// Byte offset inside [`ScalarBlock`].
    pub fn byte_offset(self) -> usize {
        4 * (self as usize)
    }
}

impl FromStr for ScalarParam {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarParam::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| StateError::UnknownParameter(s.to_string()))
    }
}

/// A scalar parameter value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarValue {
    F32(f32),
    I32(i32),
}

impl ScalarValue {
    pub fn as_f32(self) -> f32 {
        match self {
            ScalarValue::F32(v) => v,
            ScalarValue::I32(v) => v as f32,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            ScalarValue::F32(v) => v.round() as i32,
            ScalarValue::I32(v) => v,
        }
    }
}

impl From<f32> for ScalarValue {
    fn from(v: f32) -> Self {
        ScalarValue::F32(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::I32(v)
    }
}

/// Scalar parameters in device layout.
///
/// Field order matches [`ScalarParam`] so each parameter's bytes can be
/// uploaded on their own.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ScalarBlock {
    pub max_rejections: i32,
    pub longitudinal_field: f32,
    pub transverse_field: f32,
    pub temperature: f32,
    pub radial_exponent: f32,
    pub lattice_spacing: f32,
    pub time_step: f32,
    pub _pad: u32,
}

/// User-editable physical parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub temperature: f32,
    pub longitudinal_field: f32,
    pub transverse_field: f32,
    pub radial_exponent: f32,
    pub max_rejections: i32,
    pub time_step: f32,
    /// Spin angle applied on initialization and restart [rad].
    pub initial_angle: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            temperature: 0.0125,
            longitudinal_field: 0.8,
            transverse_field: 0.01,
            radial_exponent: 1.0,
            max_rejections: 100,
            time_step: 1.0,
            initial_angle: 1.5 * PI,
        }
    }
}

/// Source of the per-node RNG seed states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seeding {
    /// Draw a fresh seed each run. The seed is logged so a run can be replayed.
    #[default]
    Entropy,
    /// Reproducible seed.
    Fixed(u64),
}

impl Seeding {
    fn rng(self) -> SmallRng {
        let seed = match self {
            Seeding::Fixed(seed) => seed,
            Seeding::Entropy => rand::random(),
        };
        log::info!("RNG seed = {}", seed);
        SmallRng::seed_from_u64(seed)
    }
}

/// The single source of truth for host-side simulation state.
#[derive(Debug)]
pub struct SimulationState {
    color: Vec<[f32; 4]>,
    position: Vec<[f32; 4]>,
    graph: NeighborGraph,
    theta: Vec<f32>,
    theta_int: Vec<f32>,
    theta_state: Vec<[u32; 4]>,
    threshold_state: Vec<[u32; 4]>,
    scalars: ScalarBlock,
    rng: SmallRng,
}

impl SimulationState {
    /// Create an empty store. Call [`initialize`](Self::initialize) to size it.
    pub fn new(seeding: Seeding) -> Self {
        Self {
            color: Vec::new(),
            position: Vec::new(),
            graph: NeighborGraph::default(),
            theta: Vec::new(),
            theta_int: Vec::new(),
            theta_state: Vec::new(),
            threshold_state: Vec::new(),
            scalars: ScalarBlock::zeroed(),
            rng: seeding.rng(),
        }
    }

    /// Populate a store from an extracted lattice.
    pub fn from_lattice(lattice: Lattice, params: &Parameters, seeding: Seeding) -> Self {
        let mut state = Self::new(seeding);
        let node_count = lattice.node_count();
        state.position = lattice.positions;
        state.graph = lattice.graph;
        state.apply(params);
        state.set(ScalarParam::MaxRejections, params.max_rejections);
        state.set(ScalarParam::LatticeSpacing, lattice.spacing.dx);
        state.fill_nodes(node_count, params.initial_angle);
        state
    }

    /// Allocate and fill every per-node buffer for `node_count` nodes.
    ///
    /// Positions already loaded for exactly `node_count` nodes are kept;
    /// otherwise they are resized with [`ORIGIN`]. RNG states are drawn
    /// node by node, angle channel first, so the two channels never share a
    /// draw.
    ///
    /// Once a neighbor graph is loaded the node count is fixed by it; any
    /// other count fails with `LengthMismatch` and nothing is touched.
    pub fn initialize(&mut self, node_count: usize, initial_angle: f32) -> Result<(), StateError> {
        let graph_nodes = self.graph.node_count();
        if graph_nodes != 0 && node_count != graph_nodes {
            return Err(StateError::LengthMismatch {
                buffer: BufferName::Offset,
                expected: graph_nodes,
                found: node_count,
            });
        }
        self.fill_nodes(node_count, initial_angle);
        Ok(())
    }

    fn fill_nodes(&mut self, node_count: usize, initial_angle: f32) {
        self.position.resize(node_count, ORIGIN);
        self.color = vec![DEFAULT_COLOR; node_count];
        self.theta = vec![initial_angle; node_count];
        self.theta_int = vec![0.0; node_count];

        self.theta_state.clear();
        self.threshold_state.clear();
        for _ in 0..node_count {
            let a = seed_words(&mut self.rng);
            let b = seed_words(&mut self.rng);
            self.theta_state.push(a);
            self.threshold_state.push(b);
        }
    }

    /// Reset color, angle and intermediate angle of every node.
    ///
    /// RNG state and positions are left alone.
    pub fn reset_per_node(&mut self, node_count: usize, angle: f32) -> Result<(), StateError> {
        if node_count != self.node_count() {
            return Err(StateError::LengthMismatch {
                buffer: BufferName::Theta,
                expected: self.node_count(),
                found: node_count,
            });
        }
        self.color.fill(DEFAULT_COLOR);
        self.theta.fill(angle);
        self.theta_int.fill(0.0);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.theta.len()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn graph(&self) -> &NeighborGraph {
        &self.graph
    }

    pub fn positions(&self) -> &[[f32; 4]] {
        &self.position
    }

    pub fn colors(&self) -> &[[f32; 4]] {
        &self.color
    }

    pub fn theta(&self) -> &[f32] {
        &self.theta
    }

    pub fn theta_int(&self) -> &[f32] {
        &self.theta_int
    }

    pub fn theta_state(&self) -> &[[u32; 4]] {
        &self.theta_state
    }

    pub fn threshold_state(&self) -> &[[u32; 4]] {
        &self.threshold_state
    }

    pub fn positions_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.position
    }

    pub fn theta_mut(&mut self) -> &mut [f32] {
        &mut self.theta
    }

    pub fn theta_int_mut(&mut self) -> &mut [f32] {
        &mut self.theta_int
    }

    /// Overwrite the checkpointed buffers in one step.
    ///
    /// Fails without touching anything if any slice has the wrong length.
    pub(crate) fn overwrite_kinematics(
        &mut self,
        position: &[[f32; 4]],
        theta: &[f32],
        theta_int: &[f32],
    ) -> Result<(), StateError> {
        let expected = self.node_count();
        for (buffer, found) in [
            (BufferName::Position, position.len()),
            (BufferName::Theta, theta.len()),
            (BufferName::ThetaInt, theta_int.len()),
        ] {
            if found != expected {
                return Err(StateError::LengthMismatch {
                    buffer,
                    expected,
                    found,
                });
            }
        }
        self.position.copy_from_slice(position);
        self.theta.copy_from_slice(theta);
        self.theta_int.copy_from_slice(theta_int);
        Ok(())
    }

    pub fn scalars(&self) -> &ScalarBlock {
        &self.scalars
    }

    /// Set a scalar parameter by name.
    pub fn set_scalar<V: Into<ScalarValue>>(
        &mut self,
        name: &str,
        value: V,
    ) -> Result<BufferName, StateError> {
        let param: ScalarParam = name.parse()?;
        self.set(param, value);
        Ok(param.buffer())
    }

    /// Get a scalar parameter by name.
    pub fn get_scalar(&self, name: &str) -> Result<ScalarValue, StateError> {
        let param: ScalarParam = name.parse()?;
        Ok(self.get(param))
    }

    pub fn set<V: Into<ScalarValue>>(&mut self, param: ScalarParam, value: V) {
        let value = value.into();
        let s = &mut self.scalars;
        match param {
            ScalarParam::MaxRejections => s.max_rejections = value.as_i32(),
            ScalarParam::LongitudinalField => s.longitudinal_field = value.as_f32(),
            ScalarParam::TransverseField => s.transverse_field = value.as_f32(),
            ScalarParam::Temperature => s.temperature = value.as_f32(),
            ScalarParam::RadialExponent => s.radial_exponent = value.as_f32(),
            ScalarParam::LatticeSpacing => s.lattice_spacing = value.as_f32(),
            ScalarParam::TimeStep => s.time_step = value.as_f32(),
        }
    }

    pub fn get(&self, param: ScalarParam) -> ScalarValue {
        let s = &self.scalars;
        match param {
            ScalarParam::MaxRejections => ScalarValue::I32(s.max_rejections),
            ScalarParam::LongitudinalField => ScalarValue::F32(s.longitudinal_field),
            ScalarParam::TransverseField => ScalarValue::F32(s.transverse_field),
            ScalarParam::Temperature => ScalarValue::F32(s.temperature),
            ScalarParam::RadialExponent => ScalarValue::F32(s.radial_exponent),
            ScalarParam::LatticeSpacing => ScalarValue::F32(s.lattice_spacing),
            ScalarParam::TimeStep => ScalarValue::F32(s.time_step),
        }
    }

    /// Write the parameters the UI may edit and return the touched buffers.
    ///
    /// Max rejections and lattice spacing are fixed after startup.
    pub fn apply(&mut self, params: &Parameters) -> [BufferName; 5] {
        let edits = [
            (ScalarParam::Temperature, params.temperature),
            (ScalarParam::LongitudinalField, params.longitudinal_field),
            (ScalarParam::TransverseField, params.transverse_field),
            (ScalarParam::RadialExponent, params.radial_exponent),
            (ScalarParam::TimeStep, params.time_step),
        ];
        edits.map(|(param, value)| {
            self.set(param, value);
            param.buffer()
        })
    }

    /// Raw bytes of a buffer, laid out as the device expects.
    pub fn buffer_bytes(&self, name: BufferName) -> &[u8] {
        match name {
            BufferName::Color => bytemuck::cast_slice(&self.color),
            BufferName::Position => bytemuck::cast_slice(&self.position),
            BufferName::Central => bytemuck::cast_slice(self.graph.central()),
            BufferName::Neighbor => bytemuck::cast_slice(self.graph.neighbor()),
            BufferName::Offset => bytemuck::cast_slice(self.graph.offset()),
            BufferName::Theta => bytemuck::cast_slice(&self.theta),
            BufferName::ThetaInt => bytemuck::cast_slice(&self.theta_int),
            BufferName::ThetaState => bytemuck::cast_slice(&self.theta_state),
            BufferName::ThresholdState => bytemuck::cast_slice(&self.threshold_state),
            scalar => {
                // Every non-graph, non-node buffer is a scalar.
                let offset = scalar.scalar().map(ScalarParam::byte_offset).unwrap_or(0);
                &bytemuck::bytes_of(&self.scalars)[offset..offset + 4]
            }
        }
    }

    /// Number of entries a buffer holds.
    pub fn buffer_len(&self, name: BufferName) -> usize {
        match name.arity() {
            Arity::PerNode => self.node_count(),
            Arity::PerEdge => self.edge_count(),
            Arity::Scalar => 1,
        }
    }
}

fn seed_words(rng: &mut SmallRng) -> [u32; 4] {
    // xorshift128 state must not be all zero; nonzero words rule that out.
    [
        rng.gen_range(1..=u32::MAX),
        rng.gen_range(1..=u32::MAX),
        rng.gen_range(1..=u32::MAX),
        rng.gen_range(1..=u32::MAX),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_follow_declaration_order() {
        for (i, name) in BufferName::ALL.iter().enumerate() {
            assert_eq!(name.slot(), i as u32);
            assert_eq!(BufferName::from_slot(i as u32), Some(*name));
        }
        assert_eq!(BufferName::from_slot(16), None);
    }

    #[test]
    fn test_scalar_offsets_match_block_layout() {
        assert_eq!(std::mem::size_of::<ScalarBlock>(), 32);
        let mut state = SimulationState::new(Seeding::Fixed(1));
        state.set(ScalarParam::TimeStep, 0.25f32);
        let bytes = state.buffer_bytes(BufferName::TimeStep);
        assert_eq!(bytes, &0.25f32.to_le_bytes());
        state.set(ScalarParam::MaxRejections, 7);
        assert_eq!(state.buffer_bytes(BufferName::MaxRejections), &7i32.to_le_bytes());
    }

    #[test]
    fn test_scalar_names_round_trip() {
        for param in ScalarParam::ALL {
            assert_eq!(param.name().parse::<ScalarParam>().unwrap(), param);
            assert_eq!(param.buffer().scalar(), Some(param));
        }
        assert_eq!(BufferName::Theta.scalar(), None);
    }

    #[test]
    fn test_max_rejections_rounds_floats() {
        let mut state = SimulationState::new(Seeding::Fixed(1));
        state.set_scalar("max_rejections", 41.6f32).unwrap();
        assert_eq!(state.get(ScalarParam::MaxRejections), ScalarValue::I32(42));
    }

    #[test]
    fn test_rng_states_are_nonzero() {
        let mut state = SimulationState::new(Seeding::Fixed(3));
        state.initialize(64, 0.0).unwrap();
        assert!(state.theta_state().iter().flatten().all(|&w| w != 0));
        assert!(state.threshold_state().iter().flatten().all(|&w| w != 0));
    }

    #[test]
    fn test_initialize_pads_positions() {
        let mut state = SimulationState::new(Seeding::Fixed(3));
        state.initialize(2, 1.0).unwrap();
        assert_eq!(state.positions(), &[ORIGIN, ORIGIN]);
        assert_eq!(state.buffer_len(BufferName::Position), 2);
        assert_eq!(state.buffer_len(BufferName::Temperature), 1);
    }
}
