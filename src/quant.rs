//! Quantization parameters recorded by the (external) annotation pass.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::LoweringError;
use crate::graph::{GraphNode, TensorArgument};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum QuantizationParameters {
    PerTensor {
        scale: f32,
        zero_point: i32,
    },
    PerChannel {
        scales: Vec<f32>,
        zero_points: Vec<i32>,
        axis: usize,
    },
}

impl QuantizationParameters {
    pub fn zero_point_per_tensor(&self) -> Option<i32> {
        match self {
            QuantizationParameters::PerTensor { zero_point, .. } => Some(*zero_point),
            QuantizationParameters::PerChannel { .. } => None,
        }
    }
}

/// Lookup of quantization parameters for a node's inputs and outputs.
pub trait QuantParamStore {
    fn input_qparams(&self, node: &GraphNode, index: usize) -> Option<&QuantizationParameters>;
    fn output_qparams(&self, node: &GraphNode, index: usize) -> Option<&QuantizationParameters>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeQuantParams {
    #[serde(default)]
    pub inputs: BTreeMap<usize, QuantizationParameters>,
    #[serde(default)]
    pub outputs: BTreeMap<usize, QuantizationParameters>,
}

/// In-memory store keyed by node name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuantTable {
    nodes: HashMap<String, NodeQuantParams>,
}

impl QuantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, node: &str, index: usize, params: QuantizationParameters) {
        self.nodes
            .entry(node.to_string())
            .or_default()
            .inputs
            .insert(index, params);
    }

    pub fn set_output(&mut self, node: &str, index: usize, params: QuantizationParameters) {
        self.nodes
            .entry(node.to_string())
            .or_default()
            .outputs
            .insert(index, params);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl QuantParamStore for QuantTable {
    fn input_qparams(&self, node: &GraphNode, index: usize) -> Option<&QuantizationParameters> {
        self.nodes.get(&node.name)?.inputs.get(&index)
    }

    fn output_qparams(&self, node: &GraphNode, index: usize) -> Option<&QuantizationParameters> {
        self.nodes.get(&node.name)?.outputs.get(&index)
    }
}

/// Which side of the node a zero-point is read for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }
}

/// Zero-point of `tensor` as used in emitted attributes.
///
/// Floating-point (and other non-quantized) tensors always use 0, whatever
/// the store holds for them.
pub fn zero_point(
    store: &dyn QuantParamStore,
    node: &GraphNode,
    tensor: &TensorArgument,
    direction: Direction,
    index: usize,
) -> Result<i32, LoweringError> {
    if !tensor.dtype.is_quantized() {
        return Ok(0);
    }
    let params = match direction {
        Direction::Input => store.input_qparams(node, index),
        Direction::Output => store.output_qparams(node, index),
    }
    .ok_or_else(|| LoweringError::MissingQuantParams {
        node: node.name.clone(),
        direction: direction.as_str(),
        index,
    })?;
    params
        .zero_point_per_tensor()
        .ok_or_else(|| LoweringError::PerChannelZeroPoint {
            node: node.name.clone(),
        })
}
