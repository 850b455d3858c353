use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

use crate::error::LoweringError;
use crate::quant::QuantTable;
use crate::target::TargetSpecification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Float16,
    Bfloat16,
    Float32,
}

impl DataType {
    pub fn is_float(self) -> bool {
        matches!(
            self,
            DataType::Float16 | DataType::Bfloat16 | DataType::Float32
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 | DataType::Uint8
        )
    }

    /// Fixed-point types that carry a zero-point from the quantization pass.
    pub fn is_quantized(self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Uint8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorArgument {
    pub name: String,
    pub dtype: DataType,
    #[serde(default)]
    pub shape: Vec<usize>,
}

impl TensorArgument {
    pub fn new(name: impl Into<String>, dtype: DataType, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// One positional argument of a graph node.
///
/// The variant is checked when a visitor extracts the slot, so a mismatched
/// argument fails with `InvalidArgument` instead of being coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Tensor(TensorArgument),
    IntList(Vec<i64>),
    Bool(bool),
    Int(i64),
    Float(f64),
    None,
}

impl Argument {
    pub fn as_tensor(&self) -> Option<&TensorArgument> {
        match self {
            Argument::Tensor(tensor) => Some(tensor),
            _ => None,
        }
    }

    pub fn as_int_list(&self) -> Option<&[i64]> {
        match self {
            Argument::IntList(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Argument::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Booleans arrive either as `true`/`false` or as 0/1 integers.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(value) => Some(*value),
            Argument::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Argument::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    /// Layout permutation applied to the node's output by an upstream pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_order: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    /// Operator identity, e.g. `aten.max_pool2d.default`.
    pub target: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    pub output: TensorArgument,
    #[serde(default)]
    pub meta: NodeMeta,
}

impl GraphNode {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        args: Vec<Argument>,
        output: TensorArgument,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            args,
            output,
            meta: NodeMeta::default(),
        }
    }

    pub fn with_axis_order(mut self, axis_order: Vec<usize>) -> Self {
        self.meta.axis_order = Some(axis_order);
        self
    }
}

/// A graph handed over for lowering: nodes in topological order plus the
/// quantization annotations recorded for them.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoweringInput {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    pub target: Option<TargetSpecification>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub quantization: QuantTable,
}

impl LoweringInput {
    /// Picks `requested` if given, otherwise the document's own target.
    pub fn resolve_target(
        &self,
        requested: Option<TargetSpecification>,
    ) -> Result<TargetSpecification, LoweringError> {
        requested.or(self.target).ok_or(LoweringError::MissingTarget)
    }
}
