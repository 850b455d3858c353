use crate::builder::IrBuilder;
use crate::descriptor::OperatorDescriptor;
use crate::dispatch::{LoweringOptions, PadOverflow};
use crate::error::LoweringError;
use crate::graph::{Argument, GraphNode, TensorArgument};
use crate::quant::QuantParamStore;
use crate::target::TargetSpecification;
use crate::validation::{adjust_pooling_pad_if_needed, checked_pooling_pad};

mod qnn_amin;
mod tosa_max_pool2d;

pub use qnn_amin::AminVisitor;
pub use tosa_max_pool2d::{MaxPool2dV080Visitor, MaxPool2dVisitor};

/// Everything a visitor may touch while lowering one node.
pub struct LoweringContext<'a> {
    pub builder: &'a mut dyn IrBuilder,
    pub qparams: &'a dyn QuantParamStore,
    pub spec: TargetSpecification,
    pub options: &'a LoweringOptions,
}

impl LoweringContext<'_> {
    /// Trailing pool pad for one axis, honouring the configured overflow policy.
    pub fn pooling_pad(
        &self,
        input: usize,
        kernel: usize,
        stride: usize,
        pad: usize,
        ceil_mode: bool,
    ) -> Result<usize, LoweringError> {
        match self.options.pad_overflow {
            PadOverflow::Clamp => Ok(adjust_pooling_pad_if_needed(
                input, kernel, stride, pad, ceil_mode,
            )),
            PadOverflow::Reject => checked_pooling_pad(input, kernel, stride, pad, ceil_mode),
        }
    }
}

/// Lowers one operator kind into one IR dialect.
///
/// Implementations hold no per-node state: the registry keeps a single
/// instance and calls `define_node` for every matching node.
pub trait NodeVisitor: Send + Sync {
    fn descriptor(&self) -> &'static OperatorDescriptor;

    fn define_node(
        &self,
        node: &GraphNode,
        ctx: &mut LoweringContext<'_>,
        inputs: &[Argument],
        output: &TensorArgument,
    ) -> Result<(), LoweringError>;
}

pub fn default_visitors() -> Vec<Box<dyn NodeVisitor>> {
    vec![
        Box::new(MaxPool2dV080Visitor),
        Box::new(MaxPool2dVisitor),
        Box::new(AminVisitor),
    ]
}

fn arg<'n>(op: &str, inputs: &'n [Argument], index: usize) -> Result<&'n Argument, LoweringError> {
    inputs
        .get(index)
        .ok_or_else(|| LoweringError::invalid_argument(op, index, "present"))
}

pub(crate) fn tensor_arg<'n>(
    op: &str,
    inputs: &'n [Argument],
    index: usize,
) -> Result<&'n TensorArgument, LoweringError> {
    arg(op, inputs, index)?
        .as_tensor()
        .ok_or_else(|| LoweringError::invalid_argument(op, index, "a tensor"))
}

/// An int list slot; a bare int is read as a one-element list.
pub(crate) fn int_list_arg(
    op: &str,
    inputs: &[Argument],
    index: usize,
) -> Result<Vec<i64>, LoweringError> {
    match arg(op, inputs, index)? {
        Argument::IntList(values) => Ok(values.clone()),
        Argument::Int(value) => Ok(vec![*value]),
        _ => Err(LoweringError::invalid_argument(op, index, "an int list")),
    }
}

/// Like [`int_list_arg`], but a missing or `None` slot yields `None`.
pub(crate) fn optional_int_list(
    op: &str,
    inputs: &[Argument],
    index: usize,
) -> Result<Option<Vec<i64>>, LoweringError> {
    match inputs.get(index) {
        None | Some(Argument::None) => Ok(None),
        Some(_) => int_list_arg(op, inputs, index).map(Some),
    }
}

pub(crate) fn optional_bool(
    op: &str,
    inputs: &[Argument],
    index: usize,
) -> Result<Option<bool>, LoweringError> {
    match inputs.get(index) {
        None | Some(Argument::None) => Ok(None),
        Some(value) => value
            .as_bool()
            .map(Some)
            .ok_or_else(|| LoweringError::invalid_argument(op, index, "a bool")),
    }
}
