//! `aten.max_pool2d` lowered to TOSA `MAX_POOL2D`.
//!
//! Argument order: `(input, kernel_size, stride, padding?, dilation?, ceil_mode?)`.
//! The 0.80 and 1.0 schemas differ only in the attribute they attach, so the
//! argument handling is shared.

use crate::builder::{
    Attributes, IrOperator, MaxPool2dAttribute, NanMode, Opcode, PoolAttribute, TosaOp,
};
use crate::descriptor::OperatorDescriptor;
use crate::error::LoweringError;
use crate::graph::{Argument, DataType, GraphNode, TensorArgument};
use crate::quant::{Direction, zero_point};
use crate::target::{TOSA_0_80_BI, TOSA_0_80_MI, TOSA_1_0_FP, TOSA_1_0_INT};
use crate::validation::{validate_num_inputs, validate_same_dtype, validate_valid_dtype};

use super::{
    LoweringContext, NodeVisitor, int_list_arg, optional_bool, optional_int_list, tensor_arg,
};

const TARGETS: &[&str] = &["aten.max_pool2d.default"];
const INPUT_COUNTS: &[usize] = &[3, 4, 5, 6];
const ALLOWED_DTYPES: &[DataType] = &[DataType::Int8, DataType::Float32];

static DESCRIPTOR_0_80: OperatorDescriptor = OperatorDescriptor {
    name: "MaxPool2dVisitor_0_80",
    targets: TARGETS,
    specs: &[TOSA_0_80_BI, TOSA_0_80_MI],
    input_counts: INPUT_COUNTS,
};

static DESCRIPTOR: OperatorDescriptor = OperatorDescriptor {
    name: "MaxPool2dVisitor",
    targets: TARGETS,
    specs: &[TOSA_1_0_INT, TOSA_1_0_FP],
    input_counts: INPUT_COUNTS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pool2dParams {
    kernel: [usize; 2],
    stride: [usize; 2],
    /// `[top, bottom, left, right]`
    pad: [usize; 4],
}

/// Reads a (height, width) pair; a single value applies to both axes.
fn spatial_pair(
    op: &str,
    index: usize,
    values: &[i64],
    min: i64,
) -> Result<[usize; 2], LoweringError> {
    let pair = match values {
        [both] => [*both, *both],
        [h, w] => [*h, *w],
        _ => {
            return Err(LoweringError::invalid_argument(
                op,
                index,
                "a list of one or two values",
            ));
        }
    };
    if pair.iter().any(|value| *value < min) {
        let expected = if min > 0 {
            "positive values"
        } else {
            "non-negative values"
        };
        return Err(LoweringError::invalid_argument(op, index, expected));
    }
    let to_usize = |value: i64| {
        usize::try_from(value)
            .map_err(|_| LoweringError::invalid_argument(op, index, "values that fit in usize"))
    };
    Ok([to_usize(pair[0])?, to_usize(pair[1])?])
}

fn pool2d_params<'n>(
    op: &str,
    ctx: &LoweringContext<'_>,
    inputs: &'n [Argument],
    output: &TensorArgument,
) -> Result<(&'n TensorArgument, Pool2dParams), LoweringError> {
    validate_num_inputs(op, inputs, INPUT_COUNTS)?;
    let input = tensor_arg(op, inputs, 0)?;
    validate_same_dtype(op, &[input, output])?;
    validate_valid_dtype(op, &[input, output], ALLOWED_DTYPES, &ctx.spec)?;
    if input.rank() != 4 {
        return Err(LoweringError::invalid_argument(
            op,
            0,
            "a rank-4 NCHW tensor",
        ));
    }

    let kernel = spatial_pair(op, 1, &int_list_arg(op, inputs, 1)?, 1)?;
    let stride = match int_list_arg(op, inputs, 2)?.as_slice() {
        [] => kernel,
        values => spatial_pair(op, 2, values, 1)?,
    };
    let padding = match optional_int_list(op, inputs, 3)? {
        Some(values) if !values.is_empty() => spatial_pair(op, 3, &values, 0)?,
        _ => [0, 0],
    };
    if padding.iter().zip(kernel).any(|(pad, kernel)| *pad > kernel / 2) {
        return Err(LoweringError::invalid_argument(
            op,
            3,
            "padding at most half the kernel size",
        ));
    }
    if let Some(dilation) = optional_int_list(op, inputs, 4)?
        && dilation.iter().any(|value| *value != 1)
    {
        return Err(LoweringError::UnsupportedAttribute {
            op: op.to_string(),
            attribute: "dilation",
            reason: format!("TOSA pooling has no dilation, got {:?}", dilation),
        });
    }
    let ceil_mode = optional_bool(op, inputs, 5)?.unwrap_or(false);

    let mut pad = [padding[0], padding[0], padding[1], padding[1]];
    pad[1] = ctx.pooling_pad(input.shape[2], kernel[0], stride[0], pad[1], ceil_mode)?;
    pad[3] = ctx.pooling_pad(input.shape[3], kernel[1], stride[1], pad[3], ceil_mode)?;

    tracing::trace!(op, ?kernel, ?stride, ?pad, ceil_mode, "pool2d attributes");
    Ok((
        input,
        Pool2dParams {
            kernel,
            stride,
            pad,
        },
    ))
}

/// TOSA 0.80 lowering: the pool attribute carries zero-points and the
/// accumulator type.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxPool2dV080Visitor;

impl NodeVisitor for MaxPool2dV080Visitor {
    fn descriptor(&self) -> &'static OperatorDescriptor {
        &DESCRIPTOR_0_80
    }

    fn define_node(
        &self,
        node: &GraphNode,
        ctx: &mut LoweringContext<'_>,
        inputs: &[Argument],
        output: &TensorArgument,
    ) -> Result<(), LoweringError> {
        let op = node.target.as_str();
        let (input, params) = pool2d_params(op, ctx, inputs, output)?;

        let input_zp = zero_point(ctx.qparams, node, input, Direction::Input, 0)?;
        let output_zp = zero_point(ctx.qparams, node, output, Direction::Output, 0)?;

        ctx.builder.add_operator(IrOperator {
            name: None,
            opcode: Opcode::tosa(TosaOp::MaxPool2d),
            inputs: vec![input.name.clone()],
            outputs: vec![output.name.clone()],
            attributes: Attributes::Pool(PoolAttribute {
                kernel: params.kernel,
                stride: params.stride,
                pad: params.pad,
                input_zp,
                output_zp,
                accum_dtype: output.dtype,
            }),
        });
        Ok(())
    }
}

/// TOSA 1.0 lowering: zero-points moved out of the attribute and NaNs propagate.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxPool2dVisitor;

impl NodeVisitor for MaxPool2dVisitor {
    fn descriptor(&self) -> &'static OperatorDescriptor {
        &DESCRIPTOR
    }

    fn define_node(
        &self,
        node: &GraphNode,
        ctx: &mut LoweringContext<'_>,
        inputs: &[Argument],
        output: &TensorArgument,
    ) -> Result<(), LoweringError> {
        let op = node.target.as_str();
        let (input, params) = pool2d_params(op, ctx, inputs, output)?;

        ctx.builder.add_operator(IrOperator {
            name: None,
            opcode: Opcode::tosa(TosaOp::MaxPool2d),
            inputs: vec![input.name.clone()],
            outputs: vec![output.name.clone()],
            attributes: Attributes::MaxPool2d(MaxPool2dAttribute {
                kernel: params.kernel,
                stride: params.stride,
                pad: params.pad,
                nan_mode: NanMode::Propagate,
            }),
        });
        Ok(())
    }
}
