//! `aten.amin` lowered to QNN `ReduceMin`.

use crate::builder::{
    Attributes, IrOperator, Opcode, QnnDataType, QnnParams, QnnScalar, QnnScalarParam,
    QnnTensorParam, qnn_ops,
};
use crate::descriptor::OperatorDescriptor;
use crate::error::LoweringError;
use crate::graph::{Argument, DataType, GraphNode, TensorArgument};
use crate::target::{QNN_2_0_FP, QNN_2_0_INT};
use crate::validation::{validate_num_inputs, validate_same_dtype, validate_valid_dtype};

use super::{LoweringContext, NodeVisitor, int_list_arg, optional_bool, tensor_arg};

const ALLOWED_DTYPES: &[DataType] = &[
    DataType::Int8,
    DataType::Uint8,
    DataType::Int16,
    DataType::Int32,
    DataType::Float16,
    DataType::Float32,
];

static DESCRIPTOR: OperatorDescriptor = OperatorDescriptor {
    name: "AMin",
    targets: &["aten.amin.default"],
    specs: &[QNN_2_0_INT, QNN_2_0_FP],
    input_counts: &[2, 3],
};

/// Resolves reduction dims against the tensor rank and the node's layout
/// permutation, if an upstream pass recorded one.
fn resolve_axes(
    op: &str,
    dims: &[i64],
    rank: usize,
    axis_order: Option<&[usize]>,
) -> Result<Vec<u32>, LoweringError> {
    let signed_rank = rank as i64;
    dims.iter()
        .map(|&dim| {
            if rank == 0 || dim < -signed_rank || dim >= signed_rank {
                return Err(LoweringError::InvalidAxis {
                    op: op.to_string(),
                    axis: dim,
                    rank,
                });
            }
            let axis = dim.rem_euclid(signed_rank) as usize;
            let axis = match axis_order {
                Some(order) => order.iter().position(|&a| a == axis).ok_or_else(|| {
                    LoweringError::InvalidAxis {
                        op: op.to_string(),
                        axis: dim,
                        rank,
                    }
                })?,
                None => axis,
            };
            Ok(axis as u32)
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AminVisitor;

impl NodeVisitor for AminVisitor {
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
        validate_num_inputs(op, inputs, DESCRIPTOR.input_counts)?;
        let input = tensor_arg(op, inputs, 0)?;
        validate_same_dtype(op, &[input, output])?;
        validate_valid_dtype(op, &[input, output], ALLOWED_DTYPES, &ctx.spec)?;

        let dims = int_list_arg(op, inputs, 1)?;
        let axes = resolve_axes(op, &dims, input.rank(), node.meta.axis_order.as_deref())?;

        let mut params = QnnParams::default();
        params.tensor_params.push(QnnTensorParam {
            name: qnn_ops::PARAM_AXES.to_string(),
            dtype: QnnDataType::Uint32,
            dims: vec![axes.len() as u32],
            data: axes,
        });
        if let Some(keep_dims) = optional_bool(op, inputs, 2)? {
            params.scalar_params.push(QnnScalarParam {
                name: qnn_ops::PARAM_KEEP_DIMS.to_string(),
                dtype: QnnDataType::Bool8,
                value: QnnScalar::Bool(keep_dims),
            });
        }

        ctx.builder.add_operator(IrOperator {
            name: Some(node.name.clone()),
            opcode: Opcode::qnn(qnn_ops::PACKAGE_QTI_AISW, qnn_ops::REDUCE_MIN),
            inputs: vec![input.name.clone()],
            outputs: vec![output.name.clone()],
            attributes: Attributes::Qnn(params),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::dispatch::LoweringOptions;
    use crate::quant::QuantTable;

    fn amin_node(args: Vec<Argument>) -> GraphNode {
        let mut all = vec![Argument::Tensor(TensorArgument::new(
            "x",
            DataType::Float32,
            vec![2, 3, 4, 5],
        ))];
        all.extend(args);
        GraphNode::new(
            "amin",
            "aten.amin.default",
            all,
            TensorArgument::new("amin", DataType::Float32, vec![2, 3]),
        )
    }

    fn lower(node: &GraphNode) -> Result<ProgramBuilder, LoweringError> {
        let mut builder = ProgramBuilder::new();
        let options = LoweringOptions::default();
        let qparams = QuantTable::new();
        let mut ctx = LoweringContext {
            builder: &mut builder,
            qparams: &qparams,
            spec: QNN_2_0_FP,
            options: &options,
        };
        AminVisitor.define_node(node, &mut ctx, &node.args, &node.output)?;
        Ok(builder)
    }

    #[test]
    fn emits_reduce_min_with_normalized_axes() {
        let node = amin_node(vec![Argument::IntList(vec![-1, 2]), Argument::Bool(false)]);
        let program = lower(&node).unwrap();

        let operator = &program.operators[0];
        assert_eq!(operator.name.as_deref(), Some("amin"));
        assert_eq!(operator.opcode.to_string(), "qti.aisw.ReduceMin");
        let Attributes::Qnn(params) = &operator.attributes else {
            panic!("expected QNN params");
        };
        let axes = params.tensor_param(qnn_ops::PARAM_AXES).unwrap();
        assert_eq!(axes.data, vec![3, 2]);
        assert_eq!(axes.dims, vec![2]);
        assert_eq!(
            params.scalar_param(qnn_ops::PARAM_KEEP_DIMS).unwrap().value,
            QnnScalar::Bool(false)
        );
    }

    #[test]
    fn keep_dims_is_omitted_when_not_supplied() {
        let node = amin_node(vec![Argument::IntList(vec![1])]);
        let program = lower(&node).unwrap();
        let Attributes::Qnn(params) = &program.operators[0].attributes else {
            panic!("expected QNN params");
        };
        assert!(params.scalar_params.is_empty());
    }

    #[test]
    fn axes_follow_recorded_axis_order() {
        // NCHW -> NHWC: channel axis 1 now lives at position 3.
        let node =
            amin_node(vec![Argument::IntList(vec![1])]).with_axis_order(vec![0, 2, 3, 1]);
        let program = lower(&node).unwrap();
        let Attributes::Qnn(params) = &program.operators[0].attributes else {
            panic!("expected QNN params");
        };
        assert_eq!(params.tensor_param(qnn_ops::PARAM_AXES).unwrap().data, vec![3]);
    }

    #[test]
    fn out_of_range_axis_is_rejected() {
        let node = amin_node(vec![Argument::IntList(vec![4])]);
        assert!(matches!(
            lower(&node),
            Err(LoweringError::InvalidAxis { axis: 4, rank: 4, .. })
        ));
        assert_eq!(resolve_axes("op", &[-4], 4, None).unwrap(), vec![0]);
        assert!(resolve_axes("op", &[0], 0, None).is_err());
    }
}
