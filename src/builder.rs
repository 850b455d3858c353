//! The IR builder boundary.
//!
//! Visitors hand fully computed instructions to an [`IrBuilder`]; what the
//! builder does with them (serialize, wrap in vendor SDK objects, record) is
//! outside the lowering core.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::DataType;

/// QNN operator and parameter names used by the built-in visitors.
pub mod qnn_ops {
    pub const PACKAGE_QTI_AISW: &str = "qti.aisw";

    pub const REDUCE_MIN: &str = "ReduceMin";
    pub const PARAM_AXES: &str = "axes";
    pub const PARAM_KEEP_DIMS: &str = "keep_dims";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TosaOp {
    MaxPool2d,
}

impl TosaOp {
    pub fn as_str(self) -> &'static str {
        match self {
            TosaOp::MaxPool2d => "MAX_POOL2D",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dialect", rename_all = "snake_case")]
pub enum Opcode {
    Tosa { op: TosaOp },
    Qnn { package: String, op: String },
}

impl Opcode {
    pub fn tosa(op: TosaOp) -> Self {
        Opcode::Tosa { op }
    }

    pub fn qnn(package: &str, op: &str) -> Self {
        Opcode::Qnn {
            package: package.to_string(),
            op: op.to_string(),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Tosa { op } => f.write_str(op.as_str()),
            Opcode::Qnn { package, op } => write!(f, "{}.{}", package, op),
        }
    }
}

/// Pooling attribute of the TOSA 0.80 schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAttribute {
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    /// `[top, bottom, left, right]`
    pub pad: [usize; 4],
    pub input_zp: i32,
    pub output_zp: i32,
    pub accum_dtype: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanMode {
    Propagate,
    Ignore,
}

/// `MAX_POOL2D` attribute of the TOSA 1.0 schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxPool2dAttribute {
    pub kernel: [usize; 2],
    pub stride: [usize; 2],
    /// `[top, bottom, left, right]`
    pub pad: [usize; 4],
    pub nan_mode: NanMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QnnDataType {
    Uint32,
    Bool8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnnTensorParam {
    pub name: String,
    pub dtype: QnnDataType,
    pub dims: Vec<u32>,
    pub data: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QnnScalar {
    Bool(bool),
    Uint(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnnScalarParam {
    pub name: String,
    pub dtype: QnnDataType,
    pub value: QnnScalar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnnParams {
    #[serde(default)]
    pub tensor_params: Vec<QnnTensorParam>,
    #[serde(default)]
    pub scalar_params: Vec<QnnScalarParam>,
}

impl QnnParams {
    pub fn tensor_param(&self, name: &str) -> Option<&QnnTensorParam> {
        self.tensor_params.iter().find(|param| param.name == name)
    }

    pub fn scalar_param(&self, name: &str) -> Option<&QnnScalarParam> {
        self.scalar_params.iter().find(|param| param.name == name)
    }
}

/// Dialect-specific attribute bundle attached to an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attributes {
    Pool(PoolAttribute),
    MaxPool2d(MaxPool2dAttribute),
    Qnn(QnnParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrOperator {
    /// Instruction name, for dialects that name their ops (QNN).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub opcode: Opcode,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub attributes: Attributes,
}

pub trait IrBuilder {
    fn add_operator(&mut self, operator: IrOperator);
}

/// Builder that keeps emitted instructions in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramBuilder {
    pub operators: Vec<IrOperator>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl IrBuilder for ProgramBuilder {
    fn add_operator(&mut self, operator: IrOperator) {
        self.operators.push(operator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_operators_in_order_and_serializes() {
        let mut builder = ProgramBuilder::new();
        builder.add_operator(IrOperator {
            name: None,
            opcode: Opcode::tosa(TosaOp::MaxPool2d),
            inputs: vec!["x".to_string()],
            outputs: vec!["y".to_string()],
            attributes: Attributes::MaxPool2d(MaxPool2dAttribute {
                kernel: [2, 2],
                stride: [2, 2],
                pad: [0, 0, 0, 0],
                nan_mode: NanMode::Propagate,
            }),
        });
        builder.add_operator(IrOperator {
            name: Some("amin".to_string()),
            opcode: Opcode::qnn(qnn_ops::PACKAGE_QTI_AISW, qnn_ops::REDUCE_MIN),
            inputs: vec!["y".to_string()],
            outputs: vec!["z".to_string()],
            attributes: Attributes::Qnn(QnnParams::default()),
        });

        assert_eq!(builder.len(), 2);
        assert_eq!(builder.operators[0].opcode.to_string(), "MAX_POOL2D");
        assert_eq!(builder.operators[1].opcode.to_string(), "qti.aisw.ReduceMin");

        let json = builder.to_json().unwrap();
        assert!(json.contains("\"MAX_POOL2D\""));
        assert!(json.contains("\"nan_mode\": \"propagate\""));
        let decoded: ProgramBuilder = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, builder);
    }
}
