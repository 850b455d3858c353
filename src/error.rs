use std::path::PathBuf;

use crate::graph::DataType;
use crate::target::TargetSpecification;
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoweringError {
    #[error("`{op}` expects {expected:?} inputs, got {actual}")]
    Arity {
        op: String,
        expected: Vec<usize>,
        actual: usize,
    },
    #[error("`{op}` expects all tensors to be {expected:?}, but `{tensor}` is {found:?}")]
    DTypeMismatch {
        op: String,
        tensor: String,
        expected: DataType,
        found: DataType,
    },
    #[error("`{op}` does not support tensor `{tensor}` of type {dtype:?} under {spec} (allowed: {allowed:?})")]
    UnsupportedDType {
        op: String,
        tensor: String,
        dtype: DataType,
        allowed: Vec<DataType>,
        spec: TargetSpecification,
    },
    #[error("no visitor registered for `{op}` under {spec}")]
    UnregisteredOperator {
        op: String,
        spec: TargetSpecification,
    },
    #[error("`{op}` under {spec} is already bound to `{existing}`, cannot bind `{incoming}`")]
    Conflict {
        op: String,
        spec: TargetSpecification,
        existing: &'static str,
        incoming: &'static str,
    },
    #[error("`{op}` argument {index} must be {expected}")]
    InvalidArgument {
        op: String,
        index: usize,
        expected: &'static str,
    },
    #[error("`{op}` does not support {attribute}: {reason}")]
    UnsupportedAttribute {
        op: String,
        attribute: &'static str,
        reason: String,
    },
    #[error("node `{node}` has no quantization parameters for {direction} {index}")]
    MissingQuantParams {
        node: String,
        direction: &'static str,
        index: usize,
    },
    #[error("node `{node}` uses per-channel quantization where a per-tensor zero-point is required")]
    PerChannelZeroPoint { node: String },
    #[error("`{op}` axis {axis} is invalid for a rank {rank} tensor")]
    InvalidAxis { op: String, axis: i64, rank: usize },
    #[error(
        "pooling pad {required} for input {input}, kernel {kernel}, stride {stride} would leave a window reading only padding"
    )]
    PadOverflow {
        input: usize,
        kernel: usize,
        stride: usize,
        required: usize,
    },
    #[error("target specification `{spec}` is invalid: {reason}")]
    InvalidTargetSpec { spec: String, reason: String },
    #[error("no target specification given; pass --target or set `target` in the graph file")]
    MissingTarget,
    #[error("graph file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON could not be processed: {source}")]
    Parse {
        #[from]
        source: JsonError,
    },
    #[error("lowered program could not be exported to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LoweringError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoweringError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoweringError::ExportIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_argument(op: &str, index: usize, expected: &'static str) -> Self {
        LoweringError::InvalidArgument {
            op: op.to_string(),
            index,
            expected,
        }
    }
}
