//! Precondition checks shared by the visitors, plus the pad arithmetic that
//! reconciles ceil-mode pooling with a floor-only IR output formula.

use crate::error::LoweringError;
use crate::graph::{DataType, TensorArgument};
use crate::target::TargetSpecification;

pub fn validate_num_inputs<T>(
    op: &str,
    inputs: &[T],
    allowed_counts: &[usize],
) -> Result<(), LoweringError> {
    if allowed_counts.contains(&inputs.len()) {
        return Ok(());
    }
    Err(LoweringError::Arity {
        op: op.to_string(),
        expected: allowed_counts.to_vec(),
        actual: inputs.len(),
    })
}

pub fn validate_same_dtype(op: &str, tensors: &[&TensorArgument]) -> Result<(), LoweringError> {
    let Some(first) = tensors.first() else {
        return Ok(());
    };
    for tensor in &tensors[1..] {
        if tensor.dtype != first.dtype {
            return Err(LoweringError::DTypeMismatch {
                op: op.to_string(),
                tensor: tensor.name.clone(),
                expected: first.dtype,
                found: tensor.dtype,
            });
        }
    }
    Ok(())
}

/// Each tensor's dtype must be in `allowed_dtypes` and legal under `spec`.
pub fn validate_valid_dtype(
    op: &str,
    tensors: &[&TensorArgument],
    allowed_dtypes: &[DataType],
    spec: &TargetSpecification,
) -> Result<(), LoweringError> {
    for tensor in tensors {
        if !allowed_dtypes.contains(&tensor.dtype) || !spec.supports_dtype(tensor.dtype) {
            return Err(LoweringError::UnsupportedDType {
                op: op.to_string(),
                tensor: tensor.name.clone(),
                dtype: tensor.dtype,
                allowed: allowed_dtypes
                    .iter()
                    .copied()
                    .filter(|dtype| spec.supports_dtype(*dtype))
                    .collect(),
                spec: *spec,
            });
        }
    }
    Ok(())
}

/// Output extent of a pooling window under the floor-only formula used by the IR.
pub fn pooling_output_size(
    input: usize,
    kernel: usize,
    stride: usize,
    pad_before: usize,
    pad_after: usize,
) -> usize {
    let padded = input.saturating_add(pad_before).saturating_add(pad_after);
    (padded.saturating_sub(kernel) / stride.max(1)).saturating_add(1)
}

/// Trailing pad needed so the floor formula reproduces the ceil-mode output,
/// or `None` when the extents do not fit in `usize`.
///
/// Ceil mode drops a final window that would start inside the trailing
/// padding, so the result stays below `kernel` for any `pad <= kernel / 2`.
fn required_pooling_pad(input: usize, kernel: usize, stride: usize, pad: usize) -> Option<usize> {
    let stride = stride.max(1);
    let covered = input.checked_add(pad)?;
    let padded = covered.checked_add(pad)?;
    if padded < kernel {
        return Some(pad);
    }
    let mut output = (padded - kernel).div_ceil(stride).checked_add(1)?;
    if (output - 1).checked_mul(stride)? >= covered {
        output -= 1;
    }
    let last_end = (output - 1).checked_mul(stride)?.checked_add(kernel)?;
    Some(pad.max(last_end.saturating_sub(covered)))
}

/// Returns the trailing pad to emit for one spatial axis.
///
/// Without `ceil_mode` the pad is returned unchanged. With it, the pad grows
/// just enough for `floor((input + pad + result - kernel) / stride) + 1` to
/// match the ceil-mode extent, clamped to `kernel - 1` so no window reads
/// only padding.
pub fn adjust_pooling_pad_if_needed(
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    ceil_mode: bool,
) -> usize {
    if !ceil_mode {
        return pad;
    }
    let limit = kernel.saturating_sub(1);
    match required_pooling_pad(input, kernel, stride, pad) {
        Some(required) if required <= limit => required,
        required => {
            tracing::warn!(
                input,
                kernel,
                stride,
                pad,
                ?required,
                "clamping ceil-mode pooling pad to kernel - 1"
            );
            limit
        }
    }
}

/// Like [`adjust_pooling_pad_if_needed`], but fails instead of clamping.
pub fn checked_pooling_pad(
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    ceil_mode: bool,
) -> Result<usize, LoweringError> {
    if !ceil_mode {
        return Ok(pad);
    }
    match required_pooling_pad(input, kernel, stride, pad) {
        Some(required) if required < kernel => Ok(required),
        required => Err(LoweringError::PadOverflow {
            input,
            kernel,
            stride,
            required: required.unwrap_or(usize::MAX),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{TOSA_0_80_BI, TOSA_1_0_FP};
    use proptest::prelude::*;

    fn tensor(name: &str, dtype: DataType) -> TensorArgument {
        TensorArgument::new(name, dtype, vec![1, 1, 4, 4])
    }

    #[test]
    fn num_inputs_accepts_only_allowed_counts() {
        let inputs = vec![0u8; 4];
        assert!(validate_num_inputs("op", &inputs, &[3, 4, 5, 6]).is_ok());
        let err = validate_num_inputs("op", &inputs[..2], &[3, 4, 5, 6]).unwrap_err();
        assert!(matches!(
            err,
            LoweringError::Arity { actual: 2, ref expected, .. } if expected == &vec![3, 4, 5, 6]
        ));
        assert!(validate_num_inputs::<u8>("op", &[], &[1]).is_err());
    }

    #[test]
    fn same_dtype_reports_first_mismatch() {
        let a = tensor("a", DataType::Float32);
        let b = tensor("b", DataType::Float32);
        let c = tensor("c", DataType::Int8);
        assert!(validate_same_dtype("op", &[&a, &b]).is_ok());
        assert!(validate_same_dtype("op", &[]).is_ok());
        let err = validate_same_dtype("op", &[&a, &b, &c]).unwrap_err();
        assert!(matches!(
            err,
            LoweringError::DTypeMismatch { ref tensor, found: DataType::Int8, .. } if tensor == "c"
        ));
    }

    #[test]
    fn valid_dtype_checks_allowed_set_and_profile() {
        let fp = tensor("x", DataType::Float32);
        let allowed = [DataType::Int8, DataType::Float32];
        assert!(validate_valid_dtype("op", &[&fp], &allowed, &TOSA_1_0_FP).is_ok());
        assert!(matches!(
            validate_valid_dtype("op", &[&fp], &allowed, &TOSA_0_80_BI),
            Err(LoweringError::UnsupportedDType { dtype: DataType::Float32, .. })
        ));
        let i32_tensor = tensor("y", DataType::Int32);
        assert!(validate_valid_dtype("op", &[&i32_tensor], &allowed, &TOSA_1_0_FP).is_err());
    }

    #[test]
    fn ceil_mode_pad_matches_ceil_output() {
        let pad = adjust_pooling_pad_if_needed(5, 3, 2, 0, true);
        assert_eq!(pad, 0);
        assert_eq!(pooling_output_size(5, 3, 2, 0, pad), 2);

        let pad = adjust_pooling_pad_if_needed(6, 3, 2, 0, true);
        assert_eq!(pad, 1);
        assert_eq!(pooling_output_size(6, 3, 2, 0, pad), 3);

        let pad = adjust_pooling_pad_if_needed(7, 2, 2, 0, true);
        assert_eq!(pad, 1);
        assert_eq!(pooling_output_size(7, 2, 2, 0, pad), 4);
    }

    #[test]
    fn floor_mode_returns_pad_unchanged() {
        assert_eq!(adjust_pooling_pad_if_needed(5, 3, 2, 0, false), 0);
        assert_eq!(adjust_pooling_pad_if_needed(6, 3, 2, 1, false), 1);
    }

    #[test]
    fn window_starting_in_trailing_padding_is_dropped() {
        // ceil((5 + 2 - 2) / 3) + 1 = 3, but the third window would start at
        // offset 6, past the input plus leading pad.
        let pad = adjust_pooling_pad_if_needed(5, 2, 3, 1, true);
        assert_eq!(pad, 1);
        assert_eq!(pooling_output_size(5, 2, 3, 1, pad), 2);
    }

    #[test]
    fn oversized_pad_is_clamped_or_rejected() {
        assert_eq!(adjust_pooling_pad_if_needed(4, 2, 1, 3, true), 1);
        assert!(matches!(
            checked_pooling_pad(4, 2, 1, 3, true),
            Err(LoweringError::PadOverflow { kernel: 2, .. })
        ));
        assert_eq!(checked_pooling_pad(6, 3, 2, 0, true).unwrap(), 1);
    }

    #[test]
    fn extreme_pad_is_clamped_instead_of_overflowing() {
        let huge = i64::MAX as usize;
        assert_eq!(adjust_pooling_pad_if_needed(4, 2, 1, huge, true), 1);
        assert_eq!(adjust_pooling_pad_if_needed(usize::MAX, 3, 1, usize::MAX, true), 2);
        assert!(matches!(
            checked_pooling_pad(4, 2, 1, huge, true),
            Err(LoweringError::PadOverflow { required: usize::MAX, .. })
        ));
        assert_eq!(pooling_output_size(4, 2, 1, usize::MAX, usize::MAX), usize::MAX - 1);
    }

    proptest! {
        #[test]
        fn prop_num_inputs_matches_membership(count in 0usize..64) {
            let inputs = vec![(); count];
            let allowed = [3usize, 4, 5, 6];
            prop_assert_eq!(
                validate_num_inputs("op", &inputs, &allowed).is_ok(),
                allowed.contains(&count)
            );
        }

        #[test]
        fn prop_ceil_pad_reproduces_ceil_extent(
            kernel in 1usize..8,
            stride in 1usize..8,
            extra in 0usize..48,
            pad_fraction in 0usize..=100,
        ) {
            let pad = kernel / 2 * pad_fraction / 100;
            let input = kernel + extra;
            let mut expected = (input + 2 * pad - kernel).div_ceil(stride) + 1;
            if (expected - 1) * stride >= input + pad {
                expected -= 1;
            }

            let adjusted = adjust_pooling_pad_if_needed(input, kernel, stride, pad, true);
            prop_assert!(adjusted < kernel);
            prop_assert!(adjusted >= pad);
            prop_assert_eq!(pooling_output_size(input, kernel, stride, pad, adjusted), expected);
        }

        #[test]
        fn prop_ceil_pad_never_reaches_kernel(
            input in any::<usize>(),
            kernel in 1usize..64,
            stride in any::<usize>(),
            pad in any::<usize>(),
        ) {
            prop_assert!(adjust_pooling_pad_if_needed(input, kernel, stride, pad, true) < kernel);
            match checked_pooling_pad(input, kernel, stride, pad, true) {
                Ok(required) => prop_assert!(required < kernel),
                Err(err) => prop_assert!(matches!(err, LoweringError::PadOverflow { .. }), "{err}"),
            }
        }
    }
}
