use std::fs;
use std::path::Path;

use crate::error::LoweringError;
use crate::graph::LoweringInput;

/// Load a lowering input document (nodes, optional target, quantization table)
/// from a JSON file.
pub fn load_lowering_input(path: impl AsRef<Path>) -> Result<LoweringInput, LoweringError> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref).map_err(|err| LoweringError::io(path_ref, err))?;
    let input: LoweringInput = serde_json::from_str(&contents)?;
    tracing::debug!(
        path = %path_ref.display(),
        nodes = input.nodes.len(),
        quantized = !input.quantization.is_empty(),
        "loaded lowering input"
    );
    Ok(input)
}
