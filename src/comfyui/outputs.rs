//! Collecting produced images out of a history document.
use rand::Rng;
use serde_json::Value;

/// One image reference reported under a node's outputs in history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputImage {
    pub node_id: String,
    pub filename: String,
    pub subfolder: String,
    pub kind: String,
}

/// Collect every image reference under `history[prompt_id].outputs`.
///
/// A prompt id absent from history, or an entry without `outputs`, yields an
/// empty list rather than an error; the caller answers with an empty result.
pub fn image_refs(history: &Value, prompt_id: &str) -> Vec<OutputImage> {
    let mut refs = Vec::new();
    let outputs = match history
        .get(prompt_id)
        .and_then(|entry| entry.get("outputs"))
        .and_then(|outputs| outputs.as_object())
    {
        Some(outputs) => outputs,
        None => return refs,
    };

    for (node_id, node_output) in outputs {
        let images = match node_output.get("images").and_then(|images| images.as_array()) {
            Some(images) => images,
            None => continue,
        };
        for descriptor in images {
            let filename = match descriptor.get("filename").and_then(|f| f.as_str()) {
                Some(filename) => filename,
                None => continue,
            };
            refs.push(OutputImage {
                node_id: node_id.clone(),
                filename: filename.to_string(),
                subfolder: descriptor.get("subfolder").and_then(|s| s.as_str()).unwrap_or("").to_string(),
                kind: descriptor.get("type").and_then(|t| t.as_str()).unwrap_or("output").to_string(),
            });
        }
    }
    refs
}

/// Storage name for a fetched image. The random numeric prefix keeps two
/// generations of the same engine filename from colliding in the store.
pub fn storage_name(filename: &str) -> String {
    format!("{}-{}", rand::thread_rng().gen_range(1..=u64::MAX), filename)
}
