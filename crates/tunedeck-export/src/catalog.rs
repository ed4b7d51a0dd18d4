use serde::{Deserialize, Serialize};

/// A local artifact format a finished model can be exported to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFormat {
    pub id: String,
    pub name: String,
    pub description: String,
    pub extension: String,
    /// Approximate artifact size, for display only.
    pub size: String,
}

/// A cloud destination, usable once `connected` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudTarget {
    pub id: String,
    pub name: String,
    pub description: String,
    pub connected: bool,
}

fn format(id: &str, name: &str, description: &str, extension: &str, size: &str) -> ModelFormat {
    ModelFormat {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        extension: extension.to_string(),
        size: size.to_string(),
    }
}

fn target(id: &str, name: &str, description: &str) -> CloudTarget {
    CloudTarget { id: id.to_string(), name: name.to_string(), description: description.to_string(), connected: false }
}

#[must_use]
pub fn model_formats() -> Vec<ModelFormat> {
    vec![
        format("pytorch", "PyTorch Model", "Standard PyTorch model format with full weights", "pt", "2.8 GB"),
        format("safetensors", "SafeTensors", "Safe format for storing tensors, faster loading", "st", "2.7 GB"),
        format("gguf", "GGUF Format", "Optimized format for local inference with llama.cpp", "gguf", "1.9 GB"),
        format("onnx", "ONNX Format", "Open standard for machine learning models", "onnx", "2.6 GB"),
    ]
}

/// Every target starts disconnected.
#[must_use]
pub fn cloud_targets() -> Vec<CloudTarget> {
    vec![
        target("vertex_ai", "Vertex AI", "Deploy to Google Cloud Vertex AI as a prediction endpoint"),
        target("cloud_storage", "Google Cloud Storage", "Export model artifacts to your GCS bucket"),
        target("huggingface", "Hugging Face Hub", "Publish your model to Hugging Face Hub repository"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let formats = model_formats();
        let ids: HashSet<_> = formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), formats.len());
        let targets = cloud_targets();
        let target_ids: HashSet<_> = targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(target_ids.len(), targets.len());
        assert_eq!(formats.iter().find(|f| f.id == "safetensors").unwrap().extension, "st");
        assert!(targets.iter().all(|t| !t.connected));
    }
}
