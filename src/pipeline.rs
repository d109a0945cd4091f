use image::DynamicImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::Result;
use tracing::debug;

/// Data that flows through the pipeline
/// Each PipelineData represents a single working image with associated metadata
#[derive(Clone)]
pub struct PipelineData {
    /// The working image (can be a grayscale copy, a face thumbnail, ...)
    pub image: DynamicImage,

    /// The decoded source image, shared between every item derived from it
    pub original: Arc<DynamicImage>,

    /// Text properties attached by steps (e.g., "entry_name", "ocr_text")
    pub metadata: HashMap<String, String>,
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            metadata: HashMap::new(),
        }
    }

    /// Derive a new item from this one: same original and metadata, new image
    pub fn derive(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Replace the working image, keeping original and metadata
    pub fn with_image(mut self, image: DynamicImage) -> Self {
        self.image = image;
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        prepare_debug_dir(&output_dir)?;
        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Share an already prepared debug configuration
    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run every step in order on a single input item.
    ///
    /// `label` names the debug sub-directory for this run, so several inputs
    /// can share one debug root without overwriting each other.
    pub fn run(&self, input: PipelineData, label: &str) -> Result<Vec<PipelineData>> {
        let debug_root = self
            .context
            .debug
            .as_ref()
            .map(|d| d.output_dir.join(sanitize_label(label)));

        if let Some(root) = &debug_root {
            save_debug_images(root, "00_input", std::slice::from_ref(&input))?;
        }

        let mut data = vec![input];

        for (step_idx, step) in self.steps.iter().enumerate() {
            debug!(step = step.name(), items = data.len(), label, "running step");

            data = step.process(data, &self.context)?;

            if let Some(root) = &debug_root {
                let step_dir_name = format!("{:02}_{}", step_idx + 1,
                    step.name().to_lowercase().replace(' ', "_"));
                save_debug_images(root, &step_dir_name, &data)?;
            }

            debug!(step = step.name(), items = data.len(), "step finished");

            if data.is_empty() {
                break;
            }
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a debug directory is empty, creating it if needed
pub fn prepare_debug_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        let entries = std::fs::read_dir(output_dir)?;
        if entries.count() > 0 {
            return Err(anyhow::anyhow!(
                "Debug directory is not empty: {}",
                output_dir.display()
            ));
        }
    } else {
        std::fs::create_dir_all(output_dir)?;
    }
    Ok(())
}

fn save_debug_images(root: &Path, step_dir_name: &str, data: &[PipelineData]) -> Result<()> {
    let step_dir = root.join(step_dir_name);
    std::fs::create_dir_all(&step_dir)?;

    for (idx, item) in data.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        item.image.save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
    }

    debug!(count = data.len(), dir = %step_dir.display(), "saved debug images");
    Ok(())
}

fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}
