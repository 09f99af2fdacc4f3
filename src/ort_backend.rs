// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// ONNX Runtime engine: session construction, execution provider, tensor I/O

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use ndarray::{Array, IxDyn};
use ort::{inputs, session::Session, value::TensorRef};

/// Execution provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrtEP {
    #[default]
    CPU,
    CUDA(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub ep: OrtEP,
    /// (height, width) of the model input
    pub image_size: (u32, u32),
}

pub struct OrtBackend {
    session: Session,
    ep: OrtEP,
    input_name: String,
    output_names: Vec<String>,
    height: u32,
    width: u32,
}

impl OrtBackend {
    pub fn build(config: OrtConfig) -> Result<Self> {
        let builder = Session::builder()
            .map_err(|e| anyhow!("failed to create session builder: {}", e))?;

        let builder = match config.ep {
            OrtEP::CPU => builder,
            #[cfg(feature = "cuda")]
            OrtEP::CUDA(device_id) => {
                use ort::ep::ExecutionProvider;
                use ort::execution_providers::CUDAExecutionProvider;
                let ep = CUDAExecutionProvider::default().with_device_id(device_id);
                if !ep.is_available().unwrap_or(false) {
                    tracing::warn!(
                        device_id,
                        "CUDA execution provider unavailable, may fall back to CPU"
                    );
                }
                builder
                    .with_execution_providers([ep.build()])
                    .map_err(|e| anyhow!("failed to register CUDA provider: {}", e))?
            }
            #[cfg(not(feature = "cuda"))]
            OrtEP::CUDA(_) => {
                return Err(anyhow!("CUDA requested but built without the `cuda` feature"));
            }
        };

        if !config.f.exists() {
            return Err(anyhow!("model file not found: {}", config.f.display()));
        }
        let session = builder
            .commit_from_file(&config.f)
            .map_err(|e| anyhow!("failed to load {}: {}", config.f.display(), e))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| anyhow!("model has no inputs"))?;
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();
        if output_names.is_empty() {
            return Err(anyhow!("model has no outputs"));
        }

        let (height, width) = config.image_size;
        Ok(Self {
            session,
            ep: config.ep,
            input_name,
            output_names,
            height,
            width,
        })
    }

    /// Runs one NCHW batch and returns every output as an owned f32 array.
    pub fn run(&mut self, xs: Array<f32, IxDyn>, profile: bool) -> Result<Vec<Array<f32, IxDyn>>> {
        let t = std::time::Instant::now();
        let tensor = TensorRef::from_array_view(xs.view())
            .map_err(|e| anyhow!("failed to create input tensor: {}", e))?;
        let outputs = self
            .session
            .run(inputs![self.input_name.as_str() => tensor])
            .map_err(|e| anyhow!("inference failed: {}", e))?;
        if profile {
            tracing::debug!(elapsed = ?t.elapsed(), "ort run");
        }

        let mut ys = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let y = outputs[name.as_str()]
                .try_extract_array::<f32>()
                .map_err(|e| anyhow!("output `{}` is not f32: {}", name, e))?;
            ys.push(y.into_owned());
        }
        Ok(ys)
    }

    pub fn ep(&self) -> &OrtEP {
        &self.ep
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }
}
