use super::*;
use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;
use std::sync::Mutex;

impl OrtInfer {
    /// Creates a new OrtInfer instance with default ONNX Runtime settings and a single session.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, SmearError> {
        Self::from_config(None, 1, model_path)
    }

    /// Creates an OrtInfer with `pool_size` sessions, applying the optional
    /// session configuration to each of them.
    pub fn from_config(
        ort_config: Option<&OrtSessionConfig>,
        pool_size: usize,
        model_path: impl AsRef<Path>,
    ) -> Result<Self, SmearError> {
        let path = model_path.as_ref();
        let pool_size = pool_size.max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let session = Session::builder()
                .and_then(|builder| match ort_config {
                    Some(cfg) => Self::apply_ort_config(builder, cfg),
                    // Keep ORT quiet unless configured otherwise
                    None => builder.with_log_level(LogLevel::Error),
                })
                .and_then(|builder| builder.commit_from_file(path))
                .map_err(|e| {
                    SmearError::model_load_error(
                        path,
                        "failed to create ONNX session",
                        Some("verify the model file exists and matches the selected execution providers"),
                        Some(e),
                    )
                })?;
            sessions.push(Mutex::new(session));
        }

        let (input_name, output_name) = {
            let first = sessions[0].lock().map_err(|_| {
                SmearError::model_load_error(
                    path,
                    "session lock poisoned during construction",
                    None,
                    None::<std::io::Error>,
                )
            })?;
            let input = first.inputs.first().map(|i| i.name.clone());
            let output = first.outputs.first().map(|o| o.name.clone());
            (input, output)
        };
        let (Some(input_name), Some(output_name)) = (input_name, output_name) else {
            return Err(SmearError::model_load_error(
                path,
                "model declares no inputs or no outputs",
                Some("re-export the classifier with a single image input and a logits output"),
                None::<std::io::Error>,
            ));
        };

        let model_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown_model")
            .to_string();

        Ok(OrtInfer {
            sessions,
            next_idx: std::sync::atomic::AtomicUsize::new(0),
            input_name,
            output_name,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        builder = builder.with_log_level(LogLevel::Error)?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(level) = cfg.optimization_level {
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
                OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
                OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
                OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        if let Some(eps) = &cfg.execution_providers {
            let providers = Self::build_execution_providers(eps);
            if !providers.is_empty() {
                builder = builder.with_execution_providers(providers)?;
            }
        }
        Ok(builder)
    }

    fn build_execution_providers(eps: &[OrtExecutionProvider]) -> Vec<ExecutionProviderDispatch> {
        let mut providers = Vec::new();
        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers
                        .push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    tracing::warn!("CUDA execution provider requested but the `cuda` feature is disabled; falling back to CPU");
                }
            }
        }
        providers
    }
}
