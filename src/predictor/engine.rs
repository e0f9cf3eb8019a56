//! Inference engine with lazy, at-most-once model loading.

use crate::core::config::EngineConfig;
use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use crate::core::errors::{SimpleError, SmearError, SmearResult};
use crate::domain::{DiseaseScore, PredictionResult};
use crate::models::{CheckpointLoader, ModelHandle, ModelLoader};
use crate::processors::{ImageDecoder, Preprocessor, softmax_ranked};
use image::RgbImage;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

enum LoadState {
    Cold,
    Loading,
    Ready(Arc<ModelHandle>),
    Failed(String),
}

struct LoadSlot {
    state: Mutex<LoadState>,
    settled: Condvar,
}

impl LoadSlot {
    fn lock(&self) -> SmearResult<MutexGuard<'_, LoadState>> {
        self.state.lock().map_err(|_| SmearError::ModelUnavailable {
            reason: "model state lock poisoned".to_string(),
        })
    }

    fn settle(&self, next: LoadState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        self.settled.notify_all();
    }
}

/// Turns encoded images into ranked [`PredictionResult`]s.
///
/// The model is built by the [`ModelLoader`] on the first call that needs it
/// (or on [`InferenceEngine::warm_up`]). Concurrent first callers wait on the
/// same construction; a failed construction is remembered and every later
/// call fails with [`SmearError::ModelUnavailable`] until the engine is
/// dropped.
///
/// The engine is `Send + Sync`; share it behind an `Arc` to serve requests
/// from several threads.
pub struct InferenceEngine {
    loader: Arc<dyn ModelLoader>,
    slot: Arc<LoadSlot>,
    decoder: ImageDecoder,
    preprocessor: Preprocessor,
    load_timeout: Option<Duration>,
    parallel_threshold: usize,
    device_hint: String,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("loaded", &self.is_loaded())
            .field("load_timeout", &self.load_timeout)
            .field("parallel_threshold", &self.parallel_threshold)
            .field("device", &self.device())
            .finish()
    }
}

impl InferenceEngine {
    /// Creates a cold engine around `loader`. Nothing is loaded yet.
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            slot: Arc::new(LoadSlot {
                state: Mutex::new(LoadState::Cold),
                settled: Condvar::new(),
            }),
            decoder: ImageDecoder::new(),
            preprocessor: Preprocessor::new(),
            load_timeout: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            device_hint: "cpu".to_string(),
        }
    }

    /// Creates a cold engine that loads the checkpoint named by `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let loader = Arc::new(CheckpointLoader::from_config(config));
        let mut engine = Self::new(loader);
        engine.load_timeout = config.load_timeout_duration();
        engine.device_hint = config.device_label();
        engine
    }

    /// Bounds how long predict calls wait for a cold model.
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Minimum batch length processed in parallel by [`predict_batch`](Self::predict_batch).
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    /// True once a model has been built successfully.
    pub fn is_loaded(&self) -> bool {
        self.slot
            .state
            .lock()
            .map(|state| matches!(*state, LoadState::Ready(_)))
            .unwrap_or(false)
    }

    /// Device of the loaded model, or the configured device while cold.
    pub fn device(&self) -> String {
        match self.slot.state.lock().as_deref() {
            Ok(LoadState::Ready(handle)) => handle.device().to_string(),
            _ => self.device_hint.clone(),
        }
    }

    /// Builds the model if needed and returns the shared handle.
    ///
    /// `timeout` bounds the wait for this caller only: on expiry the call
    /// returns [`SmearError::LoadTimeout`] while construction continues in the
    /// background and fills the cache for later callers.
    pub fn warm_up(&self, timeout: Option<Duration>) -> SmearResult<Arc<ModelHandle>> {
        let started = Instant::now();
        let mut state = self.slot.lock()?;

        if matches!(*state, LoadState::Cold) {
            if let Err(e) = self.spawn_loader() {
                let reason = format!("failed to start model loader: {e}");
                error!("{}", reason);
                *state = LoadState::Failed(reason.clone());
                return Err(SmearError::ModelUnavailable { reason });
            }
            *state = LoadState::Loading;
        }

        if matches!(*state, LoadState::Loading) {
            let loading = |s: &mut LoadState| matches!(s, LoadState::Loading);
            state = match timeout {
                None => self
                    .slot
                    .settled
                    .wait_while(state, loading)
                    .map_err(|_| SmearError::ModelUnavailable {
                        reason: "model state lock poisoned".to_string(),
                    })?,
                Some(limit) => {
                    let (guard, wait) = self
                        .slot
                        .settled
                        .wait_timeout_while(state, limit, loading)
                        .map_err(|_| SmearError::ModelUnavailable {
                            reason: "model state lock poisoned".to_string(),
                        })?;
                    if wait.timed_out() {
                        return Err(SmearError::LoadTimeout {
                            waited: started.elapsed(),
                        });
                    }
                    guard
                }
            };
        }

        match &*state {
            LoadState::Ready(handle) => Ok(Arc::clone(handle)),
            LoadState::Failed(reason) => Err(SmearError::ModelUnavailable {
                reason: reason.clone(),
            }),
            LoadState::Cold | LoadState::Loading => Err(SmearError::ModelUnavailable {
                reason: "model load did not settle".to_string(),
            }),
        }
    }

    /// Runs the loader on its own thread so a caller that stops waiting
    /// does not cancel construction.
    fn spawn_loader(&self) -> std::io::Result<()> {
        let loader = Arc::clone(&self.loader);
        let slot = Arc::clone(&self.slot);
        let spawned = std::thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                info!("Loading classifier model");
                let started = Instant::now();
                let next = match catch_unwind(AssertUnwindSafe(|| loader.load())) {
                    Ok(Ok(handle)) => {
                        info!(
                            classes = handle.labels().len(),
                            device = handle.device(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Classifier model ready"
                        );
                        LoadState::Ready(Arc::new(handle))
                    }
                    Ok(Err(e)) => {
                        error!("Model load failed: {}", e);
                        LoadState::Failed(e.to_string())
                    }
                    Err(_) => {
                        error!("Model loader panicked");
                        LoadState::Failed("model loader panicked".to_string())
                    }
                };
                slot.settle(next);
            });

        spawned.map(|_| ())
    }

    /// Classifies one base64 image payload, optionally data-URI prefixed.
    ///
    /// # Errors
    ///
    /// Only service faults are returned as `Err`:
    /// [`SmearError::ModelUnavailable`] and [`SmearError::LoadTimeout`].
    /// Decoding, preprocessing and inference failures produce an `Ok` result
    /// with `status == error`.
    pub fn predict(&self, encoded_image: &str) -> SmearResult<PredictionResult> {
        let handle = self.ready_handle()?;
        Ok(self.predict_with(&handle, encoded_image))
    }

    /// Classifies an already decoded image. Errors follow [`predict`](Self::predict).
    pub fn predict_image(&self, img: &RgbImage) -> SmearResult<PredictionResult> {
        let handle = self.ready_handle()?;
        Ok(settle_result(self.classify(&handle, img)))
    }

    /// Classifies each payload independently, preserving input order.
    ///
    /// Batches at or above the parallel threshold are spread over the rayon
    /// pool.
    pub fn predict_batch<S>(&self, encoded_images: &[S]) -> SmearResult<Vec<PredictionResult>>
    where
        S: AsRef<str> + Sync,
    {
        if encoded_images.is_empty() {
            return Ok(Vec::new());
        }
        let handle = self.ready_handle()?;
        let results = if encoded_images.len() >= self.parallel_threshold {
            encoded_images
                .par_iter()
                .map(|payload| self.predict_with(&handle, payload.as_ref()))
                .collect()
        } else {
            encoded_images
                .iter()
                .map(|payload| self.predict_with(&handle, payload.as_ref()))
                .collect()
        };
        Ok(results)
    }

    fn ready_handle(&self) -> SmearResult<Arc<ModelHandle>> {
        self.warm_up(self.load_timeout)
    }

    fn predict_with(&self, handle: &ModelHandle, encoded_image: &str) -> PredictionResult {
        let outcome = self
            .decoder
            .decode(encoded_image)
            .and_then(|img| self.classify(handle, &img));
        settle_result(outcome)
    }

    fn classify(&self, handle: &ModelHandle, img: &RgbImage) -> SmearResult<PredictionResult> {
        let input = self.preprocessor.preprocess(img)?;
        let model = handle.model();
        let scores = model.forward(&input)?;

        let labels = handle.labels();
        if scores.nrows() != 1 || scores.ncols() != labels.len() {
            return Err(SmearError::inference_error(
                model.name(),
                &format!(
                    "expected scores of shape [1, {}], got {:?}",
                    labels.len(),
                    scores.shape()
                ),
                SimpleError::new("score shape mismatch"),
            ));
        }

        let raw: Vec<f32> = scores.row(0).to_vec();
        let ranked = softmax_ranked(&raw)?;
        let all_predictions = ranked
            .into_iter()
            .map(|score| {
                labels
                    .get(score.index)
                    .map(|name| DiseaseScore {
                        disease: name.to_string(),
                        confidence: score.probability,
                    })
                    .ok_or_else(|| {
                        SmearError::post_processing(
                            "aligning scores with class names",
                            SimpleError::new(format!("class index {} out of range", score.index)),
                        )
                    })
            })
            .collect::<SmearResult<Vec<_>>>()?;

        PredictionResult::from_ranked(all_predictions)
    }
}

fn settle_result(outcome: SmearResult<PredictionResult>) -> PredictionResult {
    match outcome {
        Ok(result) => {
            debug!(
                predicted_class = result.predicted_class(),
                confidence = result.confidence(),
                "Prediction complete"
            );
            result
        }
        Err(e) => {
            debug!("Prediction failed: {}", e);
            PredictionResult::failure(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictionStatus;
    use crate::models::testing::{FailingClassifier, fixed_handle, intensity_handle, labels};
    use crate::utils::{encode_png_base64, solid_rgb_image};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_engine(
        delay: Duration,
        build: fn() -> SmearResult<ModelHandle>,
    ) -> (InferenceEngine, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let loader = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(delay);
            build()
        };
        (InferenceEngine::new(Arc::new(loader)), calls)
    }

    fn payload(color: [u8; 3]) -> String {
        encode_png_base64(&solid_rgb_image(40, 30, color)).unwrap()
    }

    #[test]
    fn test_concurrent_first_calls_load_once() {
        let (engine, calls) = counting_engine(Duration::from_millis(50), || intensity_handle(10));
        let input = payload([180, 40, 90]);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| engine.predict(&input))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap();
        assert!(first.is_success());
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), first);
        }
    }

    #[test]
    fn test_load_failure_is_cached() {
        let (engine, calls) = counting_engine(Duration::ZERO, || {
            Err(SmearError::model_load_error(
                "models/best_model.json",
                "checkpoint not found",
                None,
                None::<std::io::Error>,
            ))
        });

        for _ in 0..3 {
            match engine.predict(&payload([1, 2, 3])) {
                Err(SmearError::ModelUnavailable { reason }) => {
                    assert!(reason.contains("checkpoint not found"))
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!engine.is_loaded());
    }

    #[test]
    fn test_concurrent_callers_share_failure() {
        let (engine, calls) = counting_engine(Duration::from_millis(30), || {
            Err(SmearError::config_error("broken"))
        });
        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..6).map(|_| s.spawn(|| engine.warm_up(None))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            outcomes
                .iter()
                .all(|o| matches!(o, Err(SmearError::ModelUnavailable { .. })))
        );
    }

    #[test]
    fn test_panicking_loader_becomes_unavailable() {
        let engine = InferenceEngine::new(Arc::new(|| -> SmearResult<ModelHandle> {
            panic!("corrupt weights")
        }));
        assert!(matches!(
            engine.warm_up(None),
            Err(SmearError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_timeout_leaves_load_running() {
        let (engine, calls) = counting_engine(Duration::from_millis(300), || intensity_handle(4));

        let err = engine.warm_up(Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(err, SmearError::LoadTimeout { .. }));
        assert!(err.is_service_fault());

        let handle = engine.warm_up(None).unwrap();
        assert_eq!(handle.labels().len(), 4);
        assert!(engine.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(10)));
        let input = payload([120, 200, 15]);
        let first = engine.predict(&input).unwrap();
        let second = engine.predict(&input).unwrap();
        assert_eq!(first, second);
        for (a, b) in first.all_predictions().iter().zip(second.all_predictions()) {
            assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        }
    }

    #[test]
    fn test_prediction_invariants() {
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(10)));
        let result = engine.predict(&payload([250, 10, 128])).unwrap();

        assert_eq!(result.status(), PredictionStatus::Success);
        assert_eq!(result.all_predictions().len(), 10);
        let sum: f32 = result.all_predictions().iter().map(|p| p.confidence).sum();
        assert!((sum - 1.0).abs() <= 1e-4);
        assert!(
            result
                .all_predictions()
                .windows(2)
                .all(|w| w[0].confidence >= w[1].confidence)
        );
        assert_eq!(result.predicted_class(), result.all_predictions()[0].disease);
        assert_eq!(result.confidence(), result.all_predictions()[0].confidence);
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_ties_keep_class_index_order() {
        let engine = InferenceEngine::new(Arc::new(|| fixed_handle(vec![0.5, 2.0, 2.0, 0.5])));
        let result = engine.predict(&payload([0, 0, 0])).unwrap();
        let names = labels(4);
        let order: Vec<&str> = result
            .all_predictions()
            .iter()
            .map(|p| p.disease.as_str())
            .collect();
        assert_eq!(
            order,
            vec![
                names.get(1).unwrap(),
                names.get(2).unwrap(),
                names.get(0).unwrap(),
                names.get(3).unwrap()
            ]
        );
        assert_eq!(result.predicted_class(), names.get(1).unwrap());
    }

    #[test]
    fn test_malformed_payload_yields_error_result() {
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(3)));
        let result = engine.predict("data:image/png;base64,@@not-base64@@").unwrap();
        assert_eq!(result.status(), PredictionStatus::Error);
        assert!(result.error_message().is_some());
        assert!(result.all_predictions().is_empty());
    }

    #[test]
    fn test_inference_failure_yields_error_result() {
        let engine = InferenceEngine::new(Arc::new(|| {
            ModelHandle::new(Box::new(FailingClassifier { num_classes: 2 }), labels(2), "cpu")
        }));
        let result = engine.predict(&payload([9, 9, 9])).unwrap();
        assert!(!result.is_success());
        assert!(result.error_message().unwrap().contains("failing"));
    }

    #[test]
    fn test_predict_image_matches_predict() {
        let engine = InferenceEngine::new(Arc::new(|| intensity_handle(5)));
        let img = solid_rgb_image(40, 30, [60, 70, 80]);
        let via_payload = engine.predict(&encode_png_base64(&img).unwrap()).unwrap();
        let via_image = engine.predict_image(&img).unwrap();
        assert_eq!(via_payload, via_image);
    }

    #[test]
    fn test_predict_batch_preserves_order() {
        let engine =
            InferenceEngine::new(Arc::new(|| intensity_handle(6))).with_parallel_threshold(2);
        let inputs = vec![
            payload([255, 0, 0]),
            "%%%".to_string(),
            payload([0, 0, 255]),
        ];
        let results = engine.predict_batch(&inputs).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(results[2].is_success());
        assert_eq!(results[0], engine.predict(&inputs[0]).unwrap());
        assert_eq!(results[2], engine.predict(&inputs[2]).unwrap());
    }

    #[test]
    fn test_device_reflects_loaded_handle() {
        let engine = InferenceEngine::new(Arc::new(|| {
            ModelHandle::new(
                Box::new(crate::models::testing::IntensityClassifier::new(2)),
                labels(2),
                "cuda:0",
            )
        }));
        assert_eq!(engine.device(), "cpu");
        engine.warm_up(None).unwrap();
        assert_eq!(engine.device(), "cuda:0");
    }
}
