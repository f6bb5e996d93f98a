/// Sentence embedding backend.
///
/// All vectors produced by one implementation share `dim()` and a single
/// model identity; vectors from different models are not comparable.
/// `embed_batch` preserves input length and order, or fails as a whole —
/// callers never see partial results. An empty batch is not an error.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g., `local:minilm:d384`).
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
