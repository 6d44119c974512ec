//! Semantic text chunker.
//!
//! Splits text at points where adjacent sentences drift apart in embedding
//! space, so that each [`Chunk`] stays on one topic.
//!
//! # Algorithm
//!
//! 1. Split text into sentences on whitespace following `.`, `?` or `!`.
//! 2. For each sentence, build a window of itself plus `buffer_size`
//!    neighbours on each side, and embed every window in one batch.
//! 3. Compute `1 − cosine_similarity` between each pair of adjacent windows.
//! 4. Derive a threshold from the distance distribution using the configured
//!    [`BreakpointType`].
//! 5. Every distance strictly greater than the threshold closes a chunk after
//!    that sentence. Remaining sentences form the last chunk.
//!
//! Chunk boundaries are data-dependent: the cost is one embedding per
//! sentence at ingestion time.
//!
//! # Guarantees
//!
//! - Text with zero or one sentence yields exactly one chunk.
//! - With [`BreakpointType::Gradient`], exactly two sentences yield two
//!   chunks: a single distance has no gradient to compare against.
//! - Chunks are non-overlapping and in document order.
//! - The same text, config, and embedder always yield the same chunks.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::config::{BreakpointType, ChunkingConfig};
use crate::embedding::{cosine_similarity, Embedder};
use crate::models::{Chunk, TextUnit};

pub struct SemanticChunker {
    embedder: Arc<dyn Embedder>,
    config: ChunkingConfig,
}

impl SemanticChunker {
    pub fn new(embedder: Arc<dyn Embedder>, config: ChunkingConfig) -> Self {
        Self { embedder, config }
    }

    /// Chunk every non-blank text unit, preserving unit order.
    ///
    /// Each chunk inherits its unit's metadata; `chunk_index` restarts at 0
    /// for every unit.
    pub async fn split_units(&self, units: &[TextUnit]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for unit in units {
            if unit.text.trim().is_empty() {
                continue;
            }
            let pieces = self.split_text(&unit.text).await?;
            tracing::debug!(
                source = %unit.metadata.source,
                page = ?unit.metadata.page,
                chunks = pieces.len(),
                "chunked text unit"
            );
            for (i, text) in pieces.into_iter().enumerate() {
                chunks.push(make_chunk(unit, i as i64, text));
            }
        }
        Ok(chunks)
    }

    /// Split one text into semantically coherent pieces.
    pub async fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let sentences = split_sentences(text);
        if sentences.len() <= 1 {
            return Ok(vec![text.trim().to_string()]);
        }
        if sentences.len() == 2 && self.config.breakpoint_type == BreakpointType::Gradient {
            return Ok(sentences);
        }

        let windows = combine_sentences(&sentences, self.config.buffer_size);
        let embeddings = self.embedder.embed_texts(&windows).await?;
        if embeddings.len() != windows.len() {
            bail!(
                "embedder returned {} vectors for {} sentences",
                embeddings.len(),
                windows.len()
            );
        }

        let distances = adjacent_distances(&embeddings);
        let (threshold, values) = breakpoint_threshold(
            self.config.breakpoint_type,
            self.config.effective_amount(),
            &distances,
        );
        let breakpoints: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > threshold)
            .map(|(i, _)| i)
            .collect();

        Ok(group_sentences(
            &sentences,
            &breakpoints,
            self.config.min_chunk_size,
        ))
    }
}

fn make_chunk(unit: &TextUnit, index: i64, text: String) -> Chunk {
    let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
    Chunk {
        chunk_index: index,
        text,
        hash,
        metadata: unit.metadata.clone(),
    }
}

/// Split on runs of whitespace that directly follow `.`, `?` or `!`.
/// Empty pieces are dropped; each sentence is trimmed.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() && matches!(prev, Some('.' | '?' | '!')) {
            push_trimmed(&mut sentences, &text[start..i]);
            start = i;
        }
        prev = Some(c);
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let trimmed = piece.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Window each sentence with `buffer` neighbours on either side, joined by spaces.
pub fn combine_sentences(sentences: &[String], buffer: usize) -> Vec<String> {
    (0..sentences.len())
        .map(|i| {
            let lo = i.saturating_sub(buffer);
            let hi = (i + buffer).min(sentences.len() - 1);
            sentences[lo..=hi].join(" ")
        })
        .collect()
}

/// Cosine distance between each pair of adjacent embeddings.
pub fn adjacent_distances(embeddings: &[Vec<f32>]) -> Vec<f64> {
    embeddings
        .windows(2)
        .map(|pair| 1.0 - cosine_similarity(&pair[0], &pair[1]) as f64)
        .collect()
}

/// Returns the threshold and the values to compare against it.
///
/// For every strategy except [`BreakpointType::Gradient`] the values are the
/// distances themselves.
pub fn breakpoint_threshold(
    kind: BreakpointType,
    amount: f64,
    distances: &[f64],
) -> (f64, Vec<f64>) {
    match kind {
        BreakpointType::Percentile => (percentile(distances, amount), distances.to_vec()),
        BreakpointType::StandardDeviation => {
            let (mean, std) = mean_std(distances);
            (mean + amount * std, distances.to_vec())
        }
        BreakpointType::Interquartile => {
            let (mean, _) = mean_std(distances);
            let iqr = percentile(distances, 75.0) - percentile(distances, 25.0);
            (mean + amount * iqr, distances.to_vec())
        }
        BreakpointType::Gradient => {
            let grad = gradient(distances);
            (percentile(&grad, amount), grad)
        }
    }
}

/// Linear-interpolated percentile, `q` in `[0, 100]`. Returns 0.0 for no values.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Mean and population standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Numerical gradient with unit spacing: one-sided at the ends, central inside.
/// Fewer than two values are returned unchanged.
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}

/// Join sentences into chunks, closing a chunk after each breakpoint index.
///
/// With `min_chunk_size`, a breakpoint that would close a chunk shorter than
/// that many characters is ignored and the chunk keeps growing. The trailing
/// chunk is always emitted.
pub fn group_sentences(
    sentences: &[String],
    breakpoints: &[usize],
    min_chunk_size: Option<usize>,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    for &end in breakpoints {
        if end < start || end >= sentences.len() {
            continue;
        }
        let text = sentences[start..=end].join(" ");
        if let Some(min) = min_chunk_size {
            if text.chars().count() < min {
                continue;
            }
        }
        chunks.push(text);
        start = end + 1;
    }

    if start < sentences.len() {
        chunks.push(sentences[start..].join(" "));
    }
    chunks
}
