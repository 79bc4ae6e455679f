use crate::rag::RagError;

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, RagError> {
    if query.len() != candidate.len() {
        return Err(RagError::DimensionMismatch {
            expected: candidate.len(),
            actual: query.len(),
        });
    }
    if query.is_empty() {
        return Ok(0.0);
    }

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

/// Scores every candidate and orders them by descending similarity.
/// Equal scores keep their original relative order.
pub fn rank_descending_by_cosine(
    query: &[f32],
    candidates: &[&[f32]],
) -> Result<Vec<(usize, f32)>, RagError> {
    let mut scores = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = cosine_similarity(query, candidate)?;
        scores.push((idx, if score.is_nan() { f32::MIN } else { score }));
    }

    // sort_by is stable
    scores.sort_by(|left, right| right.1.total_cmp(&left.1));
    Ok(scores)
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}
