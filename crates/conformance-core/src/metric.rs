use std::cmp::Ordering;

use crate::schema::{MetricType, PrimaryKey};
use crate::service::SearchHit;

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

fn bits(v: &[f32]) -> impl Iterator<Item = bool> + '_ {
    v.iter().map(|x| *x >= 0.5)
}

/// Raw score of `candidate` against `query`; ordering direction depends on the metric.
pub fn score(metric: MetricType, query: &[f32], candidate: &[f32]) -> f32 {
    match metric {
        MetricType::L2 => query
            .iter()
            .zip(candidate.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum(),
        MetricType::IP => query.iter().zip(candidate.iter()).map(|(a, b)| a * b).sum(),
        MetricType::Cosine => cosine_similarity(query, candidate),
        MetricType::Hamming => bits(query)
            .zip(bits(candidate))
            .filter(|(a, b)| a != b)
            .count() as f32,
        MetricType::Jaccard => {
            let (mut inter, mut union) = (0usize, 0usize);
            for (a, b) in bits(query).zip(bits(candidate)) {
                inter += usize::from(a && b);
                union += usize::from(a || b);
            }
            if union == 0 {
                0.0
            } else {
                1.0 - inter as f32 / union as f32
            }
        }
    }
}

/// Brute-force top-`limit` ranking. Ties break on primary key for determinism.
pub fn rank<'a>(
    metric: MetricType,
    query: &[f32],
    candidates: impl IntoIterator<Item = (&'a PrimaryKey, &'a [f32])>,
    limit: usize,
) -> Vec<SearchHit> {
    let mut scored: Vec<SearchHit> = candidates
        .into_iter()
        .map(|(id, vector)| SearchHit {
            id: id.clone(),
            distance: score(metric, query, vector),
        })
        .collect();
    scored.sort_by(|a, b| {
        let ord = a
            .distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal);
        let ord = if metric.higher_is_better() {
            ord.reverse()
        } else {
            ord
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
    scored.truncate(limit);
    scored
}
