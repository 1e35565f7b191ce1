//! Deterministic test data.

use std::ops::Range;

use conformance_core::Row;
use serde_json::json;

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A vector with components in `[0, 1)`, fixed for a given `(seed, index)`.
pub fn gen_vector(dim: usize, seed: u64, index: u64) -> Vec<f32> {
    let mut state = seed ^ index.wrapping_mul(0xA076_1D64_78BD_642F);
    (0..dim)
        .map(|_| (splitmix64(&mut state) >> 40) as f32 / (1u64 << 24) as f32)
        .collect()
}

pub fn gen_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    (0..count as u64).map(|i| gen_vector(dim, seed, i)).collect()
}

/// Rows for the quick-setup schema with sequential integer keys.
///
/// Each row carries `id`, `vector` and two dynamic fields, `float` and `varchar`.
pub fn gen_rows(ids: Range<i64>, dim: usize, seed: u64) -> Vec<Row> {
    ids.map(|id| {
        let mut row = gen_row_without_pk(id, dim, seed);
        row.insert("id".to_string(), json!(id));
        row
    })
    .collect()
}

/// Rows for auto-id collections: the primary key is left to the service.
pub fn gen_auto_id_rows(count: usize, dim: usize, seed: u64) -> Vec<Row> {
    (0..count as i64)
        .map(|i| gen_row_without_pk(i, dim, seed))
        .collect()
}

fn gen_row_without_pk(i: i64, dim: usize, seed: u64) -> Row {
    let mut row = Row::new();
    row.insert("vector".to_string(), json!(gen_vector(dim, seed, i as u64)));
    row.insert("float".to_string(), json!(i as f64));
    row.insert("varchar".to_string(), json!(i.to_string()));
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_are_deterministic() {
        assert_eq!(gen_vectors(3, 8, 42), gen_vectors(3, 8, 42));
        assert_ne!(gen_vector(8, 42, 0), gen_vector(8, 42, 1));
        assert!(gen_vector(64, 7, 3).iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn rows_carry_sequential_ids() {
        let rows = gen_rows(10..13, 4, 1);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(rows[0]["vector"].as_array().unwrap().len(), 4);
        assert!(gen_auto_id_rows(2, 4, 1).iter().all(|r| !r.contains_key("id")));
    }
}
