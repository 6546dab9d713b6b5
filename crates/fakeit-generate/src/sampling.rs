use rand::{Rng, RngCore};
use serde_json::Value;

use fakeit_model::SamplePolicy;

/// Seed of a model phase, derived from the run seed unless overridden.
pub fn model_seed(run_seed: u64, model: &str, overridden: Option<u64>) -> u64 {
    overridden.unwrap_or_else(|| hash_seed(run_seed, model))
}

/// Seed of one document; depends only on the model seed and the index.
pub fn document_seed(model_seed: u64, index: u64) -> u64 {
    let mut hash = model_seed ^ index.wrapping_mul(0x9e3779b97f4a7c15);
    hash = hash.wrapping_mul(0x100000001b3);
    hash ^ (hash >> 29)
}

pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Reduce or repeat input rows to the size `policy` assigns to `sample`.
///
/// Subsets are drawn without replacement and keep source order. When the
/// requested size exceeds the source every row is kept once and the
/// remainder is drawn with replacement.
pub fn sample_rows(
    rows: Vec<Value>,
    sample: Option<f64>,
    policy: &SamplePolicy,
    rng: &mut dyn RngCore,
) -> Vec<Value> {
    let available = rows.len();
    let wanted = policy.input_count(sample, available);
    if wanted == available {
        return rows;
    }
    if wanted < available {
        return pick(&rows, wanted, rng).into_iter().cloned().collect();
    }

    let mut out = Vec::with_capacity(wanted);
    out.extend(rows.iter().cloned());
    while out.len() < wanted {
        let idx = rng.random_range(0..available);
        out.push(rows[idx].clone());
    }
    out
}

/// Draw `count` distinct documents from `documents`, keeping store order.
pub fn pick<'a>(documents: &'a [Value], count: usize, rng: &mut dyn RngCore) -> Vec<&'a Value> {
    if count >= documents.len() {
        return documents.iter().collect();
    }
    let mut indices = rand::seq::index::sample(rng, documents.len(), count).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|idx| &documents[idx]).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    use fakeit_model::{InputOverflow, MAX_SAMPLE};

    use super::*;

    fn rows(count: usize) -> Vec<Value> {
        (0..count).map(|idx| json!({"id": idx})).collect()
    }

    #[test]
    fn sampled_rows_are_distinct_members_of_source() {
        let source = rows(100);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let sampled = sample_rows(source.clone(), Some(10.0), &SamplePolicy::default(), &mut rng);
        assert_eq!(sampled.len(), 10);
        let ids: HashSet<i64> = sampled
            .iter()
            .map(|row| row["id"].as_i64().expect("id"))
            .collect();
        assert_eq!(ids.len(), 10);
        assert!(sampled.iter().all(|row| source.contains(row)));
    }

    #[test]
    fn overflow_clamps_or_cycles() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let clamped = sample_rows(rows(3), Some(8.0), &SamplePolicy::default(), &mut rng);
        assert_eq!(clamped, rows(3));

        let policy = SamplePolicy {
            input_overflow: InputOverflow::Cycle,
            ..SamplePolicy::default()
        };
        let cycled = sample_rows(rows(3), Some(8.0), &policy, &mut rng);
        assert_eq!(cycled.len(), 8);
        assert_eq!(&cycled[..3], rows(3).as_slice());
    }

    #[test]
    fn huge_cycled_sample_is_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let policy = SamplePolicy {
            input_overflow: InputOverflow::Cycle,
            ..SamplePolicy::default()
        };
        let cycled = sample_rows(vec![json!(1)], Some(1e19), &policy, &mut rng);
        assert_eq!(cycled.len(), MAX_SAMPLE as usize);
    }

    #[test]
    fn pick_keeps_store_order() {
        let docs = rows(5);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let picked = pick(&docs, 2, &mut rng);
        assert_eq!(picked.len(), 2);
        let ids: Vec<i64> = picked.iter().map(|doc| doc["id"].as_i64().expect("id")).collect();
        assert!(ids[0] < ids[1]);
        assert_eq!(pick(&docs, 9, &mut rng).len(), 5);
    }

    #[test]
    fn document_seeds_differ_by_index_and_model() {
        let a = model_seed(42, "a", None);
        assert_eq!(a, model_seed(42, "a", None));
        assert_ne!(a, model_seed(42, "b", None));
        assert_eq!(model_seed(42, "a", Some(7)), 7);
        assert_ne!(document_seed(a, 0), document_seed(a, 1));
    }
}
