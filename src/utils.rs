//! Utility functions for the lobby coordinator

use chrono::{DateTime, Utc};
use rand::Rng;
use uuid::Uuid;

/// Generate a new unique lobby session ID
pub fn generate_lobby_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Pick `amount` distinct indices in `0..length`, uniformly at random.
///
/// Returns fewer than `amount` indices when `length` is smaller.
pub fn sample_indices<R: Rng + ?Sized>(rng: &mut R, length: usize, amount: usize) -> Vec<usize> {
    let amount = amount.min(length);
    rand::seq::index::sample(rng, length, amount).into_vec()
}

/// Pick `amount` distinct items from `items`, uniformly at random without replacement
pub fn sample_distinct<R, T>(rng: &mut R, items: &[T], amount: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    T: Clone,
{
    sample_indices(rng, items.len(), amount)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_lobby_id();
        let id2 = generate_lobby_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_sample_distinct_has_no_duplicates() {
        let mut rng = StdRng::seed_from_u64(7);
        let items: Vec<u32> = (0..10).collect();

        for _ in 0..100 {
            let picked = sample_distinct(&mut rng, &items, 2);
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
        }
    }

    #[test]
    fn test_sample_more_than_available() {
        let mut rng = StdRng::seed_from_u64(1);
        let picked = sample_indices(&mut rng, 1, 2);
        assert_eq!(picked, vec![0]);

        let picked = sample_indices(&mut rng, 0, 2);
        assert!(picked.is_empty());
    }

    #[test]
    fn test_sample_covers_every_item() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = ["a", "b", "c", "d"];
        let mut seen = HashSet::new();

        for _ in 0..200 {
            for item in sample_distinct(&mut rng, &items, 2) {
                seen.insert(item);
            }
        }

        assert_eq!(seen.len(), items.len());
    }
}
