use rand::seq::SliceRandom;
use rand::Rng;

/// Random permutation of `[0, total_questions)`
pub fn generate_question_order(total_questions: usize) -> Vec<usize> {
    generate_question_order_with(total_questions, &mut rand::thread_rng())
}

/// Same as [`generate_question_order`] with a caller-supplied RNG
pub fn generate_question_order_with<R: Rng + ?Sized>(
    total_questions: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..total_questions).collect();
    order.shuffle(rng);
    order
}

/// Whether `order` contains every index in `[0, total_questions)` exactly once
pub fn is_permutation(order: &[usize], total_questions: usize) -> bool {
    if order.len() != total_questions {
        return false;
    }
    let mut seen = vec![false; total_questions];
    for &index in order {
        if index >= total_questions || seen[index] {
            return false;
        }
        seen[index] = true;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_size_yields_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 0..50 {
            let order = generate_question_order_with(n, &mut rng);
            assert!(is_permutation(&order, n), "not a permutation for n={n}: {order:?}");
        }
    }

    #[test]
    fn thread_rng_variant_is_a_permutation() {
        let order = generate_question_order(12);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_duplicates_and_out_of_range() {
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(is_permutation(&[2, 0, 1], 3));
    }
}
