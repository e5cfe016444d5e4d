use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

/// Stable presentation order for a question's options.
///
/// The permutation depends only on the question's position, so re-rendering the
/// same question during one sitting always yields the same order.
pub(crate) fn presented_options(
    section_index: usize,
    question_index: usize,
    options: &[String],
) -> Vec<String> {
    let mut presented = options.to_vec();
    let mut rng = StdRng::seed_from_u64(position_seed(section_index, question_index));
    presented.shuffle(&mut rng);
    presented
}

fn position_seed(section_index: usize, question_index: usize) -> u64 {
    let digest = Sha256::digest(format!("{section_index}-{question_index}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
