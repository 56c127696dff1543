//! Synthetic documents with placeholder random embeddings.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::NewDocument;

/// Topic labels used to build document titles.
pub const TOPICS: [&str; 5] = [
    "Artificial Intelligence",
    "Databases",
    "Docker",
    "Python",
    "Cloud",
];

/// Build the RNG used for generation. A fixed seed makes the output
/// reproducible; `None` seeds from OS entropy.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// A vector of `dimensions` independent uniform samples in `[0, 1)`.
pub fn random_vector<R: Rng + ?Sized>(dimensions: usize, rng: &mut R) -> Vec<f32> {
    (0..dimensions).map(|_| rng.gen::<f32>()).collect()
}

/// Generate exactly `count` documents whose embeddings have `dimensions`
/// components. Articles are numbered from 1.
pub fn generate_documents<R: Rng + ?Sized>(
    count: usize,
    dimensions: usize,
    rng: &mut R,
) -> Vec<NewDocument> {
    tracing::debug!(count, dimensions, "generating synthetic documents");
    (1..=count)
        .map(|i| {
            let topic = TOPICS[rng.gen_range(0..TOPICS.len())];
            NewDocument {
                title: format!("{topic} - Article {i}"),
                content: format!("This is test content generated automatically for ID {i}."),
                embedding: random_vector(dimensions, rng),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_exact_count_and_dimensions() {
        let mut rng = rng_from_seed(Some(7));
        for count in [0, 1, 20, 57] {
            let docs = generate_documents(count, 3, &mut rng);
            assert_eq!(docs.len(), count);
            for doc in &docs {
                assert_eq!(doc.embedding.len(), 3);
                assert!(doc.embedding.iter().all(|v| (0.0..1.0).contains(v)));
            }
        }
    }

    #[test]
    fn titles_and_content_follow_the_index() {
        let mut rng = rng_from_seed(Some(1));
        let docs = generate_documents(5, 4, &mut rng);
        for (i, doc) in docs.iter().enumerate() {
            let n = i + 1;
            let (topic, suffix) = doc.title.split_once(" - ").unwrap();
            assert!(TOPICS.contains(&topic), "unexpected topic {topic}");
            assert_eq!(suffix, format!("Article {n}"));
            assert_eq!(
                doc.content,
                format!("This is test content generated automatically for ID {n}.")
            );
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        let a = generate_documents(10, 8, &mut rng_from_seed(Some(42)));
        let b = generate_documents(10, 8, &mut rng_from_seed(Some(42)));
        assert_eq!(a, b);

        let c = generate_documents(10, 8, &mut rng_from_seed(Some(43)));
        assert_ne!(a, c);
    }

    #[test]
    fn zero_dimensions_gives_empty_embeddings() {
        let docs = generate_documents(2, 0, &mut rng_from_seed(Some(3)));
        assert!(docs.iter().all(|d| d.embedding.is_empty()));
    }

    #[test]
    fn random_vector_in_unit_interval() {
        let mut rng = rng_from_seed(None);
        let v = random_vector(1000, &mut rng);
        assert_eq!(v.len(), 1000);
        assert!(v.iter().all(|x| *x >= 0.0 && *x < 1.0));
    }
}
