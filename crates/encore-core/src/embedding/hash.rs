use super::provider::EmbeddingProvider;
use crate::error::Result;

/// Local embedding provider for environments without an API key.
///
/// Feature-hashes whitespace tokens into a fixed 128-dimensional vector:
/// each lowercased token lands in the dimension picked by its FNV-1a hash,
/// with the hash's top bit choosing the sign. Prompts that share words share
/// dimensions, which is enough signal to exercise retrieval offline — it is
/// not a semantic model.
pub struct HashEmbeddingProvider;

const DIMENSIONS: usize = 128;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self
    }
}

impl HashEmbeddingProvider {
    pub fn new() -> Self {
        Self
    }

    fn token_hash(token: &str) -> u64 {
        let mut h = FNV_OFFSET;
        for byte in token.bytes() {
            h ^= u64::from(byte.to_ascii_lowercase());
            h = h.wrapping_mul(FNV_PRIME);
        }
        h
    }

    fn hash_text(text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; DIMENSIONS];
        for token in text.split_whitespace() {
            let h = Self::token_hash(token);
            let idx = (h % DIMENSIONS as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            vec[idx] += sign;
        }
        // L2-normalize; a token-free input stays the zero vector, which
        // retrieval treats as maximally distant
        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::hash_text(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::hash_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_id(&self) -> &str {
        "hash-128d"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::cosine_distance;

    #[tokio::test]
    async fn test_deterministic() {
        let provider = HashEmbeddingProvider::new();
        let a = provider.embed("open safari").await.unwrap();
        let b = provider.embed("open safari").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_case_insensitive_tokens() {
        let provider = HashEmbeddingProvider::new();
        let a = provider.embed("Open Safari").await.unwrap();
        let b = provider.embed("open safari").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dimensions_and_unit_norm() {
        let provider = HashEmbeddingProvider::new();
        let v = provider.embed("take a screenshot").await.unwrap();
        assert_eq!(v.len(), 128);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_shared_words_rank_closer() {
        let provider = HashEmbeddingProvider::new();
        let query = provider.embed("open a new safari tab").await.unwrap();
        let overlapping = provider.embed("open a safari window").await.unwrap();
        let unrelated = provider.embed("empty the trash").await.unwrap();
        assert!(cosine_distance(&query, &overlapping) < cosine_distance(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::new();
        let v = provider.embed("   ").await.unwrap();
        assert_eq!(v.len(), 128);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn test_batch_matches_single() {
        let provider = HashEmbeddingProvider::new();
        let batch = provider.embed_batch(&["open notes", "quit mail"]).await.unwrap();
        let single = provider.embed("open notes").await.unwrap();
        assert_eq!(batch[0], single);
        assert_ne!(batch[0], batch[1]);
    }
}
