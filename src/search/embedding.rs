//! Harmonic Token Projection (HTP) embedding.
//!
//! Each token is mapped to an integer, then projected onto the unit circle
//! once per coprime modulus (sin + cos), giving a 384-dimensional vector.
//! Token vectors are averaged and L2-normalized. No model file, fully
//! deterministic, so identical text always yields an identical vector.

use std::f64::consts::PI;

/// HTP embedding dimension
pub const EMBEDDING_DIM: usize = 384;
const NUM_MODULI: usize = EMBEDDING_DIM / 2;

/// Bump when tokenization or projection changes; stored in every snapshot.
pub const HTP_VERSION: &str = "htp-384-v1";

static COPRIME_MODULI: &[u64] = &[
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311, 313, 317, 331, 337, 347, 349, 353, 359, 367, 373, 379, 383, 389, 397, 401, 409, 419, 421,
    431, 433, 439, 443, 449, 457, 461, 463, 467, 479, 487, 491, 499, 503, 509, 521, 523, 541, 547,
    557, 563, 569, 571, 577, 587, 593, 599, 601, 607, 613, 617, 619, 631, 641, 643, 647, 653, 659,
    661, 673, 677, 683, 691, 701, 709, 719, 727, 733, 739, 743, 751, 757, 761, 769, 773, 787, 797,
    809, 811, 821, 823, 827, 829, 839, 853, 857, 859, 863, 877, 881, 883, 887, 907, 911, 919, 929,
    937, 941, 947, 953, 967, 971, 977, 983, 991, 997, 1009, 1013, 1019, 1021, 1031, 1033, 1039,
    1049, 1051, 1061, 1063, 1069, 1087, 1091, 1093, 1097, 1103, 1109, 1117, 1123, 1129, 1151, 1153,
    1163, 1171, 1181,
];

/// Embed text. Text without tokens yields the zero vector.
pub fn embed_text(text: &str) -> Vec<f32> {
    let tokens = tokenize(text);

    if tokens.is_empty() {
        return vec![0.0; EMBEDDING_DIM];
    }

    let mut sum = vec![0.0f64; EMBEDDING_DIM];
    for token in &tokens {
        for (i, val) in embed_token(token).into_iter().enumerate() {
            sum[i] += val;
        }
    }

    let count = tokens.len() as f64;
    for val in &mut sum {
        *val /= count;
    }

    let norm: f64 = sum.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        sum.iter().map(|x| (*x / norm) as f32).collect()
    } else {
        sum.iter().map(|x| *x as f32).collect()
    }
}

fn embed_token(token: &str) -> Vec<f64> {
    let n = token_to_integer(token);
    let mut embedding = Vec::with_capacity(EMBEDDING_DIM);

    for &m in COPRIME_MODULI.iter().take(NUM_MODULI) {
        let theta = 2.0 * PI * ((n % m) as f64) / (m as f64);
        embedding.push(theta.sin());
        embedding.push(theta.cos());
    }

    embedding
}

fn token_to_integer(token: &str) -> u64 {
    token
        .chars()
        .take(64)
        .fold(0u64, |n, c| n.wrapping_mul(65536).wrapping_add(c as u64))
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

/// Cosine similarity. Mismatched lengths or zero vectors give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a > 0.0 && norm_b > 0.0 {
        dot / (norm_a * norm_b)
    } else {
        0.0
    }
}

/// Dot product; equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scale to unit length. `None` for zero-norm or non-finite input.
pub fn normalize(v: &[f32]) -> Option<Vec<f32>> {
    if v.iter().any(|x| !x.is_finite()) {
        return None;
    }
    let norm = l2_norm(v);
    if norm > 0.0 && norm.is_finite() {
        Some(v.iter().map(|x| x / norm).collect())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_dimension_and_norm() {
        let emb = embed_text("Senior Rust engineer, Ha Noi");
        assert_eq!(emb.len(), EMBEDDING_DIM);
        assert!((l2_norm(&emb) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embed_deterministic() {
        assert_eq!(embed_text("python sql"), embed_text("python sql"));
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let emb = embed_text("  ,.; ");
        assert!(emb.iter().all(|x| *x == 0.0));
        assert!(normalize(&emb).is_none());
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let a = embed_text("Python, SQL!");
        let b = embed_text("python sql");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_shared_tokens_more_similar() {
        let query = embed_text("python backend developer");
        let close = embed_text("backend developer python django");
        let far = embed_text("accountant tax reports");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_normalize_rejects_non_finite() {
        assert!(normalize(&[1.0, f32::NAN]).is_none());
        let unit = normalize(&[3.0, 4.0]).unwrap();
        assert!((unit[0] - 0.6).abs() < 1e-6);
    }
}
