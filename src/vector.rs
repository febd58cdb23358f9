//! This is the vector math module
//! Provide L2 normalization, dot product, euclidean distance and the
//! score normalization used by Atlas vector search

use clap::ValueEnum;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    #[error("Cannot normalize an empty vector")]
    Empty,

    #[error("Cannot normalize a zero vector")]
    Zero,

    #[error("Different dimensions: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// Zero vector cannot be normalized
pub fn l2_norm(vector: &[f32]) -> Result<Vec<f32>, VectorError> {
    if vector.is_empty() {
        return Err(VectorError::Empty);
    }

    let norm = vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if norm == 0.0 {
        return Err(VectorError::Zero);
    }

    Ok(vector.iter().map(|x| x / norm).collect())
}

/// Dot Product
/// dot_prod = sum(a[i] * b[i]) for i = 0..a.len()
/// Can only process vectors with same dimensions
pub fn dot_product(left: &[f32], right: &[f32]) -> Result<f32, VectorError> {
    check_dimensions(left, right)?;

    Ok(left.iter()
        .zip(right.iter())
        .map(|(x, y)| x * y)
        .sum())
}

/// Euclidean distance
/// dist = sqrt(sum((a[i] - b[i])^2))
pub fn euclidean_distance(left: &[f32], right: &[f32]) -> Result<f32, VectorError> {
    check_dimensions(left, right)?;

    Ok(left.iter()
        .zip(right.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt())
}

fn check_dimensions(left: &[f32], right: &[f32]) -> Result<(), VectorError> {
    if left.len() != right.len() {
        return Err(VectorError::DimensionMismatch { left: left.len(), right: right.len() });
    }
    Ok(())
}

/// Similarity function of a vector index.
///
/// Scores are normalized the way Atlas reports `vectorSearchScore`, so a
/// snapshot search ranks and scores records the same way the managed
/// index does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Similarity {
    #[default]
    Cosine,
    DotProduct,
    Euclidean,
}

impl Similarity {
    /// Score `candidate` against `query`. Higher is more similar, range [0, 1]
    /// for cosine and euclidean; dot product is only bounded for unit vectors.
    pub fn score(&self, query: &[f32], candidate: &[f32]) -> Result<f64, VectorError> {
        let score = match self {
            Similarity::Cosine => {
                let cos = dot_product(&l2_norm(query)?, &l2_norm(candidate)?)?;
                (1.0 + f64::from(cos)) / 2.0
            }
            Similarity::DotProduct => (1.0 + f64::from(dot_product(query, candidate)?)) / 2.0,
            Similarity::Euclidean => 1.0 / (1.0 + f64::from(euclidean_distance(query, candidate)?)),
        };
        Ok(score)
    }
}
