use crate::config::Config;
use crate::core::error::AttendanceError;

/// Descriptor length for the combined check-in flow.
pub const CHECK_IN_DESCRIPTOR_LEN: usize = 512;
/// Descriptor length for the standalone verify flow. The two contracts are
/// not interchangeable.
pub const VERIFY_DESCRIPTOR_LEN: usize = 128;

/// Cosine similarity of two equal-length vectors, in [-1, 1].
/// Returns None when the norm product is zero, which covers all-zero
/// vectors and values so small their squares underflow to 0.0. Dividing
/// anyway would yield NaN or infinity, and an infinite similarity clears
/// any threshold.
fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return None;
    }
    Some(dot / denom)
}

#[derive(Debug, Clone, Copy)]
pub struct FaceMatch {
    pub similarity: f64,
    pub threshold: f64,
    pub matched: bool,
}

/// Compares a submitted descriptor against a registered one. The expected
/// dimension is part of the contract; both sides must honor it.
#[derive(Debug, Clone, Copy)]
pub struct FaceMatcher {
    dimension: usize,
    threshold: f64,
}

impl FaceMatcher {
    pub fn new(dimension: usize, threshold: f64) -> Self {
        Self {
            dimension,
            threshold,
        }
    }

    pub fn for_check_in(config: &Config) -> Self {
        Self::new(CHECK_IN_DESCRIPTOR_LEN, config.face_match_threshold)
    }

    pub fn for_verify(config: &Config) -> Self {
        Self::new(VERIFY_DESCRIPTOR_LEN, config.face_match_threshold)
    }

    fn validate(&self, descriptor: &[f64], side: &str) -> Result<(), AttendanceError> {
        if descriptor.len() != self.dimension {
            return Err(AttendanceError::Validation(format!(
                "{side} descriptor must have {} values, got {}",
                self.dimension,
                descriptor.len()
            )));
        }
        if descriptor.iter().any(|v| !v.is_finite()) {
            return Err(AttendanceError::Validation(format!(
                "{side} descriptor contains non-finite values"
            )));
        }
        Ok(())
    }

    /// `matched` uses strict inequality: similarity must exceed the threshold.
    pub fn compare(&self, submitted: &[f64], registered: &[f64]) -> Result<FaceMatch, AttendanceError> {
        self.validate(submitted, "submitted")?;
        self.validate(registered, "registered")?;

        let similarity = cosine_similarity(submitted, registered).ok_or_else(|| {
            AttendanceError::Validation("descriptor has zero magnitude".to_string())
        })?;
        Ok(FaceMatch {
            similarity,
            threshold: self.threshold,
            matched: similarity > self.threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(dim: usize) -> FaceMatcher {
        FaceMatcher::new(dim, 0.6)
    }

    #[test]
    fn self_similarity_is_one() {
        let v: Vec<f64> = (0..128).map(|i| (i as f64) * 0.01 + 0.1).collect();
        let m = matcher(128).compare(&v, &v).unwrap();
        assert!((m.similarity - 1.0).abs() < 1e-9);
        assert!(m.matched);
    }

    #[test]
    fn similarity_is_symmetric() {
        let a: Vec<f64> = (0..128).map(|i| (i as f64).sin()).collect();
        let b: Vec<f64> = (0..128).map(|i| (i as f64).cos()).collect();
        let ab = matcher(128).compare(&a, &b).unwrap().similarity;
        let ba = matcher(128).compare(&b, &a).unwrap().similarity;
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn orthogonal_vectors_do_not_match() {
        let mut a = vec![0.0; 128];
        let mut b = vec![0.0; 128];
        a[0] = 1.0;
        b[1] = 1.0;
        let m = matcher(128).compare(&a, &b).unwrap();
        assert!(m.similarity.abs() < 1e-12);
        assert!(!m.matched);
    }

    #[test]
    fn zero_magnitude_vector_is_rejected() {
        let a = vec![0.0; 128];
        let b = vec![1.0; 128];
        assert!(matches!(
            matcher(128).compare(&a, &b),
            Err(AttendanceError::Validation(_))
        ));
        assert!(matches!(
            matcher(128).compare(&b, &a),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[test]
    fn underflowing_magnitude_is_rejected_not_matched() {
        // Every element is finite and non-zero, yet each square underflows
        // to 0.0. The norm product is zero and dividing would produce an
        // infinite similarity that clears any threshold.
        let tiny = vec![1e-200; 128];
        let real = vec![1.0; 128];
        assert!(matches!(
            matcher(128).compare(&tiny, &real),
            Err(AttendanceError::Validation(_))
        ));
        assert!(matches!(
            matcher(128).compare(&real, &tiny),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[test]
    fn similarity_is_always_finite() {
        let a: Vec<f64> = (0..128).map(|i| (i as f64) * 1e-160 + 1e-162).collect();
        let b = vec![1e-161; 128];
        match matcher(128).compare(&a, &b) {
            Ok(m) => assert!(m.similarity.is_finite()),
            Err(AttendanceError::Validation(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let a = vec![1.0; 512];
        let b = vec![1.0; 128];
        assert!(matches!(
            matcher(512).compare(&a, &b),
            Err(AttendanceError::Validation(_))
        ));
    }

    #[test]
    fn threshold_is_strict() {
        // Build vectors with an exactly-known cosine: [1,0] vs [0.6, 0.8]
        // padded with zeros would be zero-magnitude safe but cosine = 0.6.
        let mut a = vec![0.0; 128];
        let mut b = vec![0.0; 128];
        a[0] = 1.0;
        b[0] = 0.6;
        b[1] = 0.8;
        let m = matcher(128).compare(&a, &b).unwrap();
        assert!((m.similarity - 0.6).abs() < 1e-12);
        assert!(!m.matched, "similarity equal to threshold must not match");
    }
}
