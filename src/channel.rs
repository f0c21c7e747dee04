//! Per-bit channel priors.
//!
//! The channel is memoryless and binary: bit `j` flips independently
//! with probability `p[j]`. Probabilities sit strictly inside (0, 1);
//! either endpoint would turn the derived log-likelihood ratios or
//! probability ratios into infinities.

use ndarray::Array1;

use crate::error::{DecoderError, DecoderResult};

/// Per-bit a-priori error probabilities and their derived forms.
#[derive(Debug, Clone)]
pub struct ChannelModel {
    // prior probabilities of errors
    probs: Array1<f64>,
    // prior log-likelihood ratios, ln((1-p)/p)
    llrs: Array1<f64>,
    // prior probability ratios, p/(1-p)
    ratios: Array1<f64>,
}

impl ChannelModel {
    /// Uniform channel: every bit flips with probability `p`.
    pub fn uniform(p: f64, n: usize) -> DecoderResult<Self> {
        Self::per_bit(Array1::from_elem(n, p))
    }

    /// Per-bit channel. Every probability must lie strictly in (0, 1).
    pub fn per_bit(probs: Array1<f64>) -> DecoderResult<Self> {
        for &p in probs.iter() {
            if !(p > 0.0 && p < 1.0) {
                return Err(DecoderError::InvalidErrorRate(p));
            }
        }
        let llrs = probs.mapv(|p| ((1.0 - p) / p).ln());
        let ratios = probs.mapv(|p| p / (1.0 - p));
        Ok(ChannelModel {
            probs,
            llrs,
            ratios,
        })
    }

    /// Number of bits.
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// Raw per-bit flip probabilities.
    pub fn probs(&self) -> &Array1<f64> {
        &self.probs
    }

    /// Prior LLRs, positive when a bit is more likely 0.
    pub fn llrs(&self) -> &Array1<f64> {
        &self.llrs
    }

    /// Prior probability ratios p/(1-p).
    pub fn ratios(&self) -> &Array1<f64> {
        &self.ratios
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn uniform_fills_every_bit() {
        let ch = ChannelModel::uniform(0.1, 4).unwrap();
        assert_eq!(ch.len(), 4);
        for &p in ch.probs().iter() {
            assert_eq!(p, 0.1);
        }
        let l = (0.9f64 / 0.1).ln();
        for &v in ch.llrs().iter() {
            assert!((v - l).abs() < 1e-12);
        }
    }

    #[test]
    fn ratio_and_llr_agree() {
        let ch = ChannelModel::per_bit(array![0.05, 0.3, 0.9]).unwrap();
        for (&r, &l) in ch.ratios().iter().zip(ch.llrs().iter()) {
            // r = e^{-L}
            assert!((r - (-l).exp()).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(matches!(
            ChannelModel::uniform(0.0, 3),
            Err(DecoderError::InvalidErrorRate(_))
        ));
        assert!(matches!(
            ChannelModel::uniform(1.0, 3),
            Err(DecoderError::InvalidErrorRate(_))
        ));
        assert!(matches!(
            ChannelModel::per_bit(array![0.1, -0.2]),
            Err(DecoderError::InvalidErrorRate(_))
        ));
        assert!(matches!(
            ChannelModel::per_bit(array![0.1, f64::NAN]),
            Err(DecoderError::InvalidErrorRate(_))
        ));
    }
}
