//! Decoder construction, input handling, and the public surface.
//!
//! A [`BpDecoder`] owns the parity-check matrix (message state lives on
//! its edges), the channel priors, and every working buffer. Buffers
//! are sized once at construction and overwritten at the start of each
//! decode, so repeated calls never allocate.
//!
//! Input convention: a decode input is either a syndrome (length m) or
//! a received word (length n). For received input the decoder forms the
//! internal syndrome H*y, estimates the error pattern e with H*e = H*y,
//! and returns e XOR y, which on convergence is a valid codeword. For
//! syndrome input the error estimate itself is returned.

use log::debug;
use ndarray::Array1;

use crate::channel::ChannelModel;
use crate::config::{BpMethod, DecoderOptions, InputType, Kernel, Schedule};
use crate::error::{DecoderError, DecoderResult};
use crate::sparse::SparseBitMatrix;

/// Belief-propagation decoder for binary LDPC codes.
pub struct BpDecoder {
    // number of checks (rows of H)
    pub(crate) m: usize,
    // number of bits (columns of H)
    pub(crate) n: usize,
    // parity-check matrix, with per-edge message slots
    pub(crate) h: SparseBitMatrix,
    // channel priors
    pub(crate) channel: ChannelModel,
    // configured method; MinSum is reported as configured but
    // dispatched through `kernel`
    pub(crate) bp_method: BpMethod,
    pub(crate) kernel: Kernel,
    pub(crate) schedule: Schedule,
    pub(crate) input_type: InputType,
    pub(crate) max_iter: usize,
    pub(crate) ms_scaling_factor: f64,
    // working syndrome buffer
    pub(crate) syndrome: Array1<u8>,
    // received codeword buffer, used for received-word input
    pub(crate) received: Array1<u8>,
    // current hard decision
    pub(crate) ehat: Array1<u8>,
    // H * ehat, recomputed each iteration for the convergence test
    pub(crate) ehat_syndrome: Array1<u8>,
    // posterior log-likelihood ratios
    pub(crate) llr: Array1<f64>,
    // 0/1 mask over checks; inactivated checks emit no messages
    pub(crate) inactivated: Array1<u8>,
    // iterations used by the last decode
    pub(crate) num_iters: usize,
    // whether the last decode satisfied the syndrome
    pub(crate) converged: bool,
}

impl BpDecoder {
    /// Build a decoder for the parity-check matrix `h`.
    ///
    /// All configuration errors fail here; a partially initialized
    /// decoder is never returned.
    pub fn new(h: SparseBitMatrix, opts: DecoderOptions) -> DecoderResult<Self> {
        let m = h.n_rows();
        let n = h.n_cols();

        if !(opts.ms_scaling_factor >= 0.0 && opts.ms_scaling_factor.is_finite()) {
            return Err(DecoderError::InvalidScalingFactor(opts.ms_scaling_factor));
        }

        let channel = match (opts.channel_probs, opts.error_rate) {
            (Some(probs), _) => {
                if probs.len() != n {
                    return Err(DecoderError::ChannelLengthMismatch {
                        expected: n,
                        actual: probs.len(),
                    });
                }
                ChannelModel::per_bit(Array1::from(probs))?
            }
            (None, Some(rate)) => ChannelModel::uniform(rate, n)?,
            (None, None) => return Err(DecoderError::MissingChannel),
        };

        let max_iter = if opts.max_iter == 0 { n } else { opts.max_iter };

        Ok(BpDecoder {
            m,
            n,
            h,
            channel,
            bp_method: opts.bp_method,
            kernel: opts.bp_method.kernel(),
            schedule: opts.schedule,
            input_type: opts.input_type,
            max_iter,
            ms_scaling_factor: opts.ms_scaling_factor,
            syndrome: Array1::zeros(m),
            received: Array1::zeros(n),
            ehat: Array1::zeros(n),
            ehat_syndrome: Array1::zeros(m),
            llr: Array1::zeros(n),
            inactivated: Array1::zeros(m),
            num_iters: 0,
            converged: false,
        })
    }

    /// Decode an input vector, interpreted according to the configured
    /// input type (or by length for `Auto`). Returns the length-n error
    /// estimate (syndrome input) or corrected word (received input).
    pub fn decode(&mut self, input: &[u8]) -> DecoderResult<Array1<u8>> {
        match self.classify_input(input.len())? {
            InputType::Received => {
                for (dst, &v) in self.received.iter_mut().zip(input) {
                    *dst = (v != 0) as u8;
                }
                self.h.mulvec(
                    self.received.as_slice().expect("contiguous buffer"),
                    self.syndrome.view_mut(),
                );
                self.run_bp();
                let fixed = Array1::from_iter(
                    self.ehat
                        .iter()
                        .zip(self.received.iter())
                        .map(|(&e, &y)| e ^ y),
                );
                Ok(fixed)
            }
            InputType::Syndrome => {
                for (dst, &v) in self.syndrome.iter_mut().zip(input) {
                    *dst = (v != 0) as u8;
                }
                self.run_bp();
                Ok(self.ehat.clone())
            }
            InputType::Auto => unreachable!("classify_input never returns Auto"),
        }
    }

    /// Resolve the input interpretation for a vector of length `len`.
    pub(crate) fn classify_input(&self, len: usize) -> DecoderResult<InputType> {
        let bad_length = DecoderError::InvalidInputLength {
            len,
            rows: self.m,
            cols: self.n,
        };
        match self.input_type {
            InputType::Syndrome if len == self.m => Ok(InputType::Syndrome),
            InputType::Received if len == self.n => Ok(InputType::Received),
            InputType::Syndrome | InputType::Received => Err(bad_length),
            InputType::Auto => {
                if self.m == self.n {
                    Err(DecoderError::AmbiguousInput)
                } else if len == self.n {
                    Ok(InputType::Received)
                } else if len == self.m {
                    Ok(InputType::Syndrome)
                } else {
                    Err(bad_length)
                }
            }
        }
    }

    /// Replace the per-bit channel priors.
    pub fn update_channel_probs(&mut self, probs: &[f64]) -> DecoderResult<()> {
        if probs.len() != self.n {
            return Err(DecoderError::ChannelLengthMismatch {
                expected: self.n,
                actual: probs.len(),
            });
        }
        self.channel = ChannelModel::per_bit(Array1::from(probs.to_vec()))?;
        Ok(())
    }

    /// Mark the given checks as inactivated; they emit no messages and
    /// are exempt from the convergence test until reset.
    pub fn set_inactivated_checks(&mut self, checks: &[usize]) -> DecoderResult<()> {
        for &i in checks {
            if i >= self.m {
                return Err(DecoderError::InvalidMatrix {
                    reason: format!("check index {i} out of range for {} checks", self.m),
                });
            }
        }
        self.inactivated.fill(0);
        for &i in checks {
            self.inactivated[i] = 1;
        }
        debug!("inactivated {} checks", checks.len());
        Ok(())
    }

    /// Re-activate every check.
    pub fn reset_inactivated_checks(&mut self) {
        self.inactivated.fill(0);
    }

    /// Iterations used by the last decode (1-based count of the
    /// converging iteration, or `max_iter` on exhaustion).
    pub fn num_iters(&self) -> usize {
        self.num_iters
    }

    /// Whether the last decode satisfied the (active-check) syndrome.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Hard-decision error estimate from the last decode.
    pub fn ehat(&self) -> &Array1<u8> {
        &self.ehat
    }

    /// Posterior log-likelihood ratios from the last decode; positive
    /// favors 0.
    pub fn llr(&self) -> &Array1<f64> {
        &self.llr
    }

    /// Per-bit channel priors.
    pub fn channel_probs(&self) -> &Array1<f64> {
        self.channel.probs()
    }

    /// Configured update method. `MinSum` reports as configured even
    /// though it dispatches to the log-domain min-sum kernel.
    pub fn bp_method(&self) -> BpMethod {
        self.bp_method
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn ms_scaling_factor(&self) -> f64 {
        self.ms_scaling_factor
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Currently inactivated check indices, in ascending order.
    pub fn inactivated_checks(&self) -> Vec<usize> {
        self.inactivated
            .iter()
            .enumerate()
            .filter_map(|(i, &v)| (v != 0).then_some(i))
            .collect()
    }

    /// Number of checks (rows of H).
    pub fn num_checks(&self) -> usize {
        self.m
    }

    /// Number of bits (columns of H).
    pub fn num_bits(&self) -> usize {
        self.n
    }

    /// The parity-check matrix.
    pub fn parity_check_matrix(&self) -> &SparseBitMatrix {
        &self.h
    }
}
