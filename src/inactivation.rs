//! Check-inactivation post-processing.
//!
//! When plain BP stalls, the usual culprit is a small cluster of
//! unsatisfied checks whose bits keep exchanging contradictory
//! messages. The post-processor picks the check whose neighborhood
//! carries the least posterior confidence, disables that check together
//! with every check touching its bits, and re-runs BP on the remaining
//! graph. The disabled bits receive no messages and decode to zero, so
//! a converged run fixes every active check; the inactivated ring is
//! then repaired exactly by solving a cluster-sized linear system over
//! GF(2) for the disabled bits.

use log::debug;
use ndarray::{Array1, Array2};

use crate::config::InputType;
use crate::decoder::BpDecoder;
use crate::error::{DecoderError, DecoderResult};
use crate::gf2;

impl BpDecoder {
    /// Decode a syndrome with inactivation fallback.
    ///
    /// Runs plain BP first and returns its output untouched when it
    /// converges. Otherwise candidate checks are tried in ascending
    /// order of reliability until one cluster yields a consistent
    /// completion; the winning mask is left observable through
    /// [`inactivated_checks`](BpDecoder::inactivated_checks).
    pub fn si_decode(&mut self, input: &[u8]) -> DecoderResult<Array1<u8>> {
        if self.input_type == InputType::Received {
            return Err(DecoderError::InvalidInputType(
                "received input; inactivation decoding takes a syndrome".to_string(),
            ));
        }
        if input.len() != self.m {
            return Err(DecoderError::InvalidInputLength {
                len: input.len(),
                rows: self.m,
                cols: self.n,
            });
        }

        self.reset_inactivated_checks();
        for (dst, &v) in self.syndrome.iter_mut().zip(input) {
            *dst = (v != 0) as u8;
        }
        self.run_bp();
        if self.converged {
            return Ok(self.ehat.clone());
        }

        let original = self.syndrome.clone();
        let order = self.checks_by_reliability();

        for &c in &order {
            let (bits, checks) = self.cluster_around(c);
            for &i in &checks {
                self.inactivated[i] = 1;
                self.syndrome[i] = 0;
            }
            debug!(
                "inactivating {} checks / {} bits around check {c}",
                checks.len(),
                bits.len()
            );
            self.run_bp();
            self.syndrome.assign(&original);
            if !self.converged {
                self.reset_inactivated_checks();
                continue;
            }

            match self.solve_cluster(&bits, &checks, &original) {
                Some(x) => {
                    for (bi, &j) in bits.iter().enumerate() {
                        self.ehat[j] = x[bi];
                    }
                    debug!("inactivation around check {c} succeeded");
                    return Ok(self.ehat.clone());
                }
                None => {
                    // the masked run converged but the cluster system
                    // has no solution for this candidate
                    self.converged = false;
                    self.reset_inactivated_checks();
                }
            }
        }

        debug!("no inactivation candidate succeeded");
        Ok(self.ehat.clone())
    }

    /// Checks ordered by ascending reliability, where a check's
    /// reliability is the summed posterior magnitude over its bits.
    fn checks_by_reliability(&self) -> Vec<usize> {
        let reliability: Vec<f64> = (0..self.m)
            .map(|i| {
                let mut sum = 0.0;
                let mut e = self.h.first_in_row(i);
                while !self.h.is_sentinel(e) {
                    sum += self.llr[self.h.entry(e).col].abs();
                    e = self.h.next_in_row(e);
                }
                sum
            })
            .collect();
        let mut order: Vec<usize> = (0..self.m).collect();
        order.sort_by(|&a, &b| reliability[a].total_cmp(&reliability[b]));
        order
    }

    /// The cluster around candidate check `c`: its bits B, and every
    /// check touching a bit of B (candidate first). Both lists keep
    /// first-visit order so the residual system's row and column
    /// mapping is deterministic.
    fn cluster_around(&self, c: usize) -> (Vec<usize>, Vec<usize>) {
        let mut bits = Vec::new();
        let mut e = self.h.first_in_row(c);
        while !self.h.is_sentinel(e) {
            bits.push(self.h.entry(e).col);
            e = self.h.next_in_row(e);
        }

        let mut check_seen = vec![false; self.m];
        let mut checks = vec![c];
        check_seen[c] = true;
        for &j in &bits {
            let mut e = self.h.first_in_col(j);
            while !self.h.is_sentinel(e) {
                let i = self.h.entry(e).row;
                if !check_seen[i] {
                    check_seen[i] = true;
                    checks.push(i);
                }
                e = self.h.next_in_col(e);
            }
        }
        (bits, checks)
    }

    /// Build and solve the residual system for an inactivated cluster:
    /// S restricted to (checks x bits), right-hand side the original
    /// syndrome corrected by each check's glue parity (the XOR of the
    /// decoded bits outside B on that row).
    fn solve_cluster(
        &self,
        bits: &[usize],
        checks: &[usize],
        original: &Array1<u8>,
    ) -> Option<Array1<u8>> {
        let mut bit_pos = vec![usize::MAX; self.n];
        for (bi, &j) in bits.iter().enumerate() {
            bit_pos[j] = bi;
        }

        let mut s_mat = Array2::<u8>::zeros((checks.len(), bits.len()));
        let mut rhs = Array1::<u8>::zeros(checks.len());
        for (ci, &i) in checks.iter().enumerate() {
            let mut glue = 0u8;
            let mut e = self.h.first_in_row(i);
            while !self.h.is_sentinel(e) {
                let col = self.h.entry(e).col;
                if bit_pos[col] != usize::MAX {
                    s_mat[(ci, bit_pos[col])] = 1;
                } else {
                    glue ^= self.ehat[col];
                }
                e = self.h.next_in_row(e);
            }
            rhs[ci] = original[i] ^ glue;
        }

        gf2::solve(s_mat.view(), rhs.view())
    }
}
