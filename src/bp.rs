//! Message-passing kernels and schedules.
//!
//! Every kernel follows the same two-phase shape per iteration: (a)
//! check-to-bit messages are computed from the current bit-to-check
//! messages, (b) bit-to-check messages and per-bit posteriors are
//! updated, producing a tentative hard decision that is tested against
//! the syndrome.
//!
//! The exclude-self combination in both phases is a two-pass sweep over
//! each row (or column) ring: the forward pass stores the running
//! prefix combination into each edge's slot, the backward pass folds in
//! the suffix, leaving each edge with the combination of every other
//! edge. The partial accumulators are written into the same per-edge
//! slot the opposite pass reads, which is why messages live on the
//! matrix entries.
//!
//! Kernels:
//! - product-sum in probability-ratio form, where a bit-to-check
//!   message is the ratio p/(1-p) and the check combination is the
//!   product of (1-r)/(1+r) terms;
//! - product-sum in the log domain, tanh/atanh form;
//! - normalized min-sum in the log domain: sign parity times minimum
//!   magnitude, scaled by alpha. alpha = 0 at configuration selects the
//!   per-iteration factor 1 - 2^(-t).
//!
//! The serial schedule updates bits one at a time in ascending index
//! order; a bit's fresh column messages are visible to every later bit
//! in the same iteration.

use log::{debug, trace};

use crate::config::{Kernel, Schedule};
use crate::decoder::BpDecoder;

// finite stand-in for +inf, keeps the (-1)^sgn * alpha * min product
// well-defined
const MIN_SEED: f64 = 1e308;

impl BpDecoder {
    /// Run BP on the current syndrome/channel/mask state, filling
    /// `ehat`, `llr`, `num_iters`, and `converged`.
    pub(crate) fn run_bp(&mut self) {
        self.initialize_messages();
        self.converged = false;
        self.num_iters = self.max_iter;

        for t in 1..=self.max_iter {
            let alpha = self.effective_alpha(t);
            match self.schedule {
                Schedule::Parallel => {
                    match self.kernel {
                        Kernel::ProdSum => self.check_update_ratio(),
                        Kernel::ProdSumLog => self.check_update_log(),
                        Kernel::MinSumLog => self.check_update_min_sum(alpha),
                    }
                    match self.kernel {
                        Kernel::ProdSum => self.bit_update_ratio(),
                        Kernel::ProdSumLog | Kernel::MinSumLog => self.bit_update_log(),
                    }
                }
                Schedule::Serial => self.serial_sweep(alpha),
            }
            if self.syndrome_satisfied() {
                self.converged = true;
                self.num_iters = t;
                break;
            }
            trace!("iteration {t}: syndrome not yet satisfied");
        }
        debug!(
            "bp finished: converged={} after {} iterations",
            self.converged, self.num_iters
        );
    }

    /// Normalization factor for iteration `t` (1-based). A configured
    /// factor of 0 selects the adaptive 1 - 2^(-t), which increases
    /// toward 1 as iterations accumulate.
    fn effective_alpha(&self, t: usize) -> f64 {
        if self.ms_scaling_factor == 0.0 {
            1.0 - 0.5f64.powi(t as i32)
        } else {
            self.ms_scaling_factor
        }
    }

    /// Seed every bit-to-check message from the channel prior. The
    /// ratio kernel works in p/(1-p) form; everything else (including
    /// the serial schedule for all methods) works in LLRs.
    fn initialize_messages(&mut self) {
        let ratio_form = self.schedule == Schedule::Parallel && self.kernel == Kernel::ProdSum;
        for j in 0..self.n {
            let seed = if ratio_form {
                self.channel.ratios()[j]
            } else {
                self.channel.llrs()[j]
            };
            let mut e = self.h.first_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk = seed;
                ent.chk_to_var = 0.0;
                ent.sgn = 0;
                e = self.h.next_in_col(e);
            }
        }
    }

    // -- parallel check phase ------------------------------------------------

    /// Product-sum check update in probability-ratio form.
    fn check_update_ratio(&mut self) {
        for i in 0..self.m {
            if self.inactivated[i] != 0 {
                self.neutralize_row(i, 1.0);
                continue;
            }
            // forward: edge k receives the signed product of edges 0..k
            let mut t = if self.syndrome[i] != 0 { -1.0 } else { 1.0 };
            let mut e = self.h.first_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var = t;
                // 2/(1+r) - 1 = (1-r)/(1+r) = tanh(L/2) for r = e^{-L}
                t *= 2.0 / (1.0 + ent.var_to_chk) - 1.0;
                e = self.h.next_in_row(e);
            }
            // backward: fold in the suffix, then map back to ratio form
            let mut t = 1.0;
            let mut e = self.h.last_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var *= t;
                ent.chk_to_var = (1.0 - ent.chk_to_var) / (1.0 + ent.chk_to_var);
                t *= 2.0 / (1.0 + ent.var_to_chk) - 1.0;
                e = self.h.prev_in_row(e);
            }
        }
    }

    /// Product-sum check update in the log domain.
    fn check_update_log(&mut self) {
        for i in 0..self.m {
            if self.inactivated[i] != 0 {
                self.neutralize_row(i, 0.0);
                continue;
            }
            let syndrome_sgn = if self.syndrome[i] != 0 { -1.0 } else { 1.0 };
            let mut t = 1.0;
            let mut e = self.h.first_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var = t;
                t *= (ent.var_to_chk / 2.0).tanh();
                e = self.h.next_in_row(e);
            }
            let mut t = 1.0;
            let mut e = self.h.last_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var *= t;
                // log((1+x)/(1-x)) = 2 atanh(x)
                ent.chk_to_var =
                    syndrome_sgn * ((1.0 + ent.chk_to_var) / (1.0 - ent.chk_to_var)).ln();
                t *= (ent.var_to_chk / 2.0).tanh();
                e = self.h.prev_in_row(e);
            }
        }
    }

    /// Normalized min-sum check update: minimum magnitude with sign
    /// parity, accumulated in the same two-pass shape. The sign slot
    /// counts non-positive messages; the syndrome bit seeds the parity.
    fn check_update_min_sum(&mut self, alpha: f64) {
        for i in 0..self.m {
            if self.inactivated[i] != 0 {
                self.neutralize_row(i, 0.0);
                continue;
            }
            let mut min_run = MIN_SEED;
            let mut sgn_run = u32::from(self.syndrome[i]);
            let mut e = self.h.first_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var = min_run;
                ent.sgn = sgn_run;
                if ent.var_to_chk.abs() < min_run {
                    min_run = ent.var_to_chk.abs();
                }
                if ent.var_to_chk <= 0.0 {
                    sgn_run += 1;
                }
                e = self.h.next_in_row(e);
            }
            let mut min_run = MIN_SEED;
            let mut sgn_run = 0u32;
            let mut e = self.h.last_in_row(i);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.chk_to_var = ent.chk_to_var.min(min_run);
                ent.sgn += sgn_run;
                let sign = if ent.sgn % 2 == 1 { -1.0 } else { 1.0 };
                ent.chk_to_var = sign * alpha * ent.chk_to_var;
                // running state picks up this edge only after its
                // output is written, mirroring the forward pass
                if ent.var_to_chk.abs() < min_run {
                    min_run = ent.var_to_chk.abs();
                }
                if ent.var_to_chk <= 0.0 {
                    sgn_run += 1;
                }
                e = self.h.prev_in_row(e);
            }
        }
    }

    /// An inactivated check contributes the combination identity on
    /// every edge: ratio 1 in ratio form, 0 in the log domain.
    fn neutralize_row(&mut self, i: usize, neutral: f64) {
        let mut e = self.h.first_in_row(i);
        while !self.h.is_sentinel(e) {
            self.h.entry_mut(e).chk_to_var = neutral;
            e = self.h.next_in_row(e);
        }
    }

    // -- parallel bit phase --------------------------------------------------

    /// Ratio-form bit update and posterior. Products of near-zero and
    /// near-infinite ratios routinely produce NaN; the accumulator is
    /// reset to the product identity so the opposite half of the sweep
    /// survives.
    fn bit_update_ratio(&mut self) {
        for j in 0..self.n {
            let mut t = self.channel.ratios()[j];
            let mut e = self.h.first_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk = t;
                t *= ent.chk_to_var;
                if t.is_nan() {
                    t = 1.0;
                }
                e = self.h.next_in_col(e);
            }
            self.llr[j] = (1.0 / t).ln();
            self.ehat[j] = u8::from(t >= 1.0);

            let mut t = 1.0;
            let mut e = self.h.last_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk *= t;
                t *= ent.chk_to_var;
                if t.is_nan() {
                    t = 1.0;
                }
                e = self.h.prev_in_col(e);
            }
        }
    }

    /// Log-domain bit update and posterior, shared by the product-sum
    /// and min-sum kernels.
    fn bit_update_log(&mut self) {
        for j in 0..self.n {
            let mut t = self.channel.llrs()[j];
            let mut e = self.h.first_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk = t;
                t += ent.chk_to_var;
                e = self.h.next_in_col(e);
            }
            self.llr[j] = t;
            self.ehat[j] = u8::from(t <= 0.0);

            let mut t = 0.0;
            let mut e = self.h.last_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk += t;
                t += ent.chk_to_var;
                e = self.h.prev_in_col(e);
            }
        }
    }

    // -- serial schedule -----------------------------------------------------

    /// One serial iteration: bits in ascending order, each check
    /// message recomputed on demand from the other edges of its row, so
    /// later bits see earlier bits' updates immediately. All methods
    /// run in the log domain here; the configured kernel only selects
    /// the check combination rule.
    fn serial_sweep(&mut self, alpha: f64) {
        for j in 0..self.n {
            self.llr[j] = self.channel.llrs()[j];

            let mut e = self.h.first_in_col(j);
            while !self.h.is_sentinel(e) {
                let row = self.h.entry(e).row;
                if self.inactivated[row] != 0 {
                    self.h.entry_mut(e).chk_to_var = 0.0;
                    e = self.h.next_in_col(e);
                    continue;
                }
                let msg = match self.kernel {
                    Kernel::ProdSum | Kernel::ProdSumLog => self.serial_check_message_log(row, e),
                    Kernel::MinSumLog => self.serial_check_message_min_sum(row, e, alpha),
                };
                let ent = self.h.entry_mut(e);
                ent.chk_to_var = msg;
                // snapshot the prefix sum before folding this check in
                ent.var_to_chk = self.llr[j];
                self.llr[j] += msg;
                e = self.h.next_in_col(e);
            }

            self.ehat[j] = u8::from(self.llr[j] <= 0.0);

            // backward sweep finalizes the column's bit-to-check
            // messages, matching the parallel second pass
            let mut t = 0.0;
            let mut e = self.h.last_in_col(j);
            while !self.h.is_sentinel(e) {
                let ent = self.h.entry_mut(e);
                ent.var_to_chk += t;
                t += ent.chk_to_var;
                e = self.h.prev_in_col(e);
            }
        }
    }

    /// Product-sum message from check `row` to the bit behind edge
    /// `skip`, from the other edges' current bit-to-check values.
    fn serial_check_message_log(&self, row: usize, skip: crate::sparse::EntryIdx) -> f64 {
        let mut prod = 1.0;
        let mut g = self.h.first_in_row(row);
        while !self.h.is_sentinel(g) {
            if g != skip {
                prod *= (self.h.entry(g).var_to_chk / 2.0).tanh();
            }
            g = self.h.next_in_row(g);
        }
        let syndrome_sgn = if self.syndrome[row] != 0 { -1.0 } else { 1.0 };
        syndrome_sgn * ((1.0 + prod) / (1.0 - prod)).ln()
    }

    /// Min-sum message from check `row` to the bit behind edge `skip`.
    fn serial_check_message_min_sum(
        &self,
        row: usize,
        skip: crate::sparse::EntryIdx,
        alpha: f64,
    ) -> f64 {
        let mut min_abs = MIN_SEED;
        let mut sgn = u32::from(self.syndrome[row]);
        let mut g = self.h.first_in_row(row);
        while !self.h.is_sentinel(g) {
            if g != skip {
                let v = self.h.entry(g).var_to_chk;
                if v.abs() < min_abs {
                    min_abs = v.abs();
                }
                if v <= 0.0 {
                    sgn += 1;
                }
            }
            g = self.h.next_in_row(g);
        }
        let sign = if sgn % 2 == 1 { -1.0 } else { 1.0 };
        sign * alpha * min_abs
    }

    // -- convergence ---------------------------------------------------------

    /// Recompute H * ehat and compare with the working syndrome on
    /// active rows. Inactivated checks are exempt; the residual solve
    /// of the inactivation post-processor is what repairs them.
    fn syndrome_satisfied(&mut self) -> bool {
        self.h.mulvec(
            self.ehat.as_slice().expect("contiguous buffer"),
            self.ehat_syndrome.view_mut(),
        );
        for i in 0..self.m {
            if self.inactivated[i] == 0 && self.ehat_syndrome[i] != self.syndrome[i] {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BpMethod, DecoderOptions, InputType};
    use crate::sparse::SparseBitMatrix;
    use ndarray::{array, Array1};
    use proptest::prelude::*;

    fn hamming_h() -> SparseBitMatrix {
        let dense = array![
            [1, 0, 0, 1, 1, 0, 1],
            [0, 1, 0, 1, 0, 1, 1],
            [0, 0, 1, 0, 1, 1, 1],
        ];
        SparseBitMatrix::from_dense(dense.view()).unwrap()
    }

    fn hamming_decoder(method: BpMethod, schedule: Schedule, alpha: f64) -> BpDecoder {
        let opts = DecoderOptions {
            error_rate: Some(0.05),
            max_iter: 7,
            bp_method: method,
            ms_scaling_factor: alpha,
            schedule,
            input_type: InputType::Syndrome,
            ..DecoderOptions::default()
        };
        BpDecoder::new(hamming_h(), opts).unwrap()
    }

    // Min-sum localizes a single error whose syndrome is a column of H
    #[test]
    fn min_sum_single_error() {
        let mut dec = hamming_decoder(BpMethod::MinSumLog, Schedule::Parallel, 0.75);
        // syndrome equal to column 5
        let e = dec.decode(&[0, 1, 1]).unwrap();
        assert_eq!(e, array![0, 0, 0, 0, 0, 1, 0]);
        assert!(dec.converged());
        assert!(dec.num_iters() <= 7);
    }

    // Single errors on bits of column weight 1 and 2 are recovered
    // exactly; the weight-3 bit shares its syndrome with a weight-4
    // pattern, so exact recovery is only asserted up to bit 5
    #[test]
    fn all_single_errors() {
        let dense = array![
            [1u8, 0, 0, 1, 1, 0, 1],
            [0, 1, 0, 1, 0, 1, 1],
            [0, 0, 1, 0, 1, 1, 1],
        ];
        for method in [BpMethod::ProdSum, BpMethod::ProdSumLog, BpMethod::MinSumLog] {
            for schedule in [Schedule::Parallel, Schedule::Serial] {
                for bit in 0..6 {
                    let syndrome: Vec<u8> = (0..3).map(|r| dense[(r, bit)]).collect();
                    let mut dec = hamming_decoder(method, schedule, 0.75);
                    let e = dec.decode(&syndrome).unwrap();
                    let mut expected = Array1::zeros(7);
                    expected[bit] = 1;
                    assert_eq!(
                        e, expected,
                        "bit {bit} method {method:?} schedule {schedule:?}"
                    );
                    assert!(dec.converged());
                }
            }
        }
    }

    // The adaptive normalization factor grows as 1 - 2^(-t)
    #[test]
    fn adaptive_alpha_schedule() {
        let dec = hamming_decoder(BpMethod::MinSumLog, Schedule::Parallel, 0.0);
        assert_eq!(dec.effective_alpha(1), 0.5);
        assert_eq!(dec.effective_alpha(2), 0.75);
        assert_eq!(dec.effective_alpha(3), 0.875);
        assert!(dec.effective_alpha(50) < 1.0);

        let fixed = hamming_decoder(BpMethod::MinSumLog, Schedule::Parallel, 0.6);
        assert_eq!(fixed.effective_alpha(1), 0.6);
        assert_eq!(fixed.effective_alpha(9), 0.6);
    }

    // Adaptive min-sum still decodes single errors
    #[test]
    fn adaptive_min_sum_decodes() {
        let mut dec = hamming_decoder(BpMethod::MinSum, Schedule::Parallel, 0.0);
        let e = dec.decode(&[0, 1, 1]).unwrap();
        assert_eq!(e, array![0, 0, 0, 0, 0, 1, 0]);
        assert!(dec.converged());
    }

    // Parallel and serial product-sum agree on converged hard decisions
    #[test]
    fn schedules_agree_on_hamming() {
        for bit in 0..6 {
            let dense = array![
                [1u8, 0, 0, 1, 1, 0, 1],
                [0, 1, 0, 1, 0, 1, 1],
                [0, 0, 1, 0, 1, 1, 1],
            ];
            let syndrome: Vec<u8> = (0..3).map(|r| dense[(r, bit)]).collect();
            let mut par = hamming_decoder(BpMethod::ProdSumLog, Schedule::Parallel, 1.0);
            let mut ser = hamming_decoder(BpMethod::ProdSumLog, Schedule::Serial, 1.0);
            assert_eq!(
                par.decode(&syndrome).unwrap(),
                ser.decode(&syndrome).unwrap()
            );
        }
    }

    // An exhausted decode reports non-convergence and a best-effort
    // decision without erroring
    #[test]
    fn non_convergence_is_not_an_error() {
        // both rows constrain the same bit pair, so H*x is always
        // [x0^x1, x0^x1] and the syndrome [1,0] has no solution
        let h = SparseBitMatrix::from_entries(2, 2, &[(0, 0), (0, 1), (1, 0), (1, 1)]).unwrap();
        let opts = DecoderOptions {
            error_rate: Some(0.1),
            max_iter: 6,
            bp_method: BpMethod::ProdSumLog,
            input_type: InputType::Syndrome,
            ..DecoderOptions::default()
        };
        let mut dec = BpDecoder::new(h, opts).unwrap();
        let e = dec.decode(&[1, 0]).unwrap();
        assert!(!dec.converged());
        assert_eq!(dec.num_iters(), 6);
        assert_eq!(e.len(), 2);
        assert!(e.iter().all(|&b| b <= 1));
    }

    // Posterior sign matches the hard decision in every kernel
    #[test]
    fn llr_sign_matches_decision() {
        for method in [BpMethod::ProdSum, BpMethod::ProdSumLog, BpMethod::MinSumLog] {
            let mut dec = hamming_decoder(method, Schedule::Parallel, 0.75);
            dec.decode(&[0, 1, 1]).unwrap();
            for (&bit, &llr) in dec.ehat().iter().zip(dec.llr().iter()) {
                if llr > 0.0 {
                    assert_eq!(bit, 0, "method {method:?}");
                } else {
                    assert_eq!(bit, 1, "method {method:?}");
                }
            }
        }
    }

    proptest! {
        // For any syndrome: the output is binary of length n, and on
        // convergence H * ehat reproduces the syndrome exactly
        #[test]
        fn prop_syndrome_law(bits in proptest::collection::vec(any::<bool>(), 3),
                             method_id in 0i64..4,
                             schedule_id in 0i64..2) {
            let syndrome: Vec<u8> = bits.iter().map(|&b| b as u8).collect();
            let opts = DecoderOptions {
                error_rate: Some(0.05),
                max_iter: 15,
                bp_method: BpMethod::try_from(method_id).unwrap(),
                ms_scaling_factor: 0.75,
                schedule: Schedule::try_from(schedule_id).unwrap(),
                input_type: InputType::Syndrome,
                ..DecoderOptions::default()
            };
            let mut dec = BpDecoder::new(hamming_h(), opts).unwrap();
            let e = dec.decode(&syndrome).unwrap();
            prop_assert_eq!(e.len(), 7);
            prop_assert!(e.iter().all(|&b| b <= 1));
            if dec.converged() {
                let mut out = Array1::zeros(3);
                dec.parity_check_matrix().mulvec(e.as_slice().unwrap(), out.view_mut());
                prop_assert_eq!(out.to_vec(), syndrome);
            }
        }
    }
}
