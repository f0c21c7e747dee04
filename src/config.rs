//! Decoder configuration: update kernels, schedules, input conventions.
//!
//! The enums accept the historical string and numeric aliases at the
//! configuration surface, so existing call sites keep working when the
//! decoder is driven from option files or language bindings.

use std::fmt;
use std::str::FromStr;

use crate::error::DecoderError;

/// Message-update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpMethod {
    /// Product-sum in probability-ratio form.
    ProdSum,
    /// Linear-domain min-sum. Accepted for compatibility; dispatches to
    /// the log-domain min-sum kernel.
    MinSum,
    /// Product-sum in the log domain.
    ProdSumLog,
    /// Normalized min-sum in the log domain.
    MinSumLog,
}

/// The kernel actually run for a configured [`BpMethod`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kernel {
    ProdSum,
    ProdSumLog,
    MinSumLog,
}

impl BpMethod {
    /// Kernel dispatched at decode time. `MinSum` re-routes to the
    /// log-domain min-sum; the linear-domain variant survives only as a
    /// configuration name.
    pub(crate) fn kernel(self) -> Kernel {
        match self {
            BpMethod::ProdSum => Kernel::ProdSum,
            BpMethod::MinSum | BpMethod::MinSumLog => Kernel::MinSumLog,
            BpMethod::ProdSumLog => Kernel::ProdSumLog,
        }
    }
}

impl fmt::Display for BpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BpMethod::ProdSum => "product_sum",
            BpMethod::MinSum => "min_sum",
            BpMethod::ProdSumLog => "product_sum_log",
            BpMethod::MinSumLog => "min_sum_log",
        };
        f.write_str(label)
    }
}

impl FromStr for BpMethod {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ps" | "prod_sum" | "product_sum" | "prod sum" => Ok(BpMethod::ProdSum),
            "ms" | "min_sum" | "minimum_sum" | "min sum" => Ok(BpMethod::MinSum),
            "psl" | "ps_log" | "product_sum_log" => Ok(BpMethod::ProdSumLog),
            "msl" | "ms_log" | "min_sum_log" | "minimum_sum_log" => Ok(BpMethod::MinSumLog),
            _ => Err(DecoderError::InvalidBpMethod(s.to_string())),
        }
    }
}

impl TryFrom<i64> for BpMethod {
    type Error = DecoderError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(BpMethod::ProdSum),
            1 => Ok(BpMethod::MinSum),
            2 => Ok(BpMethod::ProdSumLog),
            3 => Ok(BpMethod::MinSumLog),
            _ => Err(DecoderError::InvalidBpMethod(v.to_string())),
        }
    }
}

/// Message-passing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Flooding: all check messages, then all bit messages.
    Parallel,
    /// Sequential: bits updated one at a time in ascending index order.
    Serial,
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Schedule::Parallel => "parallel",
            Schedule::Serial => "serial",
        })
    }
}

impl FromStr for Schedule {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "p" | "parallel" | "flooding" | "fl" => Ok(Schedule::Parallel),
            "s" | "serial" | "sequential" => Ok(Schedule::Serial),
            _ => Err(DecoderError::InvalidSchedule(s.to_string())),
        }
    }
}

impl TryFrom<i64> for Schedule {
    type Error = DecoderError;

    fn try_from(v: i64) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Schedule::Parallel),
            1 => Ok(Schedule::Serial),
            _ => Err(DecoderError::InvalidSchedule(v.to_string())),
        }
    }
}

/// How a decode input vector is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    /// The input is a syndrome of length m.
    Syndrome,
    /// The input is a received word of length n.
    Received,
    /// Infer from the input length; requires m != n.
    Auto,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputType::Syndrome => "syndrome",
            InputType::Received => "received",
            InputType::Auto => "auto",
        })
    }
}

impl FromStr for InputType {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "syndrome" => Ok(InputType::Syndrome),
            "received" | "received_vector" => Ok(InputType::Received),
            "auto" => Ok(InputType::Auto),
            _ => Err(DecoderError::InvalidInputType(s.to_string())),
        }
    }
}

/// Construction options for [`BpDecoder`](crate::BpDecoder).
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Scalar error rate in (0, 1); required when `channel_probs` is
    /// absent.
    pub error_rate: Option<f64>,
    /// Per-bit error probabilities; overrides `error_rate`.
    pub channel_probs: Option<Vec<f64>>,
    /// Maximum BP iterations; 0 means "use the bit count n".
    pub max_iter: usize,
    pub bp_method: BpMethod,
    /// Min-sum normalization factor, non-negative. 0 selects the
    /// adaptive per-iteration factor 1 - 2^(-t).
    pub ms_scaling_factor: f64,
    pub schedule: Schedule,
    pub input_type: InputType,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            error_rate: None,
            channel_probs: None,
            max_iter: 0,
            bp_method: BpMethod::ProdSum,
            ms_scaling_factor: 1.0,
            schedule: Schedule::Parallel,
            input_type: InputType::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bp_method_aliases() {
        for s in ["ps", "prod_sum", "product_sum", "prod sum"] {
            assert_eq!(s.parse::<BpMethod>().unwrap(), BpMethod::ProdSum);
        }
        for s in ["ms", "min_sum", "minimum_sum", "min sum"] {
            assert_eq!(s.parse::<BpMethod>().unwrap(), BpMethod::MinSum);
        }
        for s in ["psl", "ps_log", "product_sum_log"] {
            assert_eq!(s.parse::<BpMethod>().unwrap(), BpMethod::ProdSumLog);
        }
        for s in ["msl", "ms_log", "min_sum_log", "minimum_sum_log"] {
            assert_eq!(s.parse::<BpMethod>().unwrap(), BpMethod::MinSumLog);
        }
        assert_eq!(BpMethod::try_from(0).unwrap(), BpMethod::ProdSum);
        assert_eq!(BpMethod::try_from(1).unwrap(), BpMethod::MinSum);
        assert_eq!(BpMethod::try_from(2).unwrap(), BpMethod::ProdSumLog);
        assert_eq!(BpMethod::try_from(3).unwrap(), BpMethod::MinSumLog);
        assert!("soft_xor".parse::<BpMethod>().is_err());
        assert!(BpMethod::try_from(4).is_err());
    }

    #[test]
    fn schedule_aliases() {
        for s in ["p", "parallel", "flooding", "fl", "Parallel"] {
            assert_eq!(s.parse::<Schedule>().unwrap(), Schedule::Parallel);
        }
        for s in ["s", "serial", "sequential"] {
            assert_eq!(s.parse::<Schedule>().unwrap(), Schedule::Serial);
        }
        assert_eq!(Schedule::try_from(0).unwrap(), Schedule::Parallel);
        assert_eq!(Schedule::try_from(1).unwrap(), Schedule::Serial);
        assert!("layered".parse::<Schedule>().is_err());
        assert!(Schedule::try_from(2).is_err());
    }

    #[test]
    fn labels_round_trip() {
        for m in [
            BpMethod::ProdSum,
            BpMethod::MinSum,
            BpMethod::ProdSumLog,
            BpMethod::MinSumLog,
        ] {
            assert_eq!(m.to_string().parse::<BpMethod>().unwrap(), m);
        }
        for s in [Schedule::Parallel, Schedule::Serial] {
            assert_eq!(s.to_string().parse::<Schedule>().unwrap(), s);
        }
        for t in [InputType::Syndrome, InputType::Received, InputType::Auto] {
            assert_eq!(t.to_string().parse::<InputType>().unwrap(), t);
        }
    }

    #[test]
    fn min_sum_redirects_to_log_kernel() {
        assert_eq!(BpMethod::MinSum.kernel(), Kernel::MinSumLog);
        assert_eq!(BpMethod::MinSumLog.kernel(), Kernel::MinSumLog);
        assert_eq!(BpMethod::ProdSum.kernel(), Kernel::ProdSum);
        assert_eq!(BpMethod::ProdSumLog.kernel(), Kernel::ProdSumLog);
    }
}
