//! Belief-propagation decoding for binary LDPC codes, with a
//! check-inactivation fallback for syndromes that trap plain BP.
//!
//! The decoder works on a sparse parity-check matrix H (m checks by
//! n bits) and a per-bit memoryless channel. Given a syndrome s it
//! estimates an error pattern e with H*e = s; given a received word y
//! it forms s = H*y internally and returns the corrected word e XOR y.
//!
//! Three update kernels are available (product-sum in probability-ratio
//! form, product-sum in the log domain, and normalized min-sum), each
//! under a parallel (flooding) or serial (sequential) schedule. When BP
//! fails to converge, [`BpDecoder::si_decode`] disables small rings of
//! unreliable checks, re-runs BP on the rest of the graph, and repairs
//! the disabled region by solving a cluster-sized linear system over
//! GF(2).
//!
//! # Example
//!
//! ```rust
//! use bpsi::{BpDecoder, BpMethod, DecoderOptions, InputType, SparseBitMatrix};
//! use ndarray::array;
//!
//! let h = SparseBitMatrix::from_dense(array![[1, 1, 0], [0, 1, 1]].view()).unwrap();
//! let opts = DecoderOptions {
//!     error_rate: Some(0.1),
//!     max_iter: 10,
//!     bp_method: BpMethod::ProdSumLog,
//!     input_type: InputType::Syndrome,
//!     ..DecoderOptions::default()
//! };
//! let mut decoder = BpDecoder::new(h, opts).unwrap();
//!
//! let e = decoder.decode(&[1, 0]).unwrap();
//! assert_eq!(e, array![1, 0, 0]);
//! assert!(decoder.converged());
//! ```

mod bp;
mod channel;
mod config;
mod decoder;
mod error;
pub mod gf2;
mod inactivation;
mod sparse;

pub use channel::ChannelModel;
pub use config::{BpMethod, DecoderOptions, InputType, Schedule};
pub use decoder::BpDecoder;
pub use error::{DecoderError, DecoderResult};
pub use sparse::{Entry, EntryIdx, SparseBitMatrix};
