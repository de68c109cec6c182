//! # Threshold Secret Sharing over QR Codes
//!
//! This library splits a secret into pieces that can be handed to trusted people, any
//! threshold-sized group of which can later restore it, and carries those pieces through QR
//! codes that hold only a limited amount of text.
//!
//! ## The Share Pipeline
//!
//! Splitting runs the secret through a fixed sequence of stages:
//!
//! ```ignore
//! secret ─► checksum|secret ─► zlib ─► hex ─► Shamir split ─► [E|O]base64 per share
//! ```
//!
//! Combining runs the same stages in reverse and reports whether the recovered text still
//! matches the checksum embedded at split time. A mismatch is a result, not an error: a wrong
//! set of shares can combine structurally and still produce the wrong secret.
//!
//! ### Shamir's Secret Sharing
//!
//! Each payload byte `S` gets a random polynomial of degree `t-1` over GF(2^8):
//!
//! ```ignore
//! f(x) = S + a1*x + a2*x^2 + ... + a(t-1)*x^(t-1)
//! ```
//!
//! Share `i` holds `f(i)` for every byte. Any `t` shares determine the polynomials, and
//! Lagrange interpolation at `x = 0` yields the payload back; fewer than `t` leave every value
//! of `S` equally likely.
//!
//! ## QR Transport
//!
//! A share longer than one QR code's capacity is cut into chunks tagged
//! `SHARE_<pos>_OF_<total>|`. While scanning, chunks arrive in any order, repeat while the
//! camera stays on one code, and may switch to another share's codes. The scan session
//! collects them, ignores repeats, restarts when the set changes and hands out each
//! completed share exactly once.
//!
//! ### Example: Splitting and Restoring
//!
//! ```rust
//! use lastresort::chunks::{reconstruct, split_into_chunks};
//! use lastresort::pipeline::{combine, split};
//!
//! let shares = split("correct horse battery staple", 5, 3).unwrap();
//!
//! // every share travels as one or more QR payloads
//! let payloads: Vec<String> = split_into_chunks(&shares[0], 20)
//!     .unwrap()
//!     .iter()
//!     .map(|chunk| chunk.payload())
//!     .collect();
//! let first = reconstruct(&payloads).unwrap();
//!
//! let recovered = combine(&[first.as_str(), shares[2].as_str(), shares[4].as_str()]).unwrap();
//! assert_eq!(recovered.secret, "correct horse battery staple");
//! assert!(recovered.is_valid);
//! ```
//!
//! ## Modules
//!
//! - `checksum`: Integrity tag embedded with the secret.
//! - `compression`: zlib compression of the tagged secret.
//! - `transcode`: Hex share tokens to printable share text and back.
//! - `sss`: Shamir's Secret Sharing over GF(2^8) and the `ShareScheme` interface.
//! - `pipeline`: Split and combine secrets end to end.
//! - `chunks`: QR-sized chunks of share text.
//! - `session`: Reassembly of chunks from scans.
//! - `scanner`: Channel-driven scan loop with debouncing.
//! - `config`: On-disk and environment configuration.

/// The `checksum` module computes the eight-digit hex tag stored next to the secret so that
/// a recombined secret can be checked against what was originally split.
pub mod checksum;

/// The `compression` module deflates the tagged secret before splitting, keeping shares and
/// therefore QR codes small.
pub mod compression;

/// The `transcode` module turns the hex tokens produced by the sharing scheme into the
/// compact share text printed and scanned, and back.
pub mod transcode;

/// The `sss` (Shamir's Secret Sharing) module implements the threshold scheme over GF(2^8)
/// and exposes it through the `ShareScheme` trait used by the pipeline.
pub mod sss;

/// The `pipeline` module chains checksum, compression, sharing and transcoding into the
/// `split` and `combine` operations.
pub mod pipeline;

/// The `chunks` module cuts share text into QR-sized payloads and reassembles them.
pub mod chunks;

/// The `session` module implements the scan reassembly state machine.
pub mod session;

/// The `scanner` module drives a scan session from a channel of decoded frames.
pub mod scanner;

/// The `config` module loads settings from `conf.toml` and the environment.
pub mod config;

/// The `error` module defines the error taxonomy shared by all operations.
pub mod error;

/// The `constants` module defines various constants used in the library.
pub mod constants;

pub use error::{Result, ShareError};
pub use pipeline::{combine, split, Recovered, SecretPipeline};
