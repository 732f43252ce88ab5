//! RingSPSC - Lock-Free Single-Producer Single-Consumer Ring Buffer
//!
//! A bounded, wait-free ring buffer for moving `Copy` values between exactly
//! one producer thread and exactly one consumer thread - or between an
//! interrupt/DMA context and a thread. Storage is embedded in the struct and
//! construction is `const`, so a ring can live in a `static`.
//!
//! # Key Features
//!
//! - Power-of-two capacity: slot indexing is a single AND, no division
//! - No wasted slot: full and empty are distinguished by the counter
//!   difference, so all N slots hold data
//! - 128-byte alignment of both counters (prefetcher false sharing
//!   elimination)
//! - Batch push/pop split into at most two bulk copies at the wrap boundary,
//!   with optional per-iteration notification callbacks
//! - Selectable counter width (`u8` up to `usize`) for small targets
//! - `FAKE_TSO` mode that erases hardware barriers on total-store-order
//!   hardware, keeping only compiler fences
//!
//! # Example
//!
//! ```
//! use ringspsc_rs::SpscRing;
//! use std::thread;
//!
//! let mut ring: SpscRing<u64, 1024> = SpscRing::new();
//! let (mut producer, mut consumer) = ring.split();
//!
//! thread::scope(|s| {
//!     s.spawn(move || {
//!         let mut batch = [0u64; 64];
//!         for (i, slot) in batch.iter_mut().enumerate() {
//!             *slot = i as u64;
//!         }
//!         let mut sent = 0;
//!         while sent < batch.len() {
//!             sent += producer.push_slice(&batch[sent..]);
//!         }
//!     });
//!
//!     let mut received = Vec::new();
//!     while received.len() < 64 {
//!         if let Ok(value) = consumer.pop() {
//!             received.push(value);
//!         }
//!     }
//!     assert_eq!(received, (0..64).collect::<Vec<u64>>());
//! });
//! ```
//!
//! # Failure model
//!
//! Pushing into a full ring and popping from an empty ring are the only
//! failures; both are wait-free rejections the caller retries on its own
//! schedule (see [`Backoff`]). Nothing blocks, nothing is retried
//! internally, and no operation takes more than a bounded number of steps.

mod backoff;
mod error;
mod index;
mod invariants;
mod ring;
mod split;

pub use backoff::Backoff;
pub use error::{PopError, PushError};
pub use index::RingIndex;
pub use ring::SpscRing;
pub use split::{Consumer, Producer};
