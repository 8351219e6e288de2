//! Proof-of-work search and verification
//!
//! A solution for `(seed, n)` is any 32-byte candidate `s` such that
//! `SHA-256(s || seed)`, read as a big-endian unsigned integer, is strictly
//! less than `2^n`. Difficulty is the number of leading zero bits this
//! forces, i.e. `difficulty = 256 - n`.
//!
//! The search walks a 32-byte big-endian counter from zero. It is unbounded
//! CPU work, so [`spawn_solver`] runs it on a blocking thread behind a
//! cancellation flag; dropping the returned [`Solver`] stops the search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::crypto::{hash, HASH_SIZE};

/// Length of a proof-of-work solution in bytes
pub const SOLUTION_SIZE: usize = 32;
/// Bit length of the hash the threshold is measured against
pub const HASH_BITS: u32 = (HASH_SIZE * 8) as u32;

/// candidates tried between cancellation checks
const CANCEL_CHECK_INTERVAL: u32 = 4096;

pub type Solution = [u8; SOLUTION_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PowError {
    #[error("proof-of-work search space exhausted without a solution")]
    Exhausted,
    #[error("proof-of-work search cancelled")]
    Cancelled,
}

/// Threshold exponent `n` for a difficulty expressed in leading zero bits
pub fn threshold_bits(difficulty: u8) -> u32 {
    HASH_BITS.saturating_sub(difficulty as u32)
}

/// True iff `bytes`, read as a big-endian integer of `8 * len` bits, is < `2^n`.
pub fn below_threshold(bytes: &[u8], n: u32) -> bool {
    let total_bits = bytes.len() as u32 * 8;
    if n >= total_bits {
        return true;
    }

    let zero_bits = total_bits - n;
    let zero_bytes = (zero_bits / 8) as usize;
    let remainder_bits = zero_bits % 8;

    if bytes[..zero_bytes].iter().any(|b| *b != 0) {
        return false;
    }
    if remainder_bits == 0 {
        return true;
    }
    // remainder_bits is in 1..=7 here, so zero_bytes < len
    (bytes[zero_bytes] as u32) < (1u32 << (8 - remainder_bits))
}

/// Increment a big-endian counter in place.
///
/// Returns `true` when every byte wrapped to zero, signalling that the
/// counter's space is exhausted.
pub fn increment(counter: &mut [u8]) -> bool {
    for byte in counter.iter_mut().rev() {
        let (next, carried) = byte.overflowing_add(1);
        *byte = next;
        if !carried {
            return false;
        }
    }
    true
}

/// Check a candidate solution against `seed` and `n`
pub fn verify(solution: &[u8], seed: &[u8], n: u32) -> bool {
    below_threshold(&hash(solution, seed), n)
}

/// Search for a solution without cancellation.
///
/// Returns `None` only if the whole counter space was exhausted.
pub fn solve(seed: &[u8], n: u32) -> Option<Solution> {
    solve_until(seed, n, &AtomicBool::new(false)).ok()
}

/// Search for a solution, checking `cancel` periodically.
pub fn solve_until(seed: &[u8], n: u32, cancel: &AtomicBool) -> Result<Solution, PowError> {
    let mut counter = [0u8; SOLUTION_SIZE];
    let mut since_check = 0u32;
    loop {
        if verify(&counter, seed, n) {
            return Ok(counter);
        }
        if increment(&mut counter) {
            return Err(PowError::Exhausted);
        }
        since_check += 1;
        if since_check == CANCEL_CHECK_INTERVAL {
            since_check = 0;
            if cancel.load(Ordering::Relaxed) {
                return Err(PowError::Cancelled);
            }
        }
    }
}

/// Handle to a proof-of-work search running off the async executor
#[derive(Debug)]
pub struct Solver {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<Result<Solution, PowError>>>,
}

/// Start searching for a solution on a blocking thread
pub fn spawn_solver(seed: Vec<u8>, n: u32) -> Solver {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    let handle = tokio::task::spawn_blocking(move || {
        let started = std::time::Instant::now();
        let result = solve_until(&seed, n, &flag);
        tracing::debug!(
            threshold_bits = n,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "proof-of-work search finished"
        );
        result
    });
    Solver {
        cancel,
        handle: Some(handle),
    }
}

impl Solver {
    /// Ask the search to stop at its next check
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the search to finish
    pub async fn join(mut self) -> Result<Solution, PowError> {
        match self.handle.take() {
            Some(handle) => handle.await.map_err(|_| PowError::Cancelled)?,
            None => Err(PowError::Cancelled),
        }
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        // an abandoned search must not keep burning a blocking thread
        self.cancel.store(true, Ordering::Relaxed);
    }
}
