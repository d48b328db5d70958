//! Proof-of-work: the target formula objects must satisfy before relaying, the
//! trial-value check, and a parallel nonce search.
//!
//! Grounded on the teacher's absence of any PoW concept (Bitcoin handshakes carry none);
//! this module's shape instead follows the teacher's worker-pool style used for connection
//! handling, adapted to a CPU-bound search: a shared cancellation flag, a bounded thread
//! pool via `rayon`, and a one-shot `mpsc` channel for the result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use rayon::prelude::*;

use crate::codec::buffer::ByteBufferComposer;
use crate::codec::var_int::MAX_SAFE_INTEGER;
use crate::crypto::hash::sha512d;
use crate::error::{BmError, BmResult};

const MIN_NONCE_TRIALS_PER_BYTE: u64 = 1000;
const MIN_PAYLOAD_LENGTH_EXTRA_BYTES: u64 = 1000;
/// Upper bound on the nonce search space: the wire format carries the nonce in an
/// 8-byte field, but the reference network never needs more than 2^32 attempts to
/// find a target this generous, and capping here keeps worker loops finite.
const MAX_NONCE: u64 = u32::MAX as u64;
const POLL_INTERVAL: u32 = 4096;

/// `target = 2^80 / ((ttl + 65536) * (payloadLength + extra) * trials)`, with `trials`
/// and `extra` clamped to a minimum of 1000 each. Fails if the result would not fit in
/// a 53-bit safe integer.
pub fn get_target(
    ttl_seconds: u64,
    payload_length: u64,
    nonce_trials_per_byte: u64,
    payload_length_extra_bytes: u64,
) -> BmResult<u64> {
    let trials = nonce_trials_per_byte.max(MIN_NONCE_TRIALS_PER_BYTE) as u128;
    let extra = payload_length_extra_bytes.max(MIN_PAYLOAD_LENGTH_EXTRA_BYTES) as u128;
    let length = payload_length as u128 + extra;
    let denom = (ttl_seconds as u128 + 65536) * length * trials;
    if denom == 0 {
        return Err(BmError::argument("PoW target denominator is zero"));
    }
    let target = (1u128 << 80) / denom;
    if target > MAX_SAFE_INTEGER as u128 {
        return Err(BmError::pow("PoW target does not fit in a 53-bit safe integer"));
    }
    Ok(target as u64)
}

fn trial_value(nonce: u64, initial_hash: &[u8; 64]) -> u64 {
    let mut composer = ByteBufferComposer::new();
    composer.append_u64_be(nonce);
    composer.append(initial_hash);
    let digest = sha512d(&composer.result());
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}

/// `SHA512(SHA512(nonce_be_u64 ‖ initialHash))[0..8] <= target`, read big-endian.
pub fn check(nonce: u64, target: u64, initial_hash: &[u8; 64]) -> bool {
    trial_value(nonce, initial_hash) <= target
}

/// Why a [`search`] call ended without a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    /// [`SearchHandle::cancel`] was called before any worker found a valid nonce.
    Cancelled,
    /// The whole nonce space up to [`MAX_NONCE`] was exhausted without success.
    Overflow,
}

/// A handle to an in-flight [`search`]; dropping it does not cancel the search.
pub struct SearchHandle {
    cancel: Arc<AtomicBool>,
}

impl SearchHandle {
    /// Cooperatively stops every worker. Workers poll this flag roughly every
    /// [`POLL_INTERVAL`] hash attempts, so cancellation is not instantaneous.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// Spawns a driver thread that partitions the nonce space across `pool_size` workers
/// (default: [`default_pool_size`]) and searches for the first nonce satisfying `target`
/// against `initial_hash`. Returns immediately with a handle and a receiver that yields
/// exactly one result once a worker succeeds, every worker gives up, or the search is
/// cancelled.
pub fn search(
    initial_hash: [u8; 64],
    target: u64,
    pool_size: usize,
) -> (SearchHandle, mpsc::Receiver<Result<u64, SearchFailure>>) {
    let pool_size = pool_size.max(1);
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let handle = SearchHandle { cancel: cancel.clone() };

    thread::spawn(move || {
        let done = AtomicBool::new(false);
        let found = (0..pool_size).into_par_iter().find_map_any(|worker| {
            let nonce = worker_search(worker as u64, pool_size as u64, &initial_hash, target, &cancel, &done);
            if nonce.is_some() {
                done.store(true, Ordering::Relaxed);
            }
            nonce
        });
        let outcome = match found {
            Some(nonce) => Ok(nonce),
            None if cancel.load(Ordering::Relaxed) => Err(SearchFailure::Cancelled),
            None => Err(SearchFailure::Overflow),
        };
        let _ = tx.send(outcome);
    });

    (handle, rx)
}

/// Default worker count: the machine's available parallelism, as the teacher's
/// connection-handling pool also sizes itself.
pub fn default_pool_size() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn worker_search(
    start: u64,
    stride: u64,
    initial_hash: &[u8; 64],
    target: u64,
    cancel: &AtomicBool,
    done: &AtomicBool,
) -> Option<u64> {
    let mut nonce = start;
    let mut since_poll = 0u32;
    while nonce <= MAX_NONCE {
        if check(nonce, target, initial_hash) {
            return Some(nonce);
        }
        since_poll += 1;
        if since_poll >= POLL_INTERVAL {
            if cancel.load(Ordering::Relaxed) || done.load(Ordering::Relaxed) {
                return None;
            }
            since_poll = 0;
        }
        nonce += stride;
    }
    None
}
