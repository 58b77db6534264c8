//! Audio format selection.
//!
//! Preference order: M4A before any other container, then higher bitrate,
//! then upstream order. Pure and stable: the same slice always yields the
//! same element.

use std::cmp::Reverse;

use crate::backend::{AudioEncoding, Container};

/// Sort key; smaller is better.
fn preference(encoding: &AudioEncoding) -> (bool, Reverse<u64>) {
    (encoding.container != Container::M4a, Reverse(encoding.bitrate_bps))
}

/// All encodings, best first. Equal keys keep their input order.
pub fn rank(encodings: &[AudioEncoding]) -> Vec<&AudioEncoding> {
    let mut ranked: Vec<&AudioEncoding> = encodings.iter().collect();
    ranked.sort_by_key(|e| preference(e));
    ranked
}

/// The best encoding, or `None` for an empty slice.
pub fn select_best(encodings: &[AudioEncoding]) -> Option<&AudioEncoding> {
    // min_by_key returns the first of several equal minima
    encodings.iter().min_by_key(|e| preference(e))
}
