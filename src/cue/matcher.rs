//! Transcript-to-cue prefix matching.
//!
//! A transcript is reduced to a probe of its first one or two lowercase
//! tokens. A cue matches when its own token prefix, lowercased, is a literal
//! leading subsequence of the probe. The table is scanned in stored order
//! and the first match wins; O(cues) per transcript, which is fine for the
//! dozens of cues a show carries.

use crate::cue::Cue;
use crate::defaults;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Normalizes a transcript into its match probe: the first
/// `min(PROBE_TOKENS, token_count)` tokens, lowercased.
pub fn probe(text: &str) -> Vec<String> {
    text.split_whitespace()
        .take(defaults::PROBE_TOKENS)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Returns true when the cue's token prefix is fully contained at the start
/// of the probe. A cue with more tokens than the probe never matches.
pub fn matches_probe(cue: &Cue, probe: &[String]) -> bool {
    if cue.first_tokens.is_empty() || probe.len() < cue.first_tokens.len() {
        return false;
    }
    cue.first_tokens
        .iter()
        .zip(probe)
        .all(|(token, probe_token)| token.to_lowercase() == *probe_token)
}

/// Scans the table in stored order and returns the position of the first
/// matching cue. Iteration order is authoritative, not best match.
pub fn find_match(cues: &[Cue], probe: &[String]) -> Option<usize> {
    cues.iter().position(|cue| matches_probe(cue, probe))
}

/// Resolves a cue's audio reference against the audio directory.
///
/// Only the basename of the reference is used, and resolution happens at
/// dispatch time so renaming the directory takes effect immediately.
pub fn resolve_audio(audio_dir: &Path, reference: &str) -> PathBuf {
    let basename = Path::new(reference)
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from(reference));
    audio_dir.join(basename)
}
