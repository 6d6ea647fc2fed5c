//! Content fingerprints used to catch accidental duplicate ingestion.
//!
//! The digest covers only a leading window of the normalized text, so two
//! documents sharing a long identical preamble collide. That false-positive
//! risk is bounded by the window size.

use rulegraph_shared::FingerprintAlgorithm;
use sha2::{Digest, Sha256, Sha512};

/// Whitespace-collapsed, lower-cased prefix of `text`, at most `window` chars.
pub fn normalized_window(text: &str, window: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    collapsed.chars().take(window).collect()
}

/// `"<algorithm>:<hex>"` digest of the normalized window.
pub fn fingerprint(text: &str, window: usize, algorithm: FingerprintAlgorithm) -> String {
    let normalized = normalized_window(text, window);
    let hex = match algorithm {
        FingerprintAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(normalized.as_bytes());
            format!("{:x}", hasher.finalize())
        }
        FingerprintAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(normalized.as_bytes());
            format!("{:x}", hasher.finalize())
        }
    };
    format!("{}:{hex}", algorithm.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_case_do_not_matter() {
        let a = fingerprint("Rule 3.1350\n\n  Motions  for summary", 1000, FingerprintAlgorithm::Sha256);
        let b = fingerprint("rule 3.1350 motions for SUMMARY", 1000, FingerprintAlgorithm::Sha256);
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 64);
    }

    #[test]
    fn only_the_window_is_hashed() {
        let a = fingerprint("same preamble then one ending", 13, FingerprintAlgorithm::Sha256);
        let b = fingerprint("same preamble then another ending", 13, FingerprintAlgorithm::Sha256);
        assert_eq!(a, b);

        let a = fingerprint("same preamble then one ending", 1000, FingerprintAlgorithm::Sha256);
        assert_ne!(a, b);
    }

    #[test]
    fn sha512_is_prefixed() {
        let fp = fingerprint("text", 1000, FingerprintAlgorithm::Sha512);
        assert!(fp.starts_with("sha512:"));
        assert_eq!(fp.len(), "sha512:".len() + 128);
    }

    #[test]
    fn window_counts_chars_not_bytes() {
        assert_eq!(normalized_window("§ 1013 é", 4), "§ 10");
    }
}
