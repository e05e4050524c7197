// src/similarity.rs
//! Company-name similarity. Combines Jaro-Winkler, Levenshtein, phonetic
//! (Soundex + Double Metaphone) signals and an aggressive-normalization
//! exact-match bonus into one score in [0, 1].
//!
//! This score is a reusable primitive for "are these the same company"
//! decisions (cross-source aggregation dedup uses it); the round-duplicate
//! check goes through slug/alias lookup instead.

use rphonetic::{DoubleMetaphone, Encoder, Soundex};

use crate::normalize::{aggressive_normalize, comparable_name};

const W_JARO_WINKLER: f64 = 0.4;
const W_LEVENSHTEIN: f64 = 0.3;
const W_PHONETIC: f64 = 0.2;
const NORMALIZED_EXACT_BONUS: f64 = 0.1;

const W_SOUNDEX: f64 = 0.4;
const W_METAPHONE: f64 = 0.6;

/// Soundex equality is binary; Double Metaphone grades by which of the
/// primary/alternate codes agree.
pub fn phonetic_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let soundex = Soundex::default();
    let sx = if soundex.encode(a) == soundex.encode(b) {
        1.0
    } else {
        0.0
    };

    let dm = DoubleMetaphone::default();
    let (pa, aa) = (dm.encode(a), dm.encode_alternate(a));
    let (pb, ab) = (dm.encode(b), dm.encode_alternate(b));

    let metaphone = if !pa.is_empty() && pa == pb {
        1.0
    } else if (!pa.is_empty() && pa == ab) || (!aa.is_empty() && aa == pb) {
        0.8
    } else if !aa.is_empty() && aa == ab {
        0.6
    } else {
        0.0
    };

    W_SOUNDEX * sx + W_METAPHONE * metaphone
}

/// Combined similarity over suffix-stripped lowercase forms:
/// `0.4·jaro_winkler + 0.3·levenshtein + 0.2·phonetic`, plus a flat `+0.1`
/// when both names reduce to the same bare-token form (capped at 1.0).
pub fn combined_similarity(a: &str, b: &str) -> f64 {
    let ca = comparable_name(a);
    let cb = comparable_name(b);
    if ca.is_empty() || cb.is_empty() {
        return 0.0;
    }

    let jw = strsim::jaro_winkler(&ca, &cb);
    let lev = strsim::normalized_levenshtein(&ca, &cb);
    let ph = phonetic_similarity(&ca, &cb);

    let mut score = W_JARO_WINKLER * jw + W_LEVENSHTEIN * lev + W_PHONETIC * ph;

    let na = aggressive_normalize(a);
    if !na.is_empty() && na == aggressive_normalize(b) {
        score += NORMALIZED_EXACT_BONUS;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_after_suffix_strip_scores_full() {
        assert!(combined_similarity("Acme SAS", "ACME") >= 0.9);
        assert!(combined_similarity("Acmé", "acme") >= 0.9);
    }

    #[test]
    fn unrelated_names_score_low() {
        assert!(combined_similarity("Acme", "Zephyr") < 0.3);
    }

    #[test]
    fn close_spellings_rank_above_distant_ones() {
        let near = combined_similarity("Dataiku", "Dataiko");
        let far = combined_similarity("Dataiku", "Mirakl");
        assert!(near > far);
        assert!(near > 0.7);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(combined_similarity("", "Acme"), 0.0);
        assert_eq!(phonetic_similarity("", ""), 0.0);
    }

    #[test]
    fn generic_suffix_only_affects_bonus() {
        // "Acme Labs" vs "Acme": string metrics differ, bonus applies.
        let s = combined_similarity("Acme Labs", "Acme");
        assert!(s > 0.55, "got {s}");
        assert!(s > combined_similarity("Acme Labs", "Zephyr"));
    }
}
