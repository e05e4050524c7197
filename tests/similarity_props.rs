// tests/similarity_props.rs
// Determinism and boundary properties of the combined name-similarity score.

use funding_radar::similarity::combined_similarity;

#[test]
fn legal_suffix_and_case_are_ignored() {
    assert!(combined_similarity("Acme SAS", "ACME") >= 0.9);
    assert!(combined_similarity("Dataiku Inc", "dataiku") >= 0.9);
    assert!(combined_similarity("Alan SA", "Alan") >= 0.9);
}

#[test]
fn unrelated_names_stay_below_threshold() {
    assert!(combined_similarity("Acme", "Zephyr") < 0.3);
    assert!(combined_similarity("Qonto", "Datawise") < 0.5);
}

#[test]
fn score_is_symmetric_and_deterministic() {
    let ab = combined_similarity("Acme SAS", "ACME");
    let ba = combined_similarity("ACME", "Acme SAS");
    assert_eq!(ab, ba);
    assert_eq!(ab, combined_similarity("Acme SAS", "ACME"));
}

#[test]
fn score_is_bounded() {
    for (a, b) in [
        ("Acme", "Acme"),
        ("Acme Ventures Capital Group SAS", "Acme"),
        ("a", "b"),
        ("Sociéte Générale", "Societe Generale"),
    ] {
        let s = combined_similarity(a, b);
        assert!((0.0..=1.0).contains(&s), "{a} / {b} -> {s}");
    }
}

#[test]
fn diacritics_do_not_split_identities() {
    assert!(combined_similarity("Sociéte Anonyme Réseau", "Societe Anonyme Reseau") >= 0.9);
}
