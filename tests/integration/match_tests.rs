use filesame::duplicates::{find_matches, FinderError, MatchConfig};
use filesame::scanner::NormalizationConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_match_ignoring_case_and_whitespace() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref.c", b"int Main(void) {\n  return 0;\n}\n");
    let same = write(&dir, "same.c", b"int main(void){return 0;}");
    let differs = write(&dir, "differs.c", b"int main(void){return 1;}");

    let config = MatchConfig::default().with_size_check(true).with_normalization(
        NormalizationConfig::default()
            .with_ignore_case(true)
            .with_ignore_whitespace(true)
            .with_buffer_size(4),
    );
    let (matches, summary) =
        find_matches(&reference, vec![differs, same.clone()], &config).unwrap();

    assert_eq!(matches, vec![same]);
    assert_eq!(summary.compared, 2);
    assert_eq!(summary.size_rejected, 0);
}

#[test]
fn test_match_prefix_with_cap() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref", b"HEADER:v1");
    let longer = write(&dir, "longer", b"HEADER:v2 with more");

    let config = MatchConfig::default()
        .with_size_check(true)
        .with_normalization(NormalizationConfig::default().with_max_bytes(7));
    let (matches, summary) = find_matches(&reference, vec![longer.clone()], &config).unwrap();
    assert_eq!(matches, vec![longer]);
    assert_eq!(summary.size_rejected, 0);
}

#[test]
fn test_size_check_rejects_without_reading() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref", b"abc");
    let longer = write(&dir, "longer", b"abcd");

    let config = MatchConfig::default().with_size_check(true);
    let (matches, summary) = find_matches(&reference, vec![longer], &config).unwrap();
    assert!(matches.is_empty());
    assert_eq!(summary.size_rejected, 1);
    assert_eq!(summary.compared, 0);
}

#[test]
fn test_unreadable_reference_with_size_check() {
    let dir = tempdir().unwrap();
    let candidate = write(&dir, "cand", b"x");
    let result = find_matches(
        &dir.path().join("gone"),
        vec![candidate],
        &MatchConfig::default().with_size_check(true),
    );
    assert!(matches!(result, Err(FinderError::Reference { .. })));
}

#[test]
fn test_empty_candidate_list() {
    let dir = tempdir().unwrap();
    let reference = write(&dir, "ref", b"x");
    let (matches, summary) =
        find_matches(&reference, Vec::new(), &MatchConfig::default()).unwrap();
    assert!(matches.is_empty());
    assert_eq!(summary.candidates, 0);
}
