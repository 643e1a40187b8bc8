use filesame::duplicates::{EquivalenceFinder, FinderConfig, SizeIndex};
use filesame::scanner::{streaming_equal, FileFingerprint, NormalizationConfig};
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn fingerprint(dir: &TempDir, name: &str, content: &[u8], config: &NormalizationConfig) -> FileFingerprint {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    FileFingerprint::new(&path, config).unwrap()
}

/// Bytes drawn from a small alphabet so that whitespace, case and
/// collisions actually occur.
fn text() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop::sample::select(vec![b'a', b'A', b'b', b'B', b' ', b'\t', b'\n', b'\r', b'1']),
        0..64,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_fingerprint_determinism(content in prop::collection::vec(any::<u8>(), 0..4096), buffer in 1usize..300) {
        let dir = TempDir::new().unwrap();
        let config = NormalizationConfig::default().with_buffer_size(buffer);
        let first = fingerprint(&dir, "f", &content, &config);
        let second = FileFingerprint::new(first.path(), &config).unwrap();

        prop_assert_eq!(first.digest(), second.digest());
        prop_assert_eq!(first.fold_hash(), second.fold_hash());
    }

    #[test]
    fn test_buffer_size_does_not_change_digest(
        content in text(),
        small in 1usize..16,
        ignore_case in any::<bool>(),
        ignore_whitespace in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let base = NormalizationConfig::default()
            .with_ignore_case(ignore_case)
            .with_ignore_whitespace(ignore_whitespace);
        let a = fingerprint(&dir, "a", &content, &base.with_buffer_size(small));
        let b = FileFingerprint::new(a.path(), &base).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_ordering_is_consistent_with_equality(a in text(), b in text(), c in text()) {
        let dir = TempDir::new().unwrap();
        let config = NormalizationConfig::default();
        let fa = fingerprint(&dir, "a", &a, &config);
        let fb = fingerprint(&dir, "b", &b, &config);
        let fc = fingerprint(&dir, "c", &c, &config);

        prop_assert_eq!(fa.cmp(&fb), fb.cmp(&fa).reverse());
        prop_assert_eq!(fa.cmp(&fb) == Ordering::Equal, fa == fb);
        prop_assert_eq!(fa == fb, fa.digest() == fb.digest());
        if fa <= fb && fb <= fc {
            prop_assert!(fa <= fc);
        }
    }

    #[test]
    fn test_cap_equals_prefix(content in prop::collection::vec(any::<u8>(), 1..2048), cap in 1u64..512, buffer in 1usize..128) {
        let dir = TempDir::new().unwrap();
        let capped = NormalizationConfig::default().with_max_bytes(cap).with_buffer_size(buffer);
        let prefix_len = content.len().min(cap as usize);

        let whole = fingerprint(&dir, "whole", &content, &capped);
        let prefix = fingerprint(&dir, "prefix", &content[..prefix_len], &NormalizationConfig::default());
        prop_assert_eq!(whole, prefix);
    }

    #[test]
    fn test_fingerprint_agrees_with_streaming(
        a in text(),
        b in text(),
        ignore_case in any::<bool>(),
        ignore_whitespace in any::<bool>(),
        buffer in 1usize..8,
    ) {
        let dir = TempDir::new().unwrap();
        let config = NormalizationConfig::default()
            .with_ignore_case(ignore_case)
            .with_ignore_whitespace(ignore_whitespace)
            .with_buffer_size(buffer);
        let fa = fingerprint(&dir, "a", &a, &config);
        let fb = fingerprint(&dir, "b", &b, &config);

        let streamed = streaming_equal(fa.path(), fb.path(), &config).unwrap();
        prop_assert_eq!(fa == fb, streamed);
        prop_assert_eq!(streamed, streaming_equal(fb.path(), fa.path(), &config).unwrap());
    }

    #[test]
    fn test_size_index_invariants(sizes in prop::collection::vec(0u64..20, 0..40)) {
        let index = SizeIndex::from_sizes(
            sizes.iter().enumerate().map(|(i, &size)| (PathBuf::from(format!("/p/{i}")), size)),
        );
        let stats = index.stats();
        let buckets: Vec<_> = index.candidate_buckets().map(|(_, paths)| paths.len()).collect();
        let unique = index.unique_paths();

        prop_assert!(buckets.iter().all(|&len| len >= 2));
        prop_assert_eq!(buckets.iter().sum::<usize>() + unique.len(), sizes.len());
        prop_assert_eq!(stats.potential_duplicates, buckets.iter().sum::<usize>());
        prop_assert_eq!(stats.total_files, sizes.len());
    }

    #[test]
    fn test_every_file_lands_exactly_once(contents in prop::collection::vec(text(), 0..12), two_stage in any::<bool>()) {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.path().join(format!("f{i}"));
                fs::write(&path, content).unwrap();
                path
            })
            .collect();

        let mut config = FinderConfig::default().with_size_check(true);
        if two_stage {
            config = config
                .with_two_stage(true)
                .with_normalization(NormalizationConfig::default().with_max_bytes(3));
        }
        let (outcome, _) = EquivalenceFinder::new(config).find_equivalent(paths.clone()).unwrap();

        let mut seen = Vec::new();
        for class in &outcome.classes {
            seen.extend(class.paths().map(|p| p.to_path_buf()));
        }
        seen.extend(outcome.unique.iter().cloned());
        let unique: BTreeSet<_> = seen.iter().cloned().collect();
        prop_assert_eq!(seen.len(), paths.len());
        prop_assert_eq!(unique, paths.into_iter().collect::<BTreeSet<_>>());
    }
}
