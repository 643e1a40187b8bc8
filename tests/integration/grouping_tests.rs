use filesame::duplicates::{Backend, EquivalenceFinder, FinderConfig, FinderError};
use filesame::scanner::{BufferSource, HeapBuffers, NormalizationConfig, ScratchBuffer};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Records how many buffers were leased, which equals the number of
/// files opened for fingerprinting.
#[derive(Default)]
struct LeaseLog {
    heap: HeapBuffers,
    leases: RefCell<usize>,
}

impl BufferSource for LeaseLog {
    fn acquire(&self, requested: usize) -> Option<ScratchBuffer<'_>> {
        *self.leases.borrow_mut() += 1;
        let buffer = self.heap.acquire(requested)?;
        Some(ScratchBuffer::owned(self, buffer.to_vec()))
    }
}

fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn members(classes: &[filesame::duplicates::EquivalenceClass]) -> BTreeSet<BTreeSet<PathBuf>> {
    classes
        .iter()
        .filter(|class| class.has_duplicates())
        .map(|class| class.paths().map(Path::to_path_buf).collect())
        .collect()
}

#[test]
fn test_only_shared_lengths_are_opened() {
    let dir = tempdir().unwrap();
    let paths = vec![
        write(&dir, "a", b"0123456789"),
        write(&dir, "b", b"abcdefghij"),
        write(&dir, "c", b"01234567890123456789"),
        write(&dir, "d", b"0123456789"),
        write(&dir, "e", b"012345678901234567890123456789"),
    ];

    let log = Rc::new(LeaseLog::default());
    let config = FinderConfig::default()
        .with_size_check(true)
        .with_buffer_source(log.clone());
    let (outcome, summary) = EquivalenceFinder::new(config)
        .find_equivalent(paths.clone())
        .unwrap();

    assert_eq!(*log.leases.borrow(), 3);
    assert_eq!(summary.fingerprinted, 3);
    assert_eq!(outcome.unique, vec![paths[2].clone(), paths[4].clone()]);

    let dup: Vec<_> = outcome.duplicate_classes().collect();
    assert_eq!(dup.len(), 1);
    assert_eq!(dup[0].head.path(), paths[0].as_path());
    assert_eq!(dup[0].members, vec![paths[3].clone()]);
}

#[test]
fn test_distinct_lengths_open_nothing() {
    let dir = tempdir().unwrap();
    let paths: Vec<PathBuf> = (1..=6)
        .map(|n| write(&dir, &format!("f{n}"), &vec![b'x'; n]))
        .collect();

    let log = Rc::new(LeaseLog::default());
    let config = FinderConfig::default()
        .with_size_check(true)
        .with_buffer_source(log.clone());
    let (outcome, _) = EquivalenceFinder::new(config).find_equivalent(paths).unwrap();

    assert_eq!(*log.leases.borrow(), 0);
    assert!(outcome.classes.is_empty());
    assert_eq!(outcome.unique.len(), 6);
}

#[test]
fn test_whitespace_mode_ignores_lengths() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"int main() { return 0; }");
    let b = write(&dir, "b", b"int main(){return 0;}\n");

    let config = FinderConfig::default()
        .with_size_check(true)
        .with_normalization(NormalizationConfig::default().with_ignore_whitespace(true));
    assert!(!config.size_check_active());

    let (outcome, summary) = EquivalenceFinder::new(config)
        .find_equivalent(vec![a.clone(), b.clone()])
        .unwrap();
    assert!(summary.size_stats.is_none());
    assert_eq!(
        members(&outcome.classes),
        BTreeSet::from([BTreeSet::from([a, b])])
    );
}

#[test]
fn test_two_stage_equals_full_pass() {
    let dir = tempdir().unwrap();
    let header = vec![b'#'; 64];
    let mut paths = Vec::new();
    for i in 0..10 {
        let mut content = header.clone();
        content.extend_from_slice(format!("tail-{}", i % 3).as_bytes());
        paths.push(write(&dir, &format!("f{i}"), &content));
    }

    let (full, _) = EquivalenceFinder::new(FinderConfig::default().with_size_check(true))
        .find_equivalent(paths.clone())
        .unwrap();

    for backend in [Backend::Ordered, Backend::Hashed] {
        let config = FinderConfig::default()
            .with_size_check(true)
            .with_two_stage(true)
            .with_backend(backend)
            .with_normalization(NormalizationConfig::default().with_max_bytes(16));
        let (staged, summary) = EquivalenceFinder::new(config)
            .find_equivalent(paths.clone())
            .unwrap();

        assert_eq!(members(&staged.classes), members(&full.classes), "{backend}");
        assert_eq!(summary.duplicate_classes, 3);
        assert_eq!(summary.refined, 10);
    }
}

#[test]
fn test_refine_failure_skips_bucket() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"same-prefix-1");
    let b = write(&dir, "b", b"same-prefix-1");
    let c = write(&dir, "c", b"other");

    // Memory runs out after the cheap pass, so the bucket cannot be refined.
    struct SecondPassFails {
        heap: HeapBuffers,
        leases: RefCell<usize>,
    }
    impl BufferSource for SecondPassFails {
        fn acquire(&self, requested: usize) -> Option<ScratchBuffer<'_>> {
            *self.leases.borrow_mut() += 1;
            if *self.leases.borrow() > 2 {
                return None;
            }
            let buffer = self.heap.acquire(requested)?;
            Some(ScratchBuffer::owned(self, buffer.to_vec()))
        }
    }

    let source = Rc::new(SecondPassFails {
        heap: HeapBuffers::new(),
        leases: RefCell::new(0),
    });
    let config = FinderConfig::default()
        .with_size_check(true)
        .with_two_stage(true)
        .with_normalization(NormalizationConfig::default().with_max_bytes(4))
        .with_buffer_source(source);
    let (outcome, summary) = EquivalenceFinder::new(config)
        .find_equivalent(vec![a, b, c.clone()])
        .unwrap();

    assert!(outcome.classes.is_empty());
    assert_eq!(outcome.unique, vec![c]);
    assert_eq!(summary.skipped_files, 1);
}

#[test]
fn test_interrupted_before_start() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"x");
    let config = FinderConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
    let result = EquivalenceFinder::new(config).find_equivalent(vec![a]);
    assert!(matches!(result, Err(FinderError::Interrupted)));
}

#[test]
fn test_duplicate_input_paths_group_together() {
    let dir = tempdir().unwrap();
    let a = write(&dir, "a", b"repeat");
    let (outcome, _) = EquivalenceFinder::new(FinderConfig::default().with_size_check(true))
        .find_equivalent(vec![a.clone(), a.clone()])
        .unwrap();
    assert_eq!(outcome.classes.len(), 1);
    assert_eq!(outcome.classes[0].members, vec![a]);
}
