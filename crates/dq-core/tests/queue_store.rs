//! QueueStore: durability, duplicate removal, rotation, and lock discipline.

mod common;

use dq_core::queue::QueueStore;
use tempfile::tempdir;

#[test]
fn missing_file_lists_empty() {
    let dir = tempdir().unwrap();
    assert!(common::queue(dir.path()).list().unwrap().is_empty());
}

#[test]
fn append_then_list_round_trip() {
    let dir = tempdir().unwrap();
    let q = common::queue(dir.path());
    q.append(["https://example.com/a", "https://example.com/b"])
        .unwrap();
    assert_eq!(
        q.list().unwrap(),
        vec!["https://example.com/a", "https://example.com/b"]
    );
}

#[test]
fn compare_and_remove_removes_every_occurrence() {
    let dir = tempdir().unwrap();
    let q = common::queue(dir.path());
    q.append(["a", "b", "a", "c"]).unwrap();
    let (seq, idx) = q.compare_and_remove("a", true).unwrap();
    assert_eq!(seq, vec!["b", "c"]);
    assert_eq!(idx, Some(0));
    assert_eq!(q.list().unwrap(), vec!["b", "c"]);
}

#[test]
fn resolve_failure_rotates_without_removing() {
    let dir = tempdir().unwrap();
    let q = common::queue(dir.path());
    q.append(["a", "b", "c"]).unwrap();
    let next = q.resolve("b", false).unwrap();
    assert_eq!(next.as_deref(), Some("c"));
    assert_eq!(q.list().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn resolve_success_removes_and_continues_at_old_index() {
    let dir = tempdir().unwrap();
    let q = common::queue(dir.path());
    q.append(["a", "b", "c"]).unwrap();
    let next = q.resolve("b", true).unwrap();
    assert_eq!(next.as_deref(), Some("c"));
    assert_eq!(q.list().unwrap(), vec!["a", "c"]);
}

#[test]
fn resolve_last_key_empties_queue() {
    let dir = tempdir().unwrap();
    let q = common::queue(dir.path());
    q.append(["only"]).unwrap();
    assert_eq!(q.resolve("only", true).unwrap(), None);
    assert!(q.list().unwrap().is_empty());
}

#[test]
fn concurrent_appends_are_never_torn() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let path = path.clone();
            std::thread::spawn(move || {
                let q = QueueStore::new(path.join("queue"));
                for i in 0..25 {
                    q.append([format!("https://example.com/{t}/{i}")]).unwrap();
                }
            })
        })
        .collect();

    // Sample snapshots while the writers run: every observed line must be a
    // complete entry, never a fragment of one.
    let reader = common::queue(&path);
    for _ in 0..200 {
        for key in reader.list().unwrap() {
            assert!(key.starts_with("https://example.com/"), "torn line: {key:?}");
        }
    }

    for w in writers {
        w.join().unwrap();
    }
    assert_eq!(reader.list().unwrap().len(), 100);
}

#[test]
fn concurrent_removals_and_appends_are_never_torn() {
    let dir = tempdir().unwrap();
    let path = dir.path().to_path_buf();

    let seeds: Vec<String> = (0..50).map(|i| format!("https://example.com/seed/{i}")).collect();
    common::queue(&path).append(&seeds).unwrap();

    let writers: Vec<_> = (0..2)
        .map(|t| {
            let path = path.clone();
            std::thread::spawn(move || {
                let q = QueueStore::new(path.join("queue"));
                for i in 0..25 {
                    q.append([format!("https://example.com/w{t}/{i}")]).unwrap();
                }
            })
        })
        .collect();

    // Full rewrites racing the appends: remove every seed, alternating
    // between the two locked mutation paths.
    let remover = {
        let path = path.clone();
        let seeds = seeds.clone();
        std::thread::spawn(move || {
            let q = QueueStore::new(path.join("queue"));
            for (i, seed) in seeds.iter().enumerate() {
                if i % 2 == 0 {
                    let (_, idx) = q.compare_and_remove(seed, true).unwrap();
                    assert_eq!(idx, Some(0), "seeds leave in order");
                } else {
                    q.resolve(seed, true).unwrap();
                }
            }
        })
    };

    let reader = common::queue(&path);
    for _ in 0..200 {
        for key in reader.list().unwrap() {
            assert!(key.starts_with("https://example.com/"), "torn line: {key:?}");
        }
    }

    for w in writers {
        w.join().unwrap();
    }
    remover.join().unwrap();

    let survivors = reader.list().unwrap();
    assert_eq!(survivors.len(), 50);
    assert!(survivors.iter().all(|k| k.contains("/w")));
}
