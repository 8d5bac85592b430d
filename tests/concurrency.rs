//! Readers on one connection while a writer commits on another.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use kaizen::{NewKnowledge, ScopeName, SearchRequest, Store};
use tempfile::TempDir;

const WRITES: usize = 40;

#[test]
fn test_reader_sees_only_committed_states() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.db");

    let mut writer = Store::open(&path)?;
    writer.create_namespace("acme", "Acme")?;
    let backend = ScopeName::parse("acme:backend")?;
    writer.create_scope(&backend, "Backend", &[])?;

    let reader = writer.clone_connection()?;
    let done = Arc::new(AtomicBool::new(false));

    let reader_done = Arc::clone(&done);
    let reader_scope = backend.clone();
    let reader_thread = thread::spawn(move || -> anyhow::Result<Vec<usize>> {
        let request = SearchRequest::new(reader_scope, ["concurrency"]).with_limit(1000);
        let mut seen = Vec::new();
        while !reader_done.load(Ordering::SeqCst) {
            seen.push(reader.search(&request)?.len());
        }
        seen.push(reader.search(&request)?.len());
        Ok(seen)
    });

    // every write pairs a new entry with a conflict suppressing the previous one,
    // so a committed state always has exactly one visible entry
    let mut previous = None;
    for i in 0..WRITES {
        let id = writer.write_knowledge(NewKnowledge::new(
            backend.clone(),
            format!("Revision {}", i),
            "concurrency",
        ))?;
        if let Some(old) = previous {
            writer.resolve_conflict(id, &[old], None)?;
        }
        previous = Some(id);
    }
    done.store(true, Ordering::SeqCst);

    let seen = reader_thread
        .join()
        .map_err(|_| anyhow::anyhow!("reader thread panicked"))??;

    // between a write and its resolve two entries are visible; never more
    assert!(seen.iter().all(|&n| n <= 2), "reader saw {:?}", seen);
    assert_eq!(seen.last(), Some(&1));

    let stats = writer.stats()?;
    assert_eq!(stats.knowledge, WRITES);
    assert_eq!(stats.active_knowledge, 1);
    assert_eq!(stats.suppressed_knowledge, WRITES - 1);
    Ok(())
}

#[test]
fn test_two_writers_serialize() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.db");

    let first = Store::open(&path)?;
    let second = first.clone_connection()?;

    let handles: Vec<_> = [("alpha", first), ("beta", second)]
        .into_iter()
        .map(|(name, mut store)| {
            thread::spawn(move || -> anyhow::Result<()> {
                store.create_namespace(name, "")?;
                let scope = ScopeName::default_of(name);
                for i in 0..10 {
                    store.write_knowledge(NewKnowledge::new(
                        scope.clone(),
                        format!("{} fact {}", name, i),
                        "shared",
                    ))?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
    }

    let store = Store::open(&path)?;
    let stats = store.stats()?;
    assert_eq!(stats.namespaces, 3);
    assert_eq!(stats.knowledge, 20);
    assert_eq!(stats.active_knowledge, 20);
    Ok(())
}
