use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reforge_core::worker::{JobDescriptor, WorkerPool};

fn job(id: &str, kind: &str) -> JobDescriptor {
    JobDescriptor {
        job_id: id.to_string(),
        kind: kind.to_string(),
        payload: serde_json::json!({}),
    }
}

#[test]
fn pool_drains_all_jobs() {
    let processed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&processed);
    let pool = WorkerPool::new(3, Arc::new(move |_job: &JobDescriptor| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    for i in 0..20 {
        assert!(pool.submit(job(&format!("job-{i}"), "build")));
    }
    let outcomes = pool.shutdown();

    assert_eq!(processed.load(Ordering::SeqCst), 20);
    assert_eq!(outcomes.len(), 20);
    assert!(outcomes.iter().all(|o| o.status == "SUCCESS"));
}

#[test]
fn handler_errors_are_recorded_not_fatal() {
    let pool = WorkerPool::new(2, Arc::new(|job: &JobDescriptor| {
        if job.kind == "bad" {
            Err("input unreadable".to_string())
        } else {
            Ok(())
        }
    }));

    pool.submit(job("a", "good"));
    pool.submit(job("b", "bad"));
    pool.submit(job("c", "good"));
    let outcomes = pool.shutdown();

    assert_eq!(outcomes.len(), 3);
    let failed: Vec<_> = outcomes.iter().filter(|o| o.status == "FAILED").collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job_id, "b");
    assert_eq!(failed[0].detail.as_deref(), Some("input unreadable"));
}

#[test]
fn panics_do_not_poison_the_pool() {
    let pool = WorkerPool::new(1, Arc::new(|job: &JobDescriptor| {
        if job.kind == "explode" {
            panic!("stage blew up");
        }
        Ok(())
    }));

    pool.submit(job("first", "explode"));
    pool.submit(job("second", "fine"));
    let outcomes = pool.shutdown();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].status, "PANICKED");
    assert!(outcomes[0].detail.as_deref().unwrap_or("").contains("stage blew up"));
    assert_eq!(outcomes[1].status, "SUCCESS");
}

#[test]
fn submit_after_shutdown_is_rejected() {
    let pool = WorkerPool::new(1, Arc::new(|_job: &JobDescriptor| Ok(())));
    let _ = pool.submit(job("x", "k"));
    // Shutdown consumes the pool; a fresh default pool still accepts.
    let outcomes = pool.shutdown();
    assert_eq!(outcomes.len(), 1);
}
