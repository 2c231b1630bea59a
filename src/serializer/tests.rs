//! Serializer Module Tests
//!
//! Drives the serializer loop against a scripted store whose outcome is decided per call,
//! so dedup, buffering and retry can be checked without randomness.
//!
//! ## Test Scopes
//! - **Dedup**: stale and equal-timestamp reports never reach the store.
//! - **Write-behind**: failed writes are buffered and retried on the tick or on `flush`.
//! - **Independence**: a container that keeps failing does not hold back others.
//! - **Handoff**: `submit` errors when the loop is gone or the intake stays full, and an
//!   abandoned `submit` drops its report.

#[cfg(test)]
mod tests {
    use crate::serializer::{
        SerializerConfig, SerializerError, SerializerHandle, SerializerState, UpdateSerializer,
    };
    use crate::status::types::ContainerReport;
    use crate::storage::StatusStore;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;

    const RETRY: Duration = Duration::from_secs(3);

    /// Store double: pops one scripted outcome per call (success once the script runs out),
    /// and always fails keys listed in `failing_keys`.
    #[derive(Default)]
    struct ScriptedStore {
        outcomes: Mutex<VecDeque<bool>>,
        failing_keys: Mutex<HashSet<String>>,
        calls: Mutex<Vec<ContainerReport>>,
    }

    impl ScriptedStore {
        fn with_outcomes(outcomes: &[bool]) -> Arc<Self> {
            let store = Self::default();
            store.outcomes.lock().unwrap().extend(outcomes.iter().copied());
            Arc::new(store)
        }

        fn failing_key(&self, key: &str) {
            self.failing_keys.lock().unwrap().insert(key.to_string());
        }

        fn recover_key(&self, key: &str) {
            self.failing_keys.lock().unwrap().remove(key);
        }

        fn calls(&self) -> Vec<ContainerReport> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, key: &str) -> Vec<ContainerReport> {
            self.calls()
                .into_iter()
                .filter(|report| report.container_id == key)
                .collect()
        }
    }

    #[async_trait]
    impl StatusStore for ScriptedStore {
        async fn put(&self, key: &str, report: &ContainerReport) -> Result<()> {
            self.calls.lock().unwrap().push(report.clone());

            if self.failing_keys.lock().unwrap().contains(key) {
                return Err(anyhow::anyhow!("store down for {}", key));
            }
            match self.outcomes.lock().unwrap().pop_front() {
                Some(false) => Err(anyhow::anyhow!("scripted failure")),
                _ => Ok(()),
            }
        }
    }

    struct Running {
        handle: SerializerHandle,
        stop: oneshot::Sender<()>,
        task: JoinHandle<SerializerState>,
    }

    impl Running {
        async fn shutdown(self) -> SerializerState {
            let _ = self.stop.send(());
            self.task.await.unwrap()
        }
    }

    fn spawn(store: Arc<ScriptedStore>) -> Running {
        spawn_with(
            store,
            SerializerConfig {
                retry_interval: RETRY,
                ..SerializerConfig::default()
            },
        )
    }

    fn spawn_with(store: Arc<ScriptedStore>, config: SerializerConfig) -> Running {
        let (serializer, handle) = UpdateSerializer::new(store, config);
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(serializer.run(async {
            let _ = stopped.await;
        }));
        Running { handle, stop, task }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn report(container: &str, secs: i64, status: &str) -> ContainerReport {
        ContainerReport {
            message_id: format!("{}-{}-{}", container, secs, status),
            container_id: container.to_string(),
            status: status.to_string(),
            observed_at: at(secs),
        }
    }

    // ============================================================
    // DEDUP
    // ============================================================

    #[tokio::test]
    async fn test_older_report_is_discarded_without_store_call() {
        // ARRANGE
        let store = ScriptedStore::with_outcomes(&[]);
        let running = spawn(store.clone());

        // ACT
        running.handle.submit(report("E1", 1, "starting")).await.unwrap();
        running.handle.submit(report("E1", 0, "starting")).await.unwrap();
        let stats = running.handle.stats().await.unwrap();

        // ASSERT
        assert_eq!(store.calls().len(), 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.discarded, 1);

        let view = running.handle.lookup("E1").await.unwrap();
        assert_eq!(view.committed, Some(report("E1", 1, "starting")));
        assert_eq!(view.pending, None);

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_equal_timestamp_is_written_once() {
        let store = ScriptedStore::with_outcomes(&[]);
        let running = spawn(store.clone());

        running.handle.submit(report("E1", 5, "running")).await.unwrap();
        running.handle.submit(report("E1", 5, "exited")).await.unwrap();
        running.handle.stats().await.unwrap();

        let calls = store.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, "running");

        let state = running.shutdown().await;
        assert_eq!(state.committed["E1"].status, "running");
    }

    #[tokio::test]
    async fn test_committed_time_tracks_maximum_accepted() {
        let store = ScriptedStore::with_outcomes(&[]);
        let running = spawn(store.clone());

        for secs in [3, 1, 7, 2, 7, 5, 9, 4] {
            running
                .handle
                .submit(report("E1", secs, &format!("s{}", secs)))
                .await
                .unwrap();
        }
        running.handle.stats().await.unwrap();

        let written: Vec<i64> = store
            .calls()
            .iter()
            .map(|r| r.observed_at.timestamp() - 1_700_000_000)
            .collect();
        assert_eq!(written, vec![3, 7, 9]);

        let state = running.shutdown().await;
        assert_eq!(state.committed["E1"].observed_at, at(9));
        assert_eq!(state.stats.discarded, 5);
    }

    #[tokio::test]
    async fn test_report_older_than_pending_is_not_written() {
        // t=5 fails and is buffered; t=3 is newer than nothing committed but older than pending.
        let store = ScriptedStore::with_outcomes(&[false]);
        let running = spawn(store.clone());

        running.handle.submit(report("E1", 5, "new")).await.unwrap();
        running.handle.submit(report("E1", 3, "old")).await.unwrap();
        let stats = running.handle.stats().await.unwrap();

        assert_eq!(store.calls().len(), 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.discarded, 1);

        let view = running.handle.lookup("E1").await.unwrap();
        assert_eq!(view.pending, Some(report("E1", 5, "new")));

        running.shutdown().await;
    }

    // ============================================================
    // WRITE-BEHIND
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_is_retried_on_tick() {
        // ARRANGE: first put fails, the retry succeeds
        let store = ScriptedStore::with_outcomes(&[false, true]);
        let running = spawn(store.clone());

        // ACT
        running.handle.submit(report("E1", 1, "x")).await.unwrap();
        let before = running.handle.lookup("E1").await.unwrap();

        tokio::time::sleep(RETRY + Duration::from_millis(10)).await;
        let after = running.handle.lookup("E1").await.unwrap();

        // ASSERT
        assert_eq!(before.pending, Some(report("E1", 1, "x")));
        assert_eq!(before.committed, None);

        assert_eq!(after.pending, None);
        assert_eq!(after.committed, Some(report("E1", 1, "x")));
        assert_eq!(store.calls().len(), 2);

        running.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_retries_every_tick() {
        let store = ScriptedStore::with_outcomes(&[]);
        store.failing_key("E1");
        let running = spawn(store.clone());

        running.handle.submit(report("E1", 1, "x")).await.unwrap();
        running.handle.stats().await.unwrap();

        tokio::time::sleep(RETRY * 3 + Duration::from_millis(10)).await;
        let stats = running.handle.stats().await.unwrap();

        // One initial attempt plus one per tick, no backoff.
        assert_eq!(store.calls_for("E1").len(), 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.write_failures, 4);

        store.recover_key("E1");
        tokio::time::sleep(RETRY).await;
        let stats = running.handle.stats().await.unwrap();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.committed, 1);

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_newer_failed_report_supersedes_pending() {
        // ARRANGE: both direct writes fail, the flush succeeds
        let store = ScriptedStore::with_outcomes(&[false, false, true]);
        let running = spawn(store.clone());

        // ACT
        running.handle.submit(report("E1", 1, "x")).await.unwrap();
        running.handle.submit(report("E1", 2, "y")).await.unwrap();
        let view = running.handle.lookup("E1").await.unwrap();
        running.handle.flush().await.unwrap();
        running.handle.stats().await.unwrap();
        let state = running.shutdown().await;

        // ASSERT
        assert_eq!(view.pending, Some(report("E1", 2, "y")));

        let calls = store.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], report("E1", 2, "y"));
        assert!(calls.iter().filter(|r| r.status == "x").count() == 1);

        assert_eq!(state.committed["E1"], report("E1", 2, "y"));
        assert!(state.pending.is_empty());
    }

    #[tokio::test]
    async fn test_successful_newer_write_clears_pending() {
        let store = ScriptedStore::with_outcomes(&[false, true]);
        let running = spawn(store.clone());

        running.handle.submit(report("E1", 1, "x")).await.unwrap();
        running.handle.submit(report("E1", 2, "y")).await.unwrap();
        let stats = running.handle.stats().await.unwrap();

        assert_eq!(stats.pending, 0);
        assert_eq!(stats.committed, 1);

        // Nothing left to retry: a flush must not touch the store.
        running.handle.flush().await.unwrap();
        running.handle.stats().await.unwrap();
        assert_eq!(store.calls().len(), 2);

        running.shutdown().await;
    }

    // ============================================================
    // INDEPENDENCE & CONCURRENCY
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_failing_container_does_not_block_others() {
        let store = ScriptedStore::with_outcomes(&[]);
        store.failing_key("A");
        let running = spawn(store.clone());

        running.handle.submit(report("A", 1, "down")).await.unwrap();
        for secs in 1..=5 {
            running.handle.submit(report("B", secs, "up")).await.unwrap();
        }
        tokio::time::sleep(RETRY + Duration::from_millis(10)).await;
        running.handle.submit(report("B", 6, "up")).await.unwrap();

        let a = running.handle.lookup("A").await.unwrap();
        let b = running.handle.lookup("B").await.unwrap();

        assert!(a.committed.is_none());
        assert!(a.pending.is_some());
        assert_eq!(b.committed.map(|r| r.observed_at), Some(at(6)));
        assert!(b.pending.is_none());

        running.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submitters_converge_to_latest_per_container() {
        let store = ScriptedStore::with_outcomes(&[]);
        let running = spawn(store.clone());

        let mut producers = Vec::new();
        for producer in 0..8i64 {
            let handle = running.handle.clone();
            producers.push(tokio::spawn(async move {
                for secs in 0..50i64 {
                    let container = format!("C{}", (secs + producer) % 4);
                    handle
                        .submit(report(&container, secs * 8 + producer, "tick"))
                        .await
                        .unwrap();
                }
            }));
        }
        for producer in producers {
            producer.await.unwrap();
        }
        let stats = running.handle.stats().await.unwrap();
        let state = running.shutdown().await;

        assert_eq!(stats.committed, 4);
        assert_eq!(stats.accepted + stats.discarded, 400);
        for (container, committed) in &state.committed {
            let newest = store
                .calls_for(container)
                .into_iter()
                .map(|r| r.observed_at)
                .max()
                .unwrap();
            assert_eq!(committed.observed_at, newest);
        }
        // Writes for one container never go backwards in time.
        for container in state.committed.keys() {
            let times: Vec<_> = store
                .calls_for(container)
                .into_iter()
                .map(|r| r.observed_at)
                .collect();
            assert!(times.windows(2).all(|w| w[0] < w[1]));
        }
    }

    // ============================================================
    // HANDOFF & SHUTDOWN
    // ============================================================

    #[tokio::test]
    async fn test_submit_after_shutdown_reports_stopped() {
        let store = ScriptedStore::with_outcomes(&[]);
        let running = spawn(store.clone());
        let handle = running.handle.clone();

        running.shutdown().await;

        assert!(handle.is_closed());
        assert_eq!(
            handle.submit(report("E1", 1, "x")).await,
            Err(SerializerError::Stopped)
        );
        assert_eq!(handle.stats().await, Err(SerializerError::Stopped));
        assert!(store.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_cancelled_when_intake_stays_full() {
        // The loop is never run, so the single intake slot never drains.
        let store = ScriptedStore::with_outcomes(&[]);
        let (_serializer, handle) = UpdateSerializer::new(
            store.clone(),
            SerializerConfig {
                retry_interval: RETRY,
                intake_capacity: 1,
                handoff_timeout: Duration::from_millis(200),
            },
        );

        assert_eq!(handle.submit(report("E1", 1, "x")).await, Ok(()));
        assert_eq!(
            handle.submit(report("E1", 2, "y")).await,
            Err(SerializerError::Cancelled)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_never_reaches_store() {
        // ARRANGE: one intake slot, filled before the loop runs
        let store = ScriptedStore::with_outcomes(&[]);
        let (serializer, handle) = UpdateSerializer::new(
            store.clone(),
            SerializerConfig {
                retry_interval: RETRY,
                intake_capacity: 1,
                ..SerializerConfig::default()
            },
        );
        handle.submit(report("E1", 1, "queued")).await.unwrap();

        // ACT: the caller gives up while waiting for room, dropping the submit future
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            handle.submit(report("E1", 2, "abandoned")),
        )
        .await;

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(serializer.run(async {
            let _ = stopped.await;
        }));
        let stats = handle.stats().await.unwrap();
        let _ = stop.send(());
        let state = task.await.unwrap();

        // ASSERT
        assert!(abandoned.is_err());
        assert_eq!(store.calls(), vec![report("E1", 1, "queued")]);
        assert_eq!(stats.accepted, 1);
        assert_eq!(state.committed["E1"], report("E1", 1, "queued"));
    }

    #[tokio::test]
    async fn test_shutdown_returns_unflushed_pending() {
        let store = ScriptedStore::with_outcomes(&[false]);
        let running = spawn(store.clone());

        running.handle.submit(report("E1", 1, "x")).await.unwrap();
        running.handle.submit(report("E2", 1, "y")).await.unwrap();
        running.handle.stats().await.unwrap();

        let state = running.shutdown().await;

        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending["E1"], report("E1", 1, "x"));
        assert_eq!(state.committed.len(), 1);
        assert_eq!(state.stats.pending, 1);
        assert_eq!(state.stats.committed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_still_retried_after_handles_dropped() {
        let store = ScriptedStore::with_outcomes(&[false, true]);
        let Running { handle, stop, task } = spawn(store.clone());

        handle.submit(report("E1", 1, "x")).await.unwrap();
        handle.stats().await.unwrap();
        drop(handle);

        tokio::time::sleep(RETRY + Duration::from_millis(10)).await;
        let _ = stop.send(());
        let state = task.await.unwrap();

        assert!(state.pending.is_empty());
        assert_eq!(state.committed["E1"], report("E1", 1, "x"));
    }
}
