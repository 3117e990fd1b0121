// Scheduler driving real cycles

use crate::common::Fixture;
use foldersync::sync::{
    stop_channel, Scheduler, StopSignal, SyncEngine, SyncLogger, SyncRecord,
};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_cycles_pick_up_source_changes() {
    let fx = Fixture::new();
    fx.write_source("a.txt", b"one");
    let (engine, _rx) = fx.engine(fx.config().with_interval(Duration::from_millis(200)));
    let scheduler = Scheduler::new(engine);
    let (handle, signal) = stop_channel();

    let source = fx.source.clone();
    let replica = fx.replica.clone();
    let driver = tokio::spawn(async move {
        // First cycle runs immediately.
        for _ in 0..50 {
            if replica.join("a.txt").exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        fs::write(source.join("b.txt"), b"two").unwrap();
        for _ in 0..100 {
            if replica.join("b.txt").exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.stop();
    });

    let report = tokio::time::timeout(Duration::from_secs(30), scheduler.run(signal))
        .await
        .unwrap();
    driver.await.unwrap();

    assert!(report.cycles >= 2);
    assert_eq!(fs::read(fx.replica.join("b.txt")).unwrap(), b"two");
}

/// Records when each record arrives and stalls the cycle a little.
#[derive(Default)]
struct SlowLogger {
    seen: Mutex<Vec<(u64, Instant)>>,
}

impl SyncLogger for SlowLogger {
    fn log(&self, record: &SyncRecord) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((record.cycle, Instant::now()));
        }
        std::thread::sleep(Duration::from_millis(15));
    }
}

#[tokio::test]
async fn test_cycles_do_not_overlap() {
    let fx = Fixture::new();
    for i in 0..6 {
        fx.write_source(&format!("dir{}/f{}.txt", i % 2, i), format!("{}", i).as_bytes());
    }
    fx.write_source("tick.txt", b"0");

    let logger = Arc::new(SlowLogger::default());
    let config = fx.config().with_interval(Duration::from_millis(1));
    let scheduler = Scheduler::new(SyncEngine::new(config, logger.clone())).with_max_cycles(4);

    // Keep changing the source so every cycle has something to apply.
    let tick = fx.source.join("tick.txt");
    let writer = tokio::spawn(async move {
        for n in 1u64.. {
            fs::write(&tick, n.to_string().repeat(1 + (n % 7) as usize)).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let report = tokio::time::timeout(Duration::from_secs(30), scheduler.run(StopSignal::never()))
        .await
        .unwrap();
    writer.abort();
    assert_eq!(report.cycles, 4);

    let seen = logger.seen.lock().unwrap().clone();
    assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    for cycle in 2..=4u64 {
        let last_prev = seen.iter().filter(|(c, _)| *c == cycle - 1).map(|(_, t)| *t).max();
        let first = seen.iter().filter(|(c, _)| *c == cycle).map(|(_, t)| *t).min();
        let (last_prev, first) = (last_prev.unwrap(), first.unwrap());
        // The previous cycle's last record stalls for 15 ms before the cycle can end.
        assert!(first >= last_prev + Duration::from_millis(15), "cycle {} overlapped", cycle);
    }
}

#[tokio::test]
async fn test_interval_spaces_cycle_starts() {
    let fx = Fixture::new();
    fx.write_source("a.txt", b"a");
    let interval = Duration::from_millis(150);
    let (engine, _rx) = fx.engine(fx.config().with_interval(interval));
    let scheduler = Scheduler::new(engine).with_max_cycles(3);

    let started = tokio::time::Instant::now();
    let report = scheduler.run(StopSignal::never()).await;

    assert_eq!(report.cycles, 3);
    assert!(started.elapsed() >= interval * 2);
}

#[tokio::test]
async fn test_unclean_cycles_are_counted() {
    let fx = Fixture::new();
    fs::remove_dir(&fx.source).unwrap();
    let (engine, _rx) = fx.engine(fx.config().with_interval(Duration::from_millis(1)));
    let scheduler = Scheduler::new(engine).with_max_cycles(2);

    let report = scheduler.run(StopSignal::never()).await;

    assert_eq!(report.cycles, 2);
    assert_eq!(report.unclean_cycles, 2);
    assert!(report.last.unwrap().aborted);
}
