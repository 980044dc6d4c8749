use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;

use snowclock::refresher::{run_cycle, Cycle};
use snowclock::{
    CancellationToken, Fetch, FetchError, Refresher, RefresherSet, Schedule, SharedSlot, Update,
};

#[test]
fn failures_keep_the_last_value() {
    let slot = SharedSlot::new();
    let mut calls = 0;
    let mut fetcher = move || -> Result<Update<String>, FetchError> {
        calls += 1;
        if calls == 1 {
            Ok(Update::Fresh("first".to_string()))
        } else {
            Err(FetchError::Field("temperature"))
        }
    };

    assert_eq!(run_cycle("test", &mut fetcher, &slot), Cycle::Published(1));
    for _ in 0..5 {
        assert_eq!(run_cycle("test", &mut fetcher, &slot), Cycle::Failed);
    }
    assert_eq!(slot.snapshot().as_deref(), Some("first"));
    assert_eq!(slot.version(), 1);
}

#[test]
fn each_success_publishes_exactly_once() {
    let slot = SharedSlot::new();
    let mut outcomes = vec![
        Ok(Update::Fresh(1)),
        Ok(Update::Unchanged),
        Err(FetchError::EmptyFeed),
        Ok(Update::Pending),
        Ok(Update::Fresh(2)),
    ]
    .into_iter();
    let mut fetcher = move || -> Result<Update<i32>, FetchError> {
        outcomes.next().unwrap_or(Ok(Update::Unchanged))
    };

    let cycles: Vec<Cycle> = (0..5)
        .map(|_| run_cycle("test", &mut fetcher, &slot))
        .collect();
    assert_eq!(
        cycles,
        vec![
            Cycle::Published(1),
            Cycle::Unchanged,
            Cycle::Failed,
            Cycle::Pending,
            Cycle::Published(2),
        ]
    );
    assert_eq!(slot.version(), 2);
    assert_eq!(slot.snapshot(), Some(2));
}

#[test]
fn cancel_interrupts_the_sleep() {
    let token = CancellationToken::new();
    let slot = Arc::new(SharedSlot::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let refresher = Refresher::spawn(
        "sleepy",
        move || -> Result<Update<u32>, FetchError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Update::Fresh(7))
        },
        slot.clone(),
        Schedule::every(Duration::from_secs(3600)),
        token.clone(),
    )
    .unwrap();

    let start = Instant::now();
    while slot.is_empty() && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(slot.snapshot(), Some(7));

    let cancelled_at = Instant::now();
    token.cancel();
    refresher.join();
    assert!(cancelled_at.elapsed() < Duration::from_secs(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn cancel_during_initial_delay_skips_the_fetch() {
    let token = CancellationToken::new();
    let slot = Arc::new(SharedSlot::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let refresher = Refresher::spawn(
        "delayed",
        move || -> Result<Update<u32>, FetchError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Update::Fresh(1))
        },
        slot.clone(),
        Schedule::every(Duration::from_secs(1)).with_initial_delay(Duration::from_secs(3600)),
        token.clone(),
    )
    .unwrap();

    thread::sleep(Duration::from_millis(20));
    token.cancel();
    refresher.join();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(slot.is_empty());
}

#[test]
fn pending_retries_sooner_than_the_interval() {
    let token = CancellationToken::new();
    let slot = Arc::new(SharedSlot::new());
    let mut calls = 0;

    let mut set = RefresherSet::new(token.clone());
    set.spawn(
        "waiting",
        move || -> Result<Update<u32>, FetchError> {
            calls += 1;
            if calls < 3 {
                Ok(Update::Pending)
            } else {
                Ok(Update::Fresh(calls))
            }
        },
        slot.clone(),
        Schedule::every(Duration::from_secs(3600)).with_pending_retry(Duration::from_millis(10)),
    )
    .unwrap();

    let start = Instant::now();
    while slot.is_empty() && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(slot.snapshot(), Some(3));
    set.shutdown();
    assert!(token.is_cancelled());
}

#[test]
fn readers_never_see_a_torn_value() {
    struct Filler {
        next: u8,
    }

    impl Fetch for Filler {
        type Output = Vec<u8>;

        fn fetch(&mut self) -> Result<Update<Vec<u8>>, FetchError> {
            self.next = self.next.wrapping_add(1);
            let len = rand::thread_rng().gen_range(1..4096);
            Ok(Update::Fresh(vec![self.next; len]))
        }
    }

    let token = CancellationToken::new();
    let slot = Arc::new(SharedSlot::new());
    let mut set = RefresherSet::new(token.clone());
    for name in ["filler-a", "filler-b"] {
        set.spawn(
            name,
            Filler { next: 0 },
            slot.clone(),
            Schedule::every(Duration::from_micros(50)),
        )
        .unwrap();
    }

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let slot = slot.clone();
            thread::spawn(move || {
                let mut seen = 0;
                let mut reads = 0;
                let start = Instant::now();
                while start.elapsed() < Duration::from_millis(300) {
                    if let Some(value) = slot.read_newer(&mut seen) {
                        assert!(value.iter().all(|&byte| byte == value[0]));
                        reads += 1;
                    }
                    if rand::thread_rng().gen_bool(0.5) {
                        thread::yield_now();
                    }
                }
                reads
            })
        })
        .collect();

    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    drop(set);
    assert!(token.is_cancelled());
}
