//! Integration test: gated transfers against a local stub server.

mod common;

use common::stub_server::{StubResponse, StubServer};
use mdm_core::monitor::{DynamicConfig, ProgressMonitor, TransferLabels, TransferStatus};
use mdm_core::throttle::{FixedClock, SpeedThrottle, ThrottleWindow, THROTTLE_PAUSE};
use mdm_core::transfer::{temp_path, Transfer, TransferOptions, TransferRequest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn monitor() -> Arc<ProgressMonitor> {
    Arc::new(ProgressMonitor::new(
        DynamicConfig {
            max_parallel: 2,
            throttle_enabled: false,
            throttle_limit_mb: 0.0,
        },
        SpeedThrottle::default(),
        10,
    ))
}

fn request(url: String, dir: &std::path::Path, filename: &str) -> TransferRequest {
    TransferRequest {
        url,
        dest_dir: dir.join("Dune [1080p]"),
        filename: Some(filename.to_string()),
        movie: "Dune [1080p]".to_string(),
        labels: TransferLabels {
            host: "1fichier.com".into(),
            service: "RD".into(),
            format: "1080p".into(),
        },
    }
}

#[test]
fn downloads_file_and_records_history() {
    let body: Vec<u8> = (0u8..251).cycle().take(300 * 1024).collect();
    let server = StubServer::start();
    server.route("/files/Dune.part1.rar", StubResponse::file(body.clone()));

    let dir = tempdir().unwrap();
    let monitor = monitor();
    let transfer = Transfer::new(Arc::clone(&monitor), TransferOptions::default());
    let req = request(server.url("/files/Dune.part1.rar"), dir.path(), "Dune.part1.rar");

    let path = transfer.run(&req).expect("transfer succeeds");
    assert_eq!(path, dir.path().join("Dune [1080p]").join("Dune.part1.rar"));
    assert_eq!(std::fs::read(&path).unwrap(), body);
    assert!(!temp_path(&path).exists());

    let snap = monitor.snapshot();
    let state = &snap.downloads["Dune [1080p]"]["Dune.part1.rar"];
    assert_eq!(state.status, TransferStatus::Completed);
    assert_eq!(state.bytes_done, body.len() as u64);
    assert_eq!(snap.history.len(), 1);
    assert_eq!(snap.history[0].size_bytes, body.len() as u64);
    assert_eq!(snap.transfers_in_flight, 0);
}

#[test]
fn second_run_issues_no_requests() {
    let server = StubServer::start();
    server.route("/files/a.mkv", StubResponse::file(b"movie bytes".to_vec()));

    let dir = tempdir().unwrap();
    let transfer = Transfer::new(monitor(), TransferOptions::default());
    let req = request(server.url("/files/a.mkv"), dir.path(), "a.mkv");

    transfer.run(&req).expect("first run");
    assert_eq!(server.hits("/files/a.mkv"), 1);
    transfer.run(&req).expect("second run");
    assert_eq!(server.hits("/files/a.mkv"), 1);
}

#[test]
fn http_error_leaves_no_files() {
    let server = StubServer::start();
    server.route("/files/gone.rar", StubResponse::status(404));

    let dir = tempdir().unwrap();
    let monitor = monitor();
    let transfer = Transfer::new(Arc::clone(&monitor), TransferOptions::default());
    let req = request(server.url("/files/gone.rar"), dir.path(), "gone.rar");

    assert!(transfer.run(&req).is_none());
    let final_path = req.final_path();
    assert!(!final_path.exists());
    assert!(!temp_path(&final_path).exists());
    assert!(monitor.snapshot().downloads.is_empty());
    assert_eq!(monitor.gate().in_use(), 0);
}

#[test]
fn filename_falls_back_to_url_path() {
    let server = StubServer::start();
    server.route("/files/Some%20Movie.mp4", StubResponse::file(b"x".to_vec()));

    let dir = tempdir().unwrap();
    let transfer = Transfer::new(monitor(), TransferOptions::default());
    let mut req = request(server.url("/files/Some%20Movie.mp4"), dir.path(), "unused");
    req.filename = None;

    let path = transfer.run(&req).expect("transfer succeeds");
    assert_eq!(path.file_name().unwrap(), "Some Movie.mp4");
}

fn throttled_monitor(hour: u32) -> Arc<ProgressMonitor> {
    let clock = FixedClock::at(hour, 0).unwrap();
    Arc::new(ProgressMonitor::new(
        DynamicConfig {
            max_parallel: 2,
            throttle_enabled: true,
            throttle_limit_mb: 0.001,
        },
        SpeedThrottle::with_clock(ThrottleWindow::default(), Arc::new(clock)),
        10,
    ))
}

fn timed_download(monitor: Arc<ProgressMonitor>) -> Duration {
    let body: Vec<u8> = (0u8..=255).cycle().take(128 * 1024).collect();
    let server = StubServer::start();
    server.route("/files/big.rar", StubResponse::file(body.clone()));

    let dir = tempdir().unwrap();
    let transfer = Transfer::new(
        monitor,
        TransferOptions {
            chunk_size: 16 * 1024,
            ..TransferOptions::default()
        },
    );
    let req = request(server.url("/files/big.rar"), dir.path(), "big.rar");

    let started = Instant::now();
    let path = transfer.run(&req).expect("transfer succeeds");
    let elapsed = started.elapsed();
    assert_eq!(std::fs::read(path).unwrap(), body);
    elapsed
}

#[test]
fn throttle_slows_transfer_inside_window() {
    // 128 KiB in chunks of at most 16 KiB: every chunk after the first pauses.
    let elapsed = timed_download(throttled_monitor(10));
    assert!(
        elapsed >= THROTTLE_PAUSE * 5,
        "expected throttled transfer, took {:?}",
        elapsed
    );
}

#[test]
fn throttle_idle_outside_window() {
    let elapsed = timed_download(throttled_monitor(21));
    assert!(
        elapsed < THROTTLE_PAUSE * 4,
        "unthrottled transfer took {:?}",
        elapsed
    );
}

#[test]
fn concurrent_transfers_respect_gate() {
    let server = StubServer::start();
    for i in 0..4 {
        server.route(
            &format!("/files/slow{i}.rar"),
            StubResponse::file(vec![i as u8; 8 * 1024]).delayed(Duration::from_millis(150)),
        );
    }

    let dir = tempdir().unwrap();
    let monitor = Arc::new(ProgressMonitor::new(
        DynamicConfig {
            max_parallel: 1,
            throttle_enabled: false,
            throttle_limit_mb: 0.0,
        },
        SpeedThrottle::default(),
        10,
    ));
    let transfer = Transfer::new(Arc::clone(&monitor), TransferOptions::default());

    let done = AtomicBool::new(false);
    let peak_downloading = AtomicUsize::new(0);
    let peak_permits = AtomicUsize::new(0);
    thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::SeqCst) {
                peak_downloading.fetch_max(monitor.downloading_count(), Ordering::SeqCst);
                peak_permits.fetch_max(monitor.gate().in_use(), Ordering::SeqCst);
                thread::sleep(Duration::from_millis(2));
            }
        });

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let req = request(
                    server.url(&format!("/files/slow{i}.rar")),
                    dir.path(),
                    &format!("slow{i}.rar"),
                );
                let transfer = &transfer;
                s.spawn(move || transfer.run(&req))
            })
            .collect();
        for w in workers {
            assert!(w.join().unwrap().is_some());
        }
        done.store(true, Ordering::SeqCst);
    });

    assert_eq!(peak_downloading.load(Ordering::SeqCst), 1);
    assert_eq!(peak_permits.load(Ordering::SeqCst), 1);
    assert_eq!(monitor.snapshot().history.len(), 4);
    for i in 0..4 {
        assert!(dir.path().join("Dune [1080p]").join(format!("slow{i}.rar")).exists());
    }
}
