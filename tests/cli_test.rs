//! Tests for the `hdfs-bridge` binary's argument handling and client commands

mod common;

use assert_cmd::Command;
use common::RunningServer;
use hdfs_bridge::protocol::ServerMode;
use predicates::prelude::*;
use std::time::Duration;

fn bridge() -> Command {
    Command::cargo_bin("hdfs-bridge").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    bridge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("blocks"));
}

#[test]
fn test_serve_requires_existing_root() {
    bridge()
        .args(["serve", "--root", "/definitely/not/a/dir", "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Namespace root must be an existing directory",
        ));
}

#[test]
fn test_quiet_and_verbose_conflict() {
    bridge()
        .args(["-q", "-v", "ls"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use both --quiet and --verbose"));
}

#[test]
fn test_negative_block_range_rejected() {
    bridge()
        .args(["blocks", "/f", "--start=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not be negative"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_put_cat_and_ls_against_running_server() {
    let _guard = common::test_timeout_guard(Duration::from_secs(60));
    let server = RunningServer::start(ServerMode::Threaded).await;
    let port = server.addr.port().to_string();

    let local = server.temp_dir.path().join("local.txt");
    std::fs::write(&local, b"from the command line\n").unwrap();
    let local = local.to_string_lossy().into_owned();

    let port_clone = port.clone();
    tokio::task::spawn_blocking(move || {
        bridge()
            .args(["put", "--port", &port_clone, &local, "/remote/copy.txt"])
            .assert()
            .success();

        bridge()
            .args(["cat", "--port", &port_clone, "/remote/copy.txt"])
            .assert()
            .success()
            .stdout("from the command line\n");

        bridge()
            .args(["ls", "--port", &port_clone, "/remote"])
            .assert()
            .success()
            .stdout(predicate::str::contains("hdfs://localhost:8020/remote/copy.txt"));

        bridge()
            .args(["cat", "--port", &port_clone, "/remote/missing.txt"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to open /remote/missing.txt"));
    })
    .await
    .unwrap();

    let (_temp_dir, stats) = server.stop().await;
    assert_eq!(stats.streams_created, 1);
    assert_eq!(stats.streams_opened, 1);
}
