mod common;

use std::time::Duration;

use common::{closed_address, start_monitor};
use mecad::{MecaError, TelemetryChannel, TelemetryCodeTable, TelemetrySnapshot};
use semver::Version;

const PAUSE: Duration = Duration::from_millis(30);

fn channel(address: &str, version: Version) -> TelemetryChannel {
    TelemetryChannel::new(address, version).with_timeouts(
        Duration::from_millis(500),
        Duration::from_millis(500),
        Duration::from_millis(200),
    )
}

/// Poll until `done` holds for the snapshot or the stream ends
async fn poll_until(channel: &mut TelemetryChannel, done: impl Fn(&TelemetrySnapshot) -> bool) {
    for _ in 0..50 {
        if done(channel.snapshot()) {
            return;
        }
        if channel.poll_default().await.is_err() {
            break;
        }
    }
    assert!(done(channel.snapshot()), "condition not reached: {:?}", channel.snapshot());
}

#[tokio::test]
async fn test_first_read_carries_status() {
    let (address, _server) = start_monitor(
        vec![
            "[2007][1,0,0,0,0,1,1]\0[2079][1,1,0,0,0,0]\0",
            "[2300][unrelated]\0",
        ],
        PAUSE,
    )
    .await;
    let mut channel = channel(&address, Version::new(8, 1, 6));

    assert!(channel.connect().await);
    assert_eq!(channel.table(), TelemetryCodeTable::Streaming);
    assert_eq!(channel.snapshot().robot_status, vec![1, 0, 0, 0, 0, 1, 1]);
    assert_eq!(channel.snapshot().gripper_status, vec![1, 1, 0, 0, 0, 0]);

    // The unrelated code must not touch the status fields
    let _ = channel.poll_default().await;
    assert_eq!(channel.snapshot().robot_status, vec![1, 0, 0, 0, 0, 1, 1]);
}

#[tokio::test]
async fn test_frame_split_across_reads() {
    let (address, _server) = start_monitor(
        vec!["[2007][1,1,0,0,0,1,1]\0", "[2210][1234,1.5,2", ".5,3.5,4.5,5.5,6.5]\0[2211][190,0,308,0,90,0]\0"],
        PAUSE,
    )
    .await;
    let mut channel = channel(&address, Version::new(9, 0, 0));
    assert!(channel.connect().await);

    poll_until(&mut channel, |snapshot| !snapshot.cartesian.is_empty()).await;
    assert_eq!(channel.snapshot().joints, vec![1.5, 2.5, 3.5, 4.5, 5.5, 6.5]);
    assert_eq!(channel.snapshot().cartesian, vec![190.0, 0.0, 308.0, 0.0, 90.0, 0.0]);
}

#[tokio::test]
async fn test_legacy_firmware_uses_legacy_codes() {
    let (address, _server) = start_monitor(
        vec!["[2102][1,2,3,4,5,6]\0[2210][0,9,9,9,9,9,9]\0[2007][1,1,1,1,1,1,1]\0"],
        PAUSE,
    )
    .await;
    let mut channel = channel(&address, Version::new(7, 0, 6));

    assert!(channel.connect().await);
    assert_eq!(channel.table(), TelemetryCodeTable::Legacy);
    assert_eq!(channel.snapshot().joints, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert!(channel.snapshot().robot_status.is_empty());
}

#[tokio::test]
async fn test_stream_end_is_an_error() {
    let (address, server) = start_monitor(vec!["[2026][0,0,0,0,0,0]\0"], PAUSE).await;
    let mut channel = channel(&address, Version::new(8, 1, 6));
    assert!(channel.connect().await);
    server.await.unwrap();

    let mut result = Ok(0);
    for _ in 0..10 {
        result = channel.poll_default().await;
        if result.is_err() {
            break;
        }
    }
    assert!(matches!(result, Err(MecaError::Connection(_)) | Err(MecaError::Io(_))));
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn test_connect_fails_without_robot() {
    let mut channel = channel(&closed_address().await, Version::new(8, 1, 6));
    assert!(!channel.connect().await);
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn test_subscriber_publishes_updates() {
    let (address, _server) = start_monitor(
        vec![
            "[2007][1,1,0,0,0,1,1]\0",
            "[2026][10,20,30,40,50,60]\0",
        ],
        Duration::from_millis(100),
    )
    .await;
    let mut channel = channel(&address, Version::new(8, 1, 6));
    assert!(channel.connect().await);

    let mut subscriber = channel.into_subscriber();
    assert_eq!(subscriber.latest().robot_status, vec![1, 1, 0, 0, 0, 1, 1]);

    let update = tokio::time::timeout(Duration::from_secs(2), subscriber.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(update.joints, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
}
