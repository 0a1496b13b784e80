//! End-to-end access flows: keypad bytes in, door and LED frames out.
//!
//! Run with: cargo test --package latchkey-engine --test access_flow

use std::sync::Arc;
use std::time::Duration;

use latchkey_core::{CredentialRecord, UserId};
use latchkey_credentials::{CacheRefresher, CredentialCache, Verifier, encode_ssha};
use latchkey_directory::{DirectoryError, MockDirectory};
use latchkey_engine::{AccessConfig, AccessEngine, FeedbackConfig};
use latchkey_hardware::mock::{MockLink, MockLinkHandle};
use latchkey_hardware::{ChannelConfig, HardwareChannel, HardwareError, LedChannel};

struct Door {
    keypad: MockLinkHandle,
    directory: MockDirectory,
    cache: Arc<CredentialCache>,
    engine: AccessEngine<MockLink, MockDirectory>,
}

fn uid(s: &str) -> UserId {
    UserId::new(s).unwrap()
}

fn door(access: AccessConfig) -> Door {
    let (link, keypad) = MockLink::new();
    let channel = Arc::new(HardwareChannel::new(link, ChannelConfig::default()));
    let directory = MockDirectory::new();
    let cache = Arc::new(CredentialCache::new());
    let verifier = Verifier::new(Arc::new(directory.clone()), Arc::clone(&cache))
        .with_backup_secret(access.backup_secret.clone())
        .with_lookup_timeout(access.verify_timeout());
    let engine = AccessEngine::new(channel, verifier, access, FeedbackConfig::default());

    Door {
        keypad,
        directory,
        cache,
        engine,
    }
}

/// Queue `keys`, close the input and run the engine until it drains.
async fn run_keys(door: &mut Door, keys: &[u8]) {
    door.keypad.press(keys).unwrap();
    door.keypad.close_input();
    let err = door.engine.run().await;
    assert!(matches!(err, HardwareError::Disconnected { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_grant_with_fresh_directory_record() {
    let mut door = door(AccessConfig::default());
    door.directory.insert(uid("1234"), CredentialRecord::new("0000"));

    run_keys(&mut door, b"12340000A").await;

    assert_eq!(door.keypad.door_pulses(), 1);
    // Reset turns it off once; the grant turns it on then off.
    assert_eq!(
        door.keypad.led_history(LedChannel::Granted),
        vec![false, true, false]
    );
    assert_eq!(
        door.cache.get(&uid("1234")),
        Some(CredentialRecord::new("0000"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_user_is_denied() {
    let mut door = door(AccessConfig::default());

    run_keys(&mut door, b"56780000A").await;

    assert_eq!(door.keypad.door_pulses(), 0);
    let blinks = door
        .keypad
        .led_history(LedChannel::Denied)
        .into_iter()
        .filter(|on| *on)
        .count();
    assert_eq!(blinks, 3);
}

#[tokio::test(start_paused = true)]
async fn test_directory_outage_falls_back_to_cache() {
    let mut door = door(AccessConfig::default());
    door.cache.upsert(uid("1234"), encode_ssha("9999", b"\x01\x02\x03\x04"));
    door.directory.fail_with(DirectoryError::connection("connection refused"));

    run_keys(&mut door, b"12340000A12349999A").await;

    assert_eq!(door.keypad.door_pulses(), 1);
    assert!(door.cache.contains(&uid("1234")));
}

#[tokio::test(start_paused = true)]
async fn test_directory_removal_revokes_cached_access() {
    let mut door = door(AccessConfig::default());
    door.cache.upsert(uid("1234"), CredentialRecord::new("0000"));

    run_keys(&mut door, b"12340000A").await;

    assert_eq!(door.keypad.door_pulses(), 0);
    assert!(!door.cache.contains(&uid("1234")));
}

#[tokio::test(start_paused = true)]
async fn test_backup_secret_opens_for_unknown_user() {
    let mut door = door(AccessConfig {
        backup_secret: Some("424242".to_string()),
        ..AccessConfig::default()
    });

    run_keys(&mut door, b"0001424242A").await;

    assert_eq!(door.keypad.door_pulses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_directory_uses_cache_within_verify_timeout() {
    let mut door = door(AccessConfig {
        verify_timeout_ms: 200,
        ..AccessConfig::default()
    });
    door.directory.set_delay(Some(Duration::from_secs(30)));
    door.cache.upsert(uid("1234"), CredentialRecord::new("0000"));

    let start = tokio::time::Instant::now();
    run_keys(&mut door, b"12340000A").await;

    assert_eq!(door.keypad.door_pulses(), 1);
    assert!(start.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_retry() {
    let mut door = door(AccessConfig::default());
    door.directory.insert(uid("1234"), CredentialRecord::new("0000"));

    run_keys(&mut door, b"9999C12340000H").await;

    assert_eq!(door.keypad.door_pulses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresher_warms_cache_for_outage() {
    let mut door = door(AccessConfig::default());
    door.directory.insert(uid("4321"), CredentialRecord::new("1111"));

    let refresher = CacheRefresher::new(
        Arc::new(door.directory.clone()),
        Arc::clone(&door.cache),
        Duration::from_secs(300),
    );
    let task = refresher.spawn();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert!(door.cache.contains(&uid("4321")));

    door.directory.fail_with(DirectoryError::connection("network unreachable"));
    run_keys(&mut door, b"43211111A").await;

    assert_eq!(door.keypad.door_pulses(), 1);
    task.abort();
}

#[tokio::test(start_paused = true)]
async fn test_hardware_ack_loss_stops_engine() {
    let mut door = door(AccessConfig::default());
    door.keypad.set_acks(false);

    let err = door.engine.run().await;

    assert!(matches!(err, HardwareError::Timeout { .. }));
}
