//! Timer-driven behaviour under a paused tokio clock.

mod common;

use common::{advance, advance_millis, quiet_config, wall, CountingGenerator, Harness};
use nudge_core::{RejectReason, SendOutcome, TriggerMode};

#[tokio::test(start_paused = true)]
async fn inactivity_is_debounced_by_user_input() {
    let mut config = quiet_config();
    config.inactivity_mode.enabled = true;
    config.inactivity_mode.idle_threshold_seconds = 60;
    config.only_when_idle = true;
    config.min_message_gap_seconds = 5;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();

    // inputs at 30, 60 and 89 are each closer than the threshold
    advance(30).await;
    h.scheduler.record_user_input().unwrap();
    advance(30).await;
    h.scheduler.record_user_input().unwrap();
    advance(29).await;
    h.scheduler.record_user_input().unwrap();

    advance(59).await;
    assert!(h.sent().is_empty(), "no fire while input keeps arriving");
    assert_eq!(h.fired(TriggerMode::Inactivity), 0);

    advance(2).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(h.offset_secs(&sent[0]), 149, "one threshold after the last input");
}

#[tokio::test(start_paused = true)]
async fn inactivity_recurs_while_silence_lasts() {
    let mut config = quiet_config();
    config.inactivity_mode.enabled = true;
    config.inactivity_mode.idle_threshold_seconds = 60;
    config.only_when_idle = true;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();

    advance(185).await;
    let offsets: Vec<i64> = h.sent().iter().map(|m| h.offset_secs(m)).collect();
    assert_eq!(offsets, vec![60, 120, 180]);
}

#[tokio::test(start_paused = true)]
async fn successful_sends_respect_the_cooldown() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 1;
    config.random_mode.max_interval_seconds = 1;
    config.min_message_gap_seconds = 5;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();
    advance_millis(12_500).await;

    let sent = h.sent();
    let offsets: Vec<i64> = sent.iter().map(|m| h.offset_secs(m)).collect();
    assert_eq!(offsets, vec![1, 6, 11]);
    for pair in sent.windows(2) {
        assert!((pair[1].timestamp - pair[0].timestamp).num_seconds() >= 5);
    }
    assert!(h
        .rejections()
        .iter()
        .all(|r| matches!(r, RejectReason::Cooldown { .. })));
}

#[tokio::test(start_paused = true)]
async fn use_cap_blocks_until_user_activity() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 1;
    config.random_mode.max_interval_seconds = 1;
    config.max_uses = 2;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();

    advance_millis(10_500).await;
    assert_eq!(h.sent().len(), 2);
    assert_eq!(h.scheduler.state().use_count, 2);
    assert!(h
        .rejections()
        .contains(&RejectReason::UseCapReached { max_uses: 2 }));

    h.scheduler.record_user_input().unwrap();
    assert_eq!(h.scheduler.state().use_count, 0);

    advance(5).await;
    assert_eq!(h.sent().len(), 4);
    assert_eq!(h.generator.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn restarting_does_not_duplicate_timers() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 10;
    config.random_mode.max_interval_seconds = 10;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();
    h.scheduler.restart().unwrap();
    h.scheduler.start().unwrap();

    advance(35).await;
    assert_eq!(h.fired(TriggerMode::Random), 3);
    assert_eq!(h.sent().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_pending_triggers() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 10;
    config.random_mode.max_interval_seconds = 10;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();
    advance(5).await;
    h.scheduler.stop();
    advance(60).await;

    assert_eq!(h.fired(TriggerMode::Random), 0);
    assert!(h.scheduler.armed_modes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn fixed_time_point_fires_on_schedule() {
    let mut config = quiet_config();
    config.fixed_mode.enabled = true;

    let mut h = Harness::build(config, wall(17, 59, 50), true, CountingGenerator::default());
    h.scheduler.start().unwrap();

    advance(9).await;
    assert!(h.sent().is_empty());
    advance(2).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].timestamp, wall(18, 0, 0));
    assert_eq!(h.scheduler.armed_modes(), vec![TriggerMode::Fixed]);
}

#[tokio::test(start_paused = true)]
async fn empty_conversation_is_never_written() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 1;
    config.random_mode.max_interval_seconds = 1;

    let mut h = Harness::build(config, wall(12, 0, 0), false, CountingGenerator::default());
    h.scheduler.start().unwrap();
    advance_millis(5_500).await;

    assert!(h.sent().is_empty());
    assert_eq!(h.generator.calls(), 0);
    let rejections = h.rejections();
    assert_eq!(rejections.len(), 5);
    assert!(rejections
        .iter()
        .all(|r| *r == RejectReason::EmptyConversation));
    assert!(h.store.get("main").unwrap().messages.is_empty());
}

#[tokio::test(start_paused = true)]
async fn random_trigger_rejected_while_user_recently_active() {
    let mut config = quiet_config();
    config.random_mode.min_interval_seconds = 10;
    config.random_mode.max_interval_seconds = 60;
    config.only_when_idle = true;

    let mut h = Harness::new(config);
    advance(10).await;
    h.scheduler.record_user_input().unwrap();
    advance(5).await;

    let outcome = h.scheduler.trigger_now(TriggerMode::Random).await;
    assert_eq!(
        outcome,
        SendOutcome::Rejected(RejectReason::NotIdle {
            idle_ms: 5_000,
            required_ms: 60_000,
        })
    );
    assert!(h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn generation_failure_changes_nothing() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 1;
    config.random_mode.max_interval_seconds = 1;

    let mut h = Harness::build(config, wall(12, 0, 0), true, CountingGenerator::failing());
    h.scheduler.start().unwrap();
    advance_millis(3_500).await;

    assert_eq!(h.generator.calls(), 3);
    assert!(h.sent().is_empty());
    assert_eq!(h.count("message.failed"), 3);
    let state = h.scheduler.state();
    assert_eq!(state.use_count, 0);
    assert!(state.last_auto_message_at.is_none());
    assert_eq!(h.store.get("main").unwrap().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn disabling_mid_flight_ends_the_random_chain() {
    let mut config = quiet_config();
    config.random_mode.enabled = true;
    config.random_mode.min_interval_seconds = 2;
    config.random_mode.max_interval_seconds = 2;

    let mut h = Harness::new(config);
    h.scheduler.start().unwrap();
    advance(3).await;
    assert_eq!(h.sent().len(), 1);

    h.scheduler.set_enabled(false).unwrap();
    advance(10).await;
    assert_eq!(h.sent().len(), 1);
    assert!(h.scheduler.armed_modes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn oversized_inactivity_threshold_is_capped_not_spun() {
    let mut config = quiet_config();
    config.inactivity_mode.enabled = true;
    config.inactivity_mode.idle_threshold_seconds = u64::MAX;

    let mut h = Harness::new(config.clone());
    assert_eq!(
        h.scheduler.config().inactivity_mode.idle_threshold_seconds,
        nudge_core::config::MAX_DURATION_SECONDS
    );
    assert_eq!(h.scheduler.start().unwrap(), vec![TriggerMode::Inactivity]);

    advance(3600).await;
    assert!(h.sent().is_empty());
    assert_eq!(h.scheduler.armed_modes(), vec![TriggerMode::Inactivity]);

    config.inactivity_mode.idle_threshold_seconds = 8_500_000_000_000;
    assert!(h.scheduler.update_config(config).is_err());
    assert_eq!(h.count("config.updated"), 0);
}
