//! End-to-end tests of the daemon and the UI runtime talking over an
//! in-memory pipe, with fake collaborators and a recording screen.

use std::time::Duration;

use ndg_config::UiConfig;
use ndg_core::comm::payload::{
    LightningErrorCode, NetworkReport, SysupdatesChannel, UnlockScreen,
};
use ndg_core::daemon::{DaemonState, StopOutcome, StopReason};
use ndg_core::ui::{Mode, UiRuntime, command_channel};
use ndg_core::{Daemon, Message, MessageTag, UiCommand};
use ndg_test_utils::collab::{FakeLightning, FakeSettings, Fakes};
use ndg_test_utils::daemon::TestDaemon;
use ndg_test_utils::pipe::{expect_message, next_message, pipe_pair};
use ndg_test_utils::screen::{FakeScreen, FakeScreenHandle};
use pretty_assertions::assert_eq;

const TWO_SERVICES: &str = r#"
[[poweroff.services]]
name = "lnd"
timeout_secs = 1

[[poweroff.services]]
name = "bitcoind"
timeout_secs = 1
"#;

/// Poll the screen record until `check` holds.
async fn wait_for_screen(screen: &FakeScreenHandle, check: impl Fn(&[Message]) -> bool) {
    for _ in 0..500 {
        if check(&screen.shown()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("screen never showed the expected messages: {:?}", screen.shown());
}

fn shows(shown: &[Message], tag: MessageTag) -> bool {
    shown.iter().any(|m| m.tag() == tag)
}

#[test_log::test(tokio::test)]
async fn test_ui_answers_each_ping_with_exactly_one_pong() {
    let (mut nd, ui) = pipe_pair();
    let (screen, _handle) = FakeScreen::new();
    let (_commands, rx) = command_channel();
    let runtime = UiRuntime::new(&UiConfig::default(), screen, ui, rx);
    let shutdown = runtime.shutdown_handle();
    let task = tokio::spawn(runtime.run());

    nd.write(&Message::Ping).await.unwrap();
    assert_eq!(next_message(&mut nd).await.tag(), MessageTag::Pong);

    let extra = tokio::time::timeout(Duration::from_millis(200), nd.read()).await;
    assert!(extra.is_err(), "unexpected second reply: {extra:?}");

    shutdown.send(ndg_core::ShutdownSignal).unwrap();
    task.await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_daemon_stops_on_end_of_stream() {
    let fakes = Fakes::new();
    let daemon = Daemon::new(
        ndg_test_utils::config::TestConfigBuilder::new().build(),
        fakes.collaborators(),
    );
    let state = daemon.subscribe_state();
    let (nd, mut ui) = pipe_pair();
    let task = tokio::spawn(daemon.serve(nd, None));

    assert_eq!(next_message(&mut ui).await.tag(), MessageTag::Ping);
    drop(ui);

    let report = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("daemon did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(report.reason, StopReason::EndOfStream);
    assert!(!report.powered_off);
    assert!(fakes.system.stop_attempts().is_empty());
    assert_eq!(*state.borrow(), DaemonState::Stopped);
}

#[test_log::test(tokio::test)]
async fn test_startup_sends_ping_settings_and_reports() {
    let mut running = TestDaemon::default_config().await.start();
    let ui = &mut running.ui;

    assert_eq!(next_message(ui).await.tag(), MessageTag::Ping);
    match next_message(ui).await.into_value() {
        Message::Settings(s) => {
            assert_eq!(s.hostname, "nakamochi");
            assert_eq!(s.sysupdates.channel, SysupdatesChannel::Master);
        }
        other => panic!("expected settings, got {other:?}"),
    }
    match expect_message(ui, MessageTag::NetworkReport).await {
        Message::NetworkReport(r) => assert_eq!(r.ipaddrs, vec!["192.168.1.20".to_string()]),
        other => panic!("unexpected {other:?}"),
    }
    expect_message(ui, MessageTag::OnchainReport).await;
    expect_message(ui, MessageTag::LightningReport).await;

    running.terminate();
    let report = running.join().await.unwrap();
    assert_eq!(report.reason, StopReason::Terminated);
}

#[test_log::test(tokio::test)]
async fn test_locked_screen_pushed_at_startup_and_unlock_checked() {
    let fakes = Fakes::new().with_settings(FakeSettings::locked("1234"));
    let mut running = TestDaemon::with_toml("", fakes).await.start();
    let ui = &mut running.ui;

    expect_message(ui, MessageTag::Settings).await;
    assert_eq!(next_message(ui).await.tag(), MessageTag::LockScreen);

    ui.write(&Message::UnlockScreen(UnlockScreen {
        pincode: "0000".into(),
    }))
    .await
    .unwrap();
    match expect_message(ui, MessageTag::ScreenUnlockResult).await {
        Message::ScreenUnlockResult(r) => {
            assert!(!r.ok);
            assert_eq!(r.err.as_deref(), Some("incorrect pincode"));
        }
        other => panic!("unexpected {other:?}"),
    }

    ui.write(&Message::UnlockScreen(UnlockScreen {
        pincode: "1234".into(),
    }))
    .await
    .unwrap();
    match expect_message(ui, MessageTag::ScreenUnlockResult).await {
        Message::ScreenUnlockResult(r) => assert!(r.ok),
        other => panic!("unexpected {other:?}"),
    }

    running.terminate();
    running.join().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_uninitialized_wallet_offers_seed_once() {
    let fakes = Fakes::new().with_lightning(FakeLightning::uninitialized());
    let mut running = TestDaemon::with_toml("[reports]\npoll_secs = 1\n", fakes)
        .await
        .start();
    let ui = &mut running.ui;

    match expect_message(ui, MessageTag::LightningError).await {
        Message::LightningError(e) => assert_eq!(e.code, LightningErrorCode::Uninitialized),
        other => panic!("unexpected {other:?}"),
    }
    match expect_message(ui, MessageTag::LightningGenseedResult).await {
        Message::LightningGenseedResult(seed) => assert_eq!(seed.mnemonic.len(), 24),
        other => panic!("unexpected {other:?}"),
    }

    // The next poll reports the same error without a second seed.
    expect_message(ui, MessageTag::LightningError).await;
    assert_eq!(running.fakes.lightning.genseed_calls(), 1);

    // A reset allows a fresh seed.
    running.ui.write(&Message::LightningReset).await.unwrap();
    expect_message(&mut running.ui, MessageTag::LightningGenseedResult).await;
    assert_eq!(running.fakes.lightning.genseed_calls(), 2);

    running.terminate();
    running.join().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_settings_changes_reply_with_settings() {
    let mut running = TestDaemon::default_config().await.start();
    let ui = &mut running.ui;
    expect_message(ui, MessageTag::Settings).await;

    ui.write(&Message::SetNodename(ndg_core::comm::payload::SetNodename {
        name: "satoshi".into(),
    }))
    .await
    .unwrap();
    match expect_message(ui, MessageTag::Settings).await {
        Message::Settings(s) => assert_eq!(s.hostname, "satoshi"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        *running.fakes.system.hostnames.lock().unwrap(),
        vec!["satoshi".to_string()]
    );

    running
        .ui
        .write(&Message::SwitchSysupdates(
            ndg_core::comm::payload::SwitchSysupdates {
                channel: SysupdatesChannel::Dev,
            },
        ))
        .await
        .unwrap();
    match expect_message(&mut running.ui, MessageTag::Settings).await {
        Message::Settings(s) => assert_eq!(s.sysupdates.channel, SysupdatesChannel::Dev),
        other => panic!("unexpected {other:?}"),
    }

    running.terminate();
    running.join().await.unwrap();
}

#[test_log::test(tokio::test)]
async fn test_power_off_continues_past_failing_service() {
    let fakes = Fakes::new();
    fakes.system.fail_service("lnd");
    let mut running = TestDaemon::with_toml(TWO_SERVICES, fakes).await.start();

    running.ui.write(&Message::PowerOff).await.unwrap();

    let mut last = None;
    while let Ok(Ok(msg)) =
        tokio::time::timeout(Duration::from_secs(5), running.ui.read()).await
    {
        if let Message::PowerOffProgress(p) = msg.into_value() {
            last = Some(p);
        }
    }
    let last = last.expect("no power-off progress seen");
    assert_eq!(last.services.len(), 2);
    assert_eq!(last.services[0].name, "lnd");
    assert!(!last.services[0].stopped);
    assert!(last.services[0].err.is_some());
    assert_eq!(last.services[1].name, "bitcoind");
    assert!(last.services[1].stopped);

    let report = running.join().await.unwrap();
    assert_eq!(report.reason, StopReason::PowerOff);
    assert!(matches!(report.services[0].outcome, StopOutcome::Error(_)));
    assert_eq!(report.services[1].outcome, StopOutcome::Stopped);
    assert!(report.powered_off);

    let mut attempts = running.fakes.system.stop_attempts();
    attempts.sort();
    assert_eq!(attempts, vec!["bitcoind".to_string(), "lnd".to_string()]);
    assert!(running.fakes.system.powered_off());
}

#[test_log::test(tokio::test)]
async fn test_power_off_reports_timed_out_service() {
    let fakes = Fakes::new();
    fakes.system.hang_service("bitcoind");
    let mut running = TestDaemon::with_toml(TWO_SERVICES, fakes).await.start();

    running.ui.write(&Message::PowerOff).await.unwrap();
    let report = running.join().await.unwrap();

    assert_eq!(report.services[0].outcome, StopOutcome::Stopped);
    assert_eq!(report.services[1].outcome, StopOutcome::TimedOut);
    assert!(report.powered_off);
}

#[test_log::test(tokio::test)]
async fn test_full_session_through_ui_runtime() {
    let fakes = Fakes::new();
    let config = ndg_test_utils::config::TestConfigBuilder::new()
        .service("lnd", 1)
        .service("bitcoind", 1)
        .build();
    let daemon = Daemon::new(config.clone(), fakes.collaborators());
    let (nd, ui) = pipe_pair();

    let (screen, handle) = FakeScreen::new();
    let (commands, rx) = command_channel();
    let runtime = UiRuntime::new(&config.ui, screen, ui, rx);
    let ui_state = runtime.state();

    let nd_task = tokio::spawn(daemon.serve(nd, None));
    let ui_task = tokio::spawn(runtime.run());

    wait_for_screen(&handle, |shown| {
        shows(shown, MessageTag::Settings)
            && shows(shown, MessageTag::NetworkReport)
            && shows(shown, MessageTag::OnchainReport)
            && shows(shown, MessageTag::LightningReport)
    })
    .await;
    assert_eq!(ui_state.lock().await.cache.len(), 3);

    // A refresh from the screen comes back as a scanned network report.
    commands
        .send(UiCommand::RefreshNetwork { scan: true })
        .await
        .unwrap();
    wait_for_screen(&handle, |shown| {
        shown.iter().any(|m| {
            matches!(m, Message::NetworkReport(NetworkReport { wifi_scan_networks, .. })
                if !wifi_scan_networks.is_empty())
        })
    })
    .await;

    commands.send(UiCommand::ConfirmPowerOff).await.unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), nd_task)
        .await
        .expect("daemon did not stop")
        .unwrap()
        .unwrap();
    assert_eq!(report.reason, StopReason::PowerOff);
    assert!(report.powered_off);

    // The daemon closing its end stops the UI.
    tokio::time::timeout(Duration::from_secs(5), ui_task)
        .await
        .expect("UI did not stop")
        .unwrap();

    assert!(shows(&handle.shown(), MessageTag::PowerOffProgress));
    let state = ui_state.lock().await;
    assert_eq!(state.mode, Mode::Alert);
    assert!(state.cache.is_empty());
    assert!(fakes.system.powered_off());
}

#[test_log::test(tokio::test)]
async fn test_standby_and_wakeup_round_trip() {
    let fakes = Fakes::new();
    let config = ndg_test_utils::config::TestConfigBuilder::new()
        .standby_idle_secs(1)
        .build();
    let daemon = Daemon::new(config.clone(), fakes.collaborators());
    let shutdown = daemon.shutdown_handle();
    let (nd, ui) = pipe_pair();

    let (screen, handle) = FakeScreen::new();
    handle.set_idle(Duration::from_secs(5));
    let (_commands, rx) = command_channel();
    let runtime = UiRuntime::new(&config.ui, screen, ui, rx);
    let ui_state = runtime.state();

    let nd_task = tokio::spawn(daemon.serve(nd, None));
    let ui_task = tokio::spawn(runtime.run());

    for _ in 0..500 {
        if handle.is_asleep() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handle.is_asleep());
    assert_eq!(ui_state.lock().await.mode, Mode::Standby);

    handle.touch();
    for _ in 0..500 {
        if !handle.is_asleep() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!handle.is_asleep());
    assert_eq!(ui_state.lock().await.mode, Mode::Active);

    shutdown.send(ndg_core::ShutdownSignal).unwrap();
    let report = nd_task.await.unwrap().unwrap();
    assert_eq!(report.reason, StopReason::Terminated);
    tokio::time::timeout(Duration::from_secs(5), ui_task)
        .await
        .expect("UI did not stop")
        .unwrap();
}
