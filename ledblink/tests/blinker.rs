use std::time::Duration;

use ledblink::{
    mock::{MockGpio, Operation},
    BlinkEvent, Blinker, BlinkerState, Cancellation, Error, InitializationError, Level, PinId,
    BLINK_INTERVAL, DEFAULT_PIN,
};
use pretty_assertions::assert_eq;
use test_case::test_case;

const INTERVAL: Duration = Duration::from_millis(250);

/// Runs the blinker on BCM 17 until the `cancel_on_sleep`-th sleep is interrupted.
fn blink_until(gpio: &mut MockGpio, cancel_on_sleep: usize) -> (Result<u64, Error>, Vec<BlinkEvent>) {
    let mut events = Vec::new();
    let clock = gpio.clock().cancel_on_sleep(cancel_on_sleep);
    let result = Blinker::initialize(gpio, DEFAULT_PIN, clock, |event: &BlinkEvent| {
        events.push(event.clone())
    })
    .and_then(|blinker| blinker.with_interval(INTERVAL).run(&Cancellation::new()))
    .map(|summary| summary.transitions);
    (result, events)
}

#[test]
fn mode_is_set_once_before_any_transition() {
    let mut gpio = MockGpio::new();
    blink_until(&mut gpio, 4).0.unwrap();

    let operations = gpio.operations();
    assert_eq!(gpio.count(Operation::SetOutput(Level::Low)), 1);
    assert_eq!(operations[0], Operation::Claim(17));
    assert_eq!(operations[1], Operation::SetOutput(Level::Low));
    assert!(matches!(operations[2], Operation::Write(_)));
}

#[test_case(1; "one transition")]
#[test_case(2; "two transitions")]
#[test_case(7; "seven transitions")]
fn levels_alternate_starting_high(transitions: usize) {
    let mut gpio = MockGpio::new();
    let (result, _) = blink_until(&mut gpio, transitions);
    assert_eq!(result.unwrap(), transitions as u64);

    let mut expected: Vec<Level> = (0..transitions)
        .map(|i| if i % 2 == 0 { Level::High } else { Level::Low })
        .collect();
    // Release drives the line low if the loop stopped while it was high.
    if transitions % 2 == 1 {
        expected.push(Level::Low);
    }
    assert_eq!(gpio.writes(), expected);
}

#[test]
fn every_transition_is_followed_by_one_interval() {
    let mut gpio = MockGpio::new();
    blink_until(&mut gpio, 4).0.unwrap();

    let loop_operations: Vec<Operation> = gpio
        .operations()
        .into_iter()
        .skip(2)
        .take(8)
        .collect();

    assert_eq!(
        loop_operations,
        vec![
            Operation::Write(Level::High),
            Operation::Sleep(INTERVAL),
            Operation::Write(Level::Low),
            Operation::Sleep(INTERVAL),
            Operation::Write(Level::High),
            Operation::Sleep(INTERVAL),
            Operation::Write(Level::Low),
            Operation::Sleep(INTERVAL),
        ]
    );
}

#[test]
fn default_interval_is_one_second() {
    let mut gpio = MockGpio::new();
    let clock = gpio.clock().cancel_on_sleep(1);
    let blinker = Blinker::initialize(&mut gpio, DEFAULT_PIN, clock, |_: &BlinkEvent| {}).unwrap();

    blinker.run(&Cancellation::new()).unwrap();

    assert_eq!(gpio.count(Operation::Sleep(Duration::from_secs(1))), 1);
    assert_eq!(BLINK_INTERVAL, Duration::from_secs(1));
}

#[test]
fn interrupt_releases_exactly_once_and_stops_transitions() {
    let mut gpio = MockGpio::new();
    let (result, _) = blink_until(&mut gpio, 3);
    result.unwrap();

    let operations = gpio.operations();
    let release = operations
        .iter()
        .position(|operation| *operation == Operation::Release)
        .unwrap();

    assert_eq!(gpio.releases(), 1);
    assert_eq!(release, operations.len() - 1);
    assert!(!gpio.is_claimed(17));
}

#[test]
fn second_interrupt_does_not_clean_up_again() {
    let mut gpio = MockGpio::new();
    let cancel = Cancellation::new();
    let mut events = Vec::new();

    let remote = cancel.clone();
    let clock = gpio.clock().cancel_on_sleep(2);
    let blinker = Blinker::initialize(&mut gpio, DEFAULT_PIN, clock, |event: &BlinkEvent| {
        // Operator hits Ctrl-C again while cleanup is running.
        if *event == BlinkEvent::Interrupted {
            remote.cancel();
        }
        events.push(event.clone());
    })
    .unwrap();

    let summary = blinker.with_interval(INTERVAL).run(&cancel).unwrap();

    assert_eq!(summary.final_state, BlinkerState::Shutdown);
    assert_eq!(gpio.releases(), 1);
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == BlinkEvent::CleanupComplete)
            .count(),
        1
    );
}

#[test]
fn interrupt_before_first_transition() {
    let mut gpio = MockGpio::new();
    let cancel = Cancellation::new();
    let mut events = Vec::new();

    let clock = gpio.clock();
    let blinker = Blinker::initialize(&mut gpio, DEFAULT_PIN, clock, |event: &BlinkEvent| {
        events.push(event.clone())
    })
    .unwrap();
    assert_eq!(blinker.state(), BlinkerState::OutputLow);

    cancel.cancel();
    let summary = blinker.run(&cancel).unwrap();

    assert_eq!(summary.transitions, 0);
    assert_eq!(
        events,
        vec![
            BlinkEvent::SetupStarted,
            BlinkEvent::SetupComplete { line: 17 },
            BlinkEvent::LoopStarted,
            BlinkEvent::Interrupted,
            BlinkEvent::CleanupComplete,
        ]
    );
    assert_eq!(
        gpio.operations(),
        vec![
            Operation::Claim(17),
            Operation::SetOutput(Level::Low),
            Operation::Release,
        ]
    );
}

#[test]
fn interrupt_mid_sleep_prevents_the_next_transition() {
    let mut gpio = MockGpio::new();
    let (result, events) = blink_until(&mut gpio, 3);

    assert_eq!(result.unwrap(), 3);
    assert_eq!(
        events,
        vec![
            BlinkEvent::SetupStarted,
            BlinkEvent::SetupComplete { line: 17 },
            BlinkEvent::LoopStarted,
            BlinkEvent::Transition(Level::High),
            BlinkEvent::Transition(Level::Low),
            BlinkEvent::Transition(Level::High),
            BlinkEvent::Interrupted,
            BlinkEvent::CleanupComplete,
        ]
    );
    assert_eq!(events.last(), Some(&BlinkEvent::CleanupComplete));
}

#[test]
fn claim_failure_is_an_initialization_error() {
    let mut gpio = MockGpio::new().failing_claim();
    let (result, events) = blink_until(&mut gpio, 1);

    let error = result.unwrap_err();
    assert!(matches!(
        error,
        Error::Initialization(InitializationError::Claim { .. })
    ));
    assert_eq!(events, vec![BlinkEvent::SetupStarted]);
    assert_eq!(gpio.operations(), vec![Operation::Claim(17)]);
}

#[test]
fn mode_failure_releases_the_claimed_line() {
    let mut gpio = MockGpio::new().failing_set_output();
    let (result, _) = blink_until(&mut gpio, 1);

    assert!(matches!(
        result.unwrap_err(),
        Error::Initialization(InitializationError::SetMode { .. })
    ));
    assert_eq!(gpio.releases(), 1);
    assert!(!gpio.is_claimed(17));
}

#[test]
fn invalid_board_pin_never_reaches_the_backend() {
    let mut gpio = MockGpio::new();
    let clock = gpio.clock();

    let error = Blinker::initialize(&mut gpio, PinId::board(9), clock, |_: &BlinkEvent| {})
        .unwrap_err();

    assert!(matches!(
        error,
        Error::Initialization(InitializationError::InvalidPin(_))
    ));
    assert!(gpio.operations().is_empty());
}

#[test]
fn board_numbering_claims_the_bcm_line() {
    let mut gpio = MockGpio::new();
    let clock = gpio.clock().cancel_on_sleep(1);
    let blinker =
        Blinker::initialize(&mut gpio, PinId::board(11), clock, |_: &BlinkEvent| {}).unwrap();

    assert_eq!(blinker.pin(), PinId::board(11));
    blinker.run(&Cancellation::new()).unwrap();

    assert_eq!(gpio.operations()[0], Operation::Claim(17));
}

#[test]
fn write_failure_stops_the_loop_and_still_releases() {
    let mut gpio = MockGpio::new().failing_write_after(2);
    let (result, events) = blink_until(&mut gpio, 10);

    let error = result.unwrap_err();
    assert!(matches!(
        error,
        Error::Transition {
            level: Level::High,
            ..
        }
    ));
    assert_eq!(gpio.releases(), 1);
    assert_eq!(gpio.count(Operation::Sleep(INTERVAL)), 2);
    assert_eq!(events.last(), Some(&BlinkEvent::CleanupComplete));
    assert!(!events.contains(&BlinkEvent::Interrupted));
}

#[test]
fn release_failure_is_reported_after_cleanup() {
    let mut gpio = MockGpio::new().failing_release();
    let (result, events) = blink_until(&mut gpio, 2);

    assert!(matches!(result.unwrap_err(), Error::Release { .. }));
    assert_eq!(gpio.releases(), 1);
    assert_eq!(events.last(), Some(&BlinkEvent::CleanupComplete));
}
