use super::*;

#[test]
fn fixed_clock_advances() {
    let clock = FixedClock::new(1_000);
    assert_eq!(clock.now_ms(), 1_000);
    clock.advance_ms(500);
    assert_eq!(clock.now_ms(), 1_500);
}

#[test]
fn fixed_clock_clones_share_state() {
    let clock = FixedClock::new(0);
    let clone = clock.clone();
    clock.advance_ms(42);
    assert_eq!(clone.now_ms(), 42);
}
