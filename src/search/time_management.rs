/// Per-move time budget in milliseconds, derived from the clock state the
/// GUI reports with `go`.
pub const NO_TIME_LIMIT: i64 = i64::MAX;

const MINIMUM_ALLOCATION: i64 = 100;
const LONG_GAME_THRESHOLD: i64 = 300_000;
const MEDIUM_GAME_THRESHOLD: i64 = 60_000;
const LONG_GAME_DIVISOR: i64 = 40;
const MEDIUM_GAME_DIVISOR: i64 = 30;
const SHORT_GAME_DIVISOR: i64 = 20;
const INCREMENT_MULTIPLIER: i64 = 3;
const INCREMENT_DIVISOR: i64 = 4;
const MAX_TIME_FRACTION: i64 = 2;
const EMERGENCY_TIME_DIVISOR: i64 = 10;
const MAXIMUM_EMERGENCY_TIME: i64 = 5_000;

#[allow(clippy::too_many_arguments)]
pub fn calculate_time_allocation(
    player_time: i64,
    _opponent_time: i64,
    player_increment: i64,
    _opponent_increment: i64,
    moves_to_go: i64,
    infinite: bool,
) -> i64 {
    if infinite || player_time == 0 {
        return NO_TIME_LIMIT;
    }

    let mut allocation = if moves_to_go > 0 {
        player_time / moves_to_go + player_increment * INCREMENT_MULTIPLIER / INCREMENT_DIVISOR
    } else if player_time > LONG_GAME_THRESHOLD {
        player_time / LONG_GAME_DIVISOR + player_increment
    } else if player_time > MEDIUM_GAME_THRESHOLD {
        player_time / MEDIUM_GAME_DIVISOR + player_increment
    } else {
        player_time / SHORT_GAME_DIVISOR + player_increment
    };

    allocation = allocation.max(MINIMUM_ALLOCATION);
    allocation = allocation.min(player_time / MAX_TIME_FRACTION);

    // With almost no clock left the clamps collapse; fall back to a sliver
    // of the remaining time.
    if allocation < MINIMUM_ALLOCATION {
        allocation = (player_time / EMERGENCY_TIME_DIVISOR).min(MAXIMUM_EMERGENCY_TIME);
    }

    allocation
}
