//! Calendar domain — the heartbeat of Willowmere.
//!
//! Responsible for:
//! - Advancing game time (minutes, hours, days, seasons, years)
//! - Emitting TenMinuteTickEvent on every ten-minute boundary
//! - Rolling daily weather
//! - Sending DayEndEvent, DayStartedEvent and SeasonChangeEvent
//! - Pausing / unpausing time based on GameState
//!
//! DayEndEvent can also arrive from an external source (tests, a future
//! sleep trigger). `process_day_end` detects whether the calendar was
//! already advanced by the 2 AM auto-rollover and advances it itself when
//! the trigger was external, so both paths leave the same new-day state.

use bevy::prelude::*;
use rand::Rng;

use crate::shared::*;

pub struct CalendarPlugin;

impl Plugin for CalendarPlugin {
    fn build(&self, app: &mut App) {
        app
            // Pause time whenever we leave Playing state
            .add_systems(OnEnter(GameState::Playing), resume_time)
            .add_systems(OnExit(GameState::Playing), pause_time)
            // Core time tick — only runs while Playing and NOT paused
            .add_systems(
                Update,
                tick_time
                    .run_if(in_state(GameState::Playing))
                    .run_if(time_not_paused),
            )
            // Day-end processing runs after the tick so an auto-rollover
            // emitted this frame is handled this frame.
            .add_systems(
                Update,
                process_day_end
                    .run_if(in_state(GameState::Playing))
                    .after(tick_time),
            );
    }
}

// ─── Run Conditions ───────────────────────────────────────────────────────────

fn time_not_paused(calendar: Res<Calendar>) -> bool {
    !calendar.time_paused
}

// ─── State transition hooks ───────────────────────────────────────────────────

fn resume_time(mut calendar: ResMut<Calendar>) {
    calendar.time_paused = false;
    info!(
        "[Calendar] Time resumed — {}:{:02} Day {} {:?} Year {}",
        calendar.hour, calendar.minute, calendar.day, calendar.season, calendar.year
    );
}

fn pause_time(mut calendar: ResMut<Calendar>) {
    calendar.time_paused = true;
    info!("[Calendar] Time paused");
}

// ─── Main time-tick system ────────────────────────────────────────────────────

/// Accumulates real delta-seconds and converts them to in-game minutes.
///
/// Default time_scale = 10.0, meaning 1 real second = 10 game-minutes.
/// Day spans 6:00 AM → 26:00 (2:00 AM next day) = 20 game-hours = 1200 min.
fn tick_time(
    time: Res<Time>,
    mut calendar: ResMut<Calendar>,
    mut tick_writer: EventWriter<TenMinuteTickEvent>,
    mut day_end_writer: EventWriter<DayEndEvent>,
    mut day_started_writer: EventWriter<DayStartedEvent>,
) {
    let delta = time.delta_secs();
    calendar.elapsed_real_seconds += delta;

    // Guard against zero / negative time_scale
    let secs_per_game_minute = if calendar.time_scale > 0.0 {
        1.0 / calendar.time_scale
    } else {
        1.0 / 10.0
    };

    // Advance as many game-minutes as have accumulated
    while calendar.elapsed_real_seconds >= secs_per_game_minute {
        calendar.elapsed_real_seconds -= secs_per_game_minute;
        advance_one_minute(
            &mut calendar,
            &mut tick_writer,
            &mut day_end_writer,
            &mut day_started_writer,
        );
    }
}

/// Advances the calendar by exactly one game-minute.
/// Handles minute -> hour -> day rollovers and the ten-minute tick.
fn advance_one_minute(
    calendar: &mut Calendar,
    tick_writer: &mut EventWriter<TenMinuteTickEvent>,
    day_end_writer: &mut EventWriter<DayEndEvent>,
    day_started_writer: &mut EventWriter<DayStartedEvent>,
) {
    calendar.minute += 1;

    if calendar.minute >= 60 {
        calendar.minute = 0;
        calendar.hour += 1;

        // 2:00 AM = hour 26 -> force end of day
        if calendar.hour >= 26 {
            trigger_day_end(calendar, day_end_writer, day_started_writer);
        }
    }

    if calendar.minute % 10 == 0 {
        tick_writer.send(TenMinuteTickEvent {
            hour: calendar.hour,
            minute: calendar.minute,
            tick_index: calendar.ticks_today(),
        });
    }
}

/// Called when the day ends via the 2 AM auto-rollover. Emits DayEndEvent
/// for the ending day, advances day/season/year, resets the clock to
/// 6:00 AM, rolls new weather, and announces the new day.
fn trigger_day_end(
    calendar: &mut Calendar,
    day_end_writer: &mut EventWriter<DayEndEvent>,
    day_started_writer: &mut EventWriter<DayStartedEvent>,
) {
    // Emit with the CURRENT day/season/year (the day that just ended)
    day_end_writer.send(DayEndEvent {
        day: calendar.day,
        season: calendar.season,
        year: calendar.year,
    });

    info!(
        "[Calendar] Day ended — Day {} {:?} Year {}",
        calendar.day, calendar.season, calendar.year
    );

    advance_to_next_day(calendar);

    day_started_writer.send(DayStartedEvent {
        day: calendar.day,
        season: calendar.season,
        year: calendar.year,
    });
}

/// Day/season/year advancement shared by both day-end trigger paths.
fn advance_to_next_day(calendar: &mut Calendar) {
    calendar.day += 1;
    calendar.hour = 6;
    calendar.minute = 0;
    calendar.elapsed_real_seconds = 0.0;

    if calendar.day > DAYS_PER_SEASON {
        calendar.day = 1;
        let old_season = calendar.season;
        calendar.season = calendar.season.next();

        info!(
            "[Calendar] Season changed: {:?} -> {:?} (Year {})",
            old_season, calendar.season, calendar.year
        );

        // Year rollover happens when Spring begins again
        if calendar.season == Season::Spring {
            calendar.year += 1;
            info!("[Calendar] New Year! Year {}", calendar.year);
        }
    }

    calendar.weather = roll_weather(calendar.season);

    info!(
        "[Calendar] New day: Day {} {:?} Year {} — Weather: {:?}",
        calendar.day, calendar.season, calendar.year, calendar.weather
    );
}

// ─── Day-end event relay ──────────────────────────────────────────────────────

/// Reads DayEndEvent and handles two cases:
///
/// 1. **Internal trigger (2 AM auto-rollover):** the calendar was already
///    advanced by `trigger_day_end`, detectable because the event's date no
///    longer matches the calendar. Only the SeasonChangeEvent (if any) still
///    needs to go out.
///
/// 2. **External trigger:** the calendar still shows the ending day and must
///    be advanced here, with DayStartedEvent and SeasonChangeEvent emitted.
fn process_day_end(
    mut day_end_reader: EventReader<DayEndEvent>,
    mut season_writer: EventWriter<SeasonChangeEvent>,
    mut day_started_writer: EventWriter<DayStartedEvent>,
    mut calendar: ResMut<Calendar>,
) {
    for event in day_end_reader.read() {
        let already_advanced = event.day != calendar.day
            || event.season != calendar.season
            || event.year != calendar.year;

        if already_advanced {
            if event.season != calendar.season {
                season_writer.send(SeasonChangeEvent {
                    new_season: calendar.season,
                    year: calendar.year,
                });
            }
        } else {
            info!(
                "[Calendar] External day-end trigger — advancing from Day {} {:?} Year {}",
                calendar.day, calendar.season, calendar.year
            );

            let old_season = calendar.season;
            advance_to_next_day(&mut calendar);

            if old_season != calendar.season {
                season_writer.send(SeasonChangeEvent {
                    new_season: calendar.season,
                    year: calendar.year,
                });
            }

            day_started_writer.send(DayStartedEvent {
                day: calendar.day,
                season: calendar.season,
                year: calendar.year,
            });
        }
    }
}

// ─── Weather rolling ──────────────────────────────────────────────────────────

/// Rolls a weather result for the given season using weighted probabilities.
///
/// Spring:  60% Sunny, 30% Rainy, 10% Stormy
/// Summer:  70% Sunny, 20% Rainy, 10% Stormy
/// Fall:    50% Sunny, 35% Rainy, 15% Stormy
/// Winter:  40% Sunny, 10% Rainy, 10% Stormy, 40% Snowy
pub fn roll_weather(season: Season) -> Weather {
    let mut rng = rand::thread_rng();
    let roll: f32 = rng.gen(); // 0.0 ..< 1.0

    match season {
        Season::Spring => {
            if roll < 0.60 {
                Weather::Sunny
            } else if roll < 0.90 {
                Weather::Rainy
            } else {
                Weather::Stormy
            }
        }
        Season::Summer => {
            if roll < 0.70 {
                Weather::Sunny
            } else if roll < 0.90 {
                Weather::Rainy
            } else {
                Weather::Stormy
            }
        }
        Season::Fall => {
            if roll < 0.50 {
                Weather::Sunny
            } else if roll < 0.85 {
                Weather::Rainy
            } else {
                Weather::Stormy
            }
        }
        Season::Winter => {
            if roll < 0.40 {
                Weather::Sunny
            } else if roll < 0.50 {
                Weather::Rainy
            } else if roll < 0.60 {
                Weather::Stormy
            } else {
                Weather::Snowy
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
