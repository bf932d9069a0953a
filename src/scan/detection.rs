//! Screen recognition by pixel colour probes.
//!
//! A few fixed pixels are enough to tell the main menu, the depot and the
//! depot with a filter applied apart, and to see whether the depot has been
//! scrolled to its end. Coordinates are for the canonical resolution.

use image::Rgb;
use std::time::Duration;

use crate::capture::{CaptureFrame, Point};

/// What a probe expects at its pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeExpect {
    Matches([u8; 3]),
    /// Must not match this colour.
    DiffersFrom([u8; 3]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorProbe {
    pub at: (u32, u32),
    pub expect: ProbeExpect,
}

const fn probe(x: u32, y: u32, rgb: [u8; 3]) -> ColorProbe {
    ColorProbe {
        at: (x, y),
        expect: ProbeExpect::Matches(rgb),
    }
}

const fn not(x: u32, y: u32, rgb: [u8; 3]) -> ColorProbe {
    ColorProbe {
        at: (x, y),
        expect: ProbeExpect::DiffersFrom(rgb),
    }
}

const SORT_DARK: [u8; 3] = [50, 50, 50];
const WHITE: [u8; 3] = [255, 255, 255];

/// Depot with the default sort button.
pub const DEPOT_PROBES: [ColorProbe; 4] = [
    probe(1425, 40, SORT_DARK),
    probe(1420, 55, SORT_DARK),
    probe(1440, 55, SORT_DARK),
    not(1430, 54, SORT_DARK),
];

/// Depot with a filter selected (sort button highlighted).
pub const DEPOT_FILTERED_PROBES: [ColorProbe; 4] = [
    probe(1425, 40, WHITE),
    probe(1420, 55, WHITE),
    probe(1440, 55, WHITE),
    not(1433, 47, WHITE),
];

pub const MAIN_MENU_PROBES: [ColorProbe; 3] = [
    probe(1480, 800, WHITE),
    probe(1480, 840, [66, 66, 66]),
    probe(1520, 840, [85, 85, 85]),
];

/// The scrollbar end marker. All bright means the last page is showing.
pub const DEPOT_END_PROBES: [(u32, u32); 5] = [
    (1560, 160),
    (1560, 210),
    (1560, 250),
    (1560, 290),
    (1560, 330),
];
const DEPOT_END_MIN: u8 = 200;

const DEPOT_BUTTON: Point = Point::new(1425, 40);
const FILTER_CLEAR: Point = Point::new(1425 - 250, 40);
const MAIN_MENU_DEPOT: Point = Point::new(1480, 800);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    MainMenu,
    DepotFiltered,
    Depot,
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Screen::MainMenu => write!(f, "main menu"),
            Screen::DepotFiltered => write!(f, "depot (filtered)"),
            Screen::Depot => write!(f, "depot"),
        }
    }
}

/// True if every channel differs by at most `leniency`.
pub fn matches_color(actual: &Rgb<u8>, expected: [u8; 3], leniency: u8) -> bool {
    actual
        .0
        .iter()
        .zip(expected)
        .all(|(a, e)| a.abs_diff(e) <= leniency)
}

fn probe_holds(frame: &CaptureFrame, probe: &ColorProbe, leniency: u8) -> bool {
    let (x, y) = probe.at;
    if x >= frame.width() || y >= frame.height() {
        return false;
    }
    let px = frame.get_pixel(x, y);
    match probe.expect {
        ProbeExpect::Matches(rgb) => matches_color(px, rgb, leniency),
        ProbeExpect::DiffersFrom(rgb) => !matches_color(px, rgb, leniency),
    }
}

pub fn all_probes_hold(frame: &CaptureFrame, probes: &[ColorProbe], leniency: u8) -> bool {
    probes.iter().all(|p| probe_holds(frame, p, leniency))
}

/// Identifies the current screen, or `None` if it is none the scanner can
/// start from.
pub fn recognize_screen(frame: &CaptureFrame, leniency: u8) -> Option<Screen> {
    if all_probes_hold(frame, &MAIN_MENU_PROBES, leniency) {
        Some(Screen::MainMenu)
    } else if all_probes_hold(frame, &DEPOT_FILTERED_PROBES, leniency) {
        Some(Screen::DepotFiltered)
    } else if all_probes_hold(frame, &DEPOT_PROBES, leniency) {
        Some(Screen::Depot)
    } else {
        None
    }
}

/// True if the depot is scrolled to its last page.
pub fn is_end_of_depot(frame: &CaptureFrame) -> bool {
    DEPOT_END_PROBES.iter().all(|&(x, y)| {
        x < frame.width()
            && y < frame.height()
            && frame.get_pixel(x, y).0.iter().all(|&c| c >= DEPOT_END_MIN)
    })
}

/// Clicks that bring the given screen to an unfiltered depot scrolled to the
/// start. Tapping the depot button also resets the scroll position.
pub fn navigation_clicks(screen: Screen) -> Vec<(Point, Duration)> {
    let settle = Duration::from_millis(500);
    match screen {
        Screen::MainMenu => vec![
            (MAIN_MENU_DEPOT, Duration::from_secs(1)),
            (DEPOT_BUTTON, settle),
        ],
        Screen::DepotFiltered => vec![(FILTER_CLEAR, settle), (DEPOT_BUTTON, settle)],
        Screen::Depot => vec![(DEPOT_BUTTON, settle)],
    }
}
