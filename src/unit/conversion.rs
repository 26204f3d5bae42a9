//! Conversion ratios between comparable units.
//!
//! The table is indexed `TABLE[to][from]`; multiplying a value in `from`
//! units by the stored factor yields the value in `to` units.

use std::collections::HashMap;
use std::f64::consts::PI;

use once_cell::sync::Lazy;

use super::Unit;

pub(crate) static UNIT_CONVERSION_TABLE: Lazy<HashMap<Unit, HashMap<Unit, f64>>> =
    Lazy::new(|| {
        let mut table = HashMap::new();

        // Absolute lengths, all expressed through inches.
        let lengths: [(Unit, f64); 7] = [
            (Unit::In, 1.0),
            (Unit::Cm, 2.54),
            (Unit::Mm, 25.4),
            (Unit::Q, 101.6),
            (Unit::Pc, 6.0),
            (Unit::Pt, 72.0),
            (Unit::Px, 96.0),
        ];

        for (to, to_per_in) in lengths.iter() {
            let mut from = HashMap::new();
            for (fr, fr_per_in) in lengths.iter() {
                from.insert(fr.clone(), to_per_in / fr_per_in);
            }
            table.insert(to.clone(), from);
        }

        // Angles, expressed through full turns.
        let angles: [(Unit, f64); 4] = [
            (Unit::Deg, 360.0),
            (Unit::Grad, 400.0),
            (Unit::Rad, 2.0 * PI),
            (Unit::Turn, 1.0),
        ];

        for (to, to_per_turn) in angles.iter() {
            let mut from = HashMap::new();
            for (fr, fr_per_turn) in angles.iter() {
                from.insert(fr.clone(), to_per_turn / fr_per_turn);
            }
            table.insert(to.clone(), from);
        }

        // Time.
        let times: [(Unit, f64); 2] = [(Unit::S, 1.0), (Unit::Ms, 1000.0)];

        for (to, to_per_s) in times.iter() {
            let mut from = HashMap::new();
            for (fr, fr_per_s) in times.iter() {
                from.insert(fr.clone(), to_per_s / fr_per_s);
            }
            table.insert(to.clone(), from);
        }

        // Frequency.
        let freqs: [(Unit, f64); 2] = [(Unit::Hz, 1.0), (Unit::Khz, 0.001)];

        for (to, to_per_hz) in freqs.iter() {
            let mut from = HashMap::new();
            for (fr, fr_per_hz) in freqs.iter() {
                from.insert(fr.clone(), to_per_hz / fr_per_hz);
            }
            table.insert(to.clone(), from);
        }

        // Resolution, expressed through dots per inch.
        let resolutions: [(Unit, f64); 3] =
            [(Unit::Dpi, 96.0), (Unit::Dpcm, 96.0 / 2.54), (Unit::Dppx, 1.0)];

        for (to, to_per_dppx) in resolutions.iter() {
            let mut from = HashMap::new();
            for (fr, fr_per_dppx) in resolutions.iter() {
                from.insert(fr.clone(), to_per_dppx / fr_per_dppx);
            }
            table.insert(to.clone(), from);
        }

        table
    });
