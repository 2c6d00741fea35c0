//! Synthetic StormEvents data shared by the integration tests.

#![allow(dead_code)]

use storm_damage::config::{ForestConfig, TrainingConfig};
use std::path::Path;

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

const EVENTS: [&str; 5] = ["Hail", "Thunderstorm Wind", "Flood", "Tornado", "Winter Storm"];

const STATES: [(&str, f64, f64); 4] = [
    ("TEXAS", 31.0, -99.0),
    ("KANSAS", 38.5, -98.0),
    ("OKLAHOMA", 35.5, -97.5),
    ("IOWA", 42.0, -93.5),
];

/// Rows in the synthetic file, including the one with a bad damage string.
pub const TOTAL_ROWS: usize = 80;
/// Index of the row whose property damage cannot be parsed.
pub const INVALID_ROW: usize = 7;

/// A StormEvents-like CSV with mixed-case headers, empty optional cells and
/// one unparseable damage value.
pub fn synthetic_csv(with_crop: bool) -> String {
    let mut out = String::from(
        "EVENT_TYPE,State,BEGIN_DATE_TIME,MAGNITUDE,MAGNITUDE_TYPE,BEGIN_LAT,BEGIN_LON,DAMAGE_PROPERTY",
    );
    if with_crop {
        out.push_str(",DAMAGE_CROPS");
    }
    out.push('\n');

    for i in 0..TOTAL_ROWS {
        let event = EVENTS[i % EVENTS.len()];
        let (state, lat, lon) = STATES[i % STATES.len()];
        let month = i % 12;
        let day = i % 28 + 1;
        let when = format!("{day:02}-{}-23 {:02}:30:00", MONTHS[month], i % 24);

        let (magnitude, magnitude_type) = match event {
            "Hail" => (format!("{:.2}", 1.0 + (i % 4) as f64 * 0.25), ""),
            "Thunderstorm Wind" => (format!("{}", 50 + i % 30), "EG"),
            _ => (String::new(), ""),
        };
        let (lat, lon) = if i % 9 == 0 {
            (String::new(), String::new())
        } else {
            (
                format!("{:.3}", lat + (i % 5) as f64 * 0.1),
                format!("{:.3}", lon - (i % 3) as f64 * 0.1),
            )
        };

        let property = if i == INVALID_ROW {
            "n/a".to_string()
        } else {
            match event {
                "Tornado" => format!("{:.2}M", 0.5 + (i % 3) as f64),
                "Flood" => format!("{}.00K", 20 + i),
                "Hail" => format!("{:.2}K", 2.5 * (i % 4) as f64),
                "Winter Storm" => "0.00K".to_string(),
                _ => format!("{}K", 5 + i % 10),
            }
        };

        out.push_str(&format!(
            "{event},{state},{when},{magnitude},{magnitude_type},{lat},{lon},{property}"
        ));
        if with_crop {
            let crop = if event == "Hail" && month >= 4 && month <= 8 {
                format!("{}K", 10 + i % 7)
            } else if i % 6 == 0 {
                String::new()
            } else {
                "0.00K".to_string()
            };
            out.push(',');
            out.push_str(&crop);
        }
        out.push('\n');
    }

    out
}

/// Write the synthetic CSV into `dir` under the dataset naming scheme.
pub fn write_dataset(dir: &Path, with_crop: bool) -> std::path::PathBuf {
    let path = dir.join("StormEvents_details-ftp_v1.0_d2023_c20240216.csv");
    std::fs::write(&path, synthetic_csv(with_crop)).unwrap();
    path
}

/// Training settings small enough for tests.
pub fn small_training_config(data_dir: &Path) -> TrainingConfig {
    TrainingConfig {
        data_dir: data_dir.to_path_buf(),
        forest: ForestConfig {
            n_estimators: 16,
            ..ForestConfig::default()
        },
        ..TrainingConfig::default()
    }
}
