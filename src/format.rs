use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// SI prefix of a raw reading. Serialized as the bare prefix letter so
/// collector output like `"unit": "k"` decodes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Magnitude {
    #[default]
    #[serde(rename = "")]
    Unit,
    #[serde(rename = "k")]
    Kilo,
    #[serde(rename = "M")]
    Mega,
    #[serde(rename = "G")]
    Giga,
}

impl Magnitude {
    const LADDER: [Magnitude; 4] = [
        Magnitude::Unit,
        Magnitude::Kilo,
        Magnitude::Mega,
        Magnitude::Giga,
    ];

    fn step(self) -> usize {
        match self {
            Magnitude::Unit => 0,
            Magnitude::Kilo => 1,
            Magnitude::Mega => 2,
            Magnitude::Giga => 3,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Magnitude::Unit => "",
            Magnitude::Kilo => "k",
            Magnitude::Mega => "M",
            Magnitude::Giga => "G",
        }
    }

    pub fn from_prefix(raw: &str) -> Option<Self> {
        match raw {
            "" => Some(Magnitude::Unit),
            "k" | "K" => Some(Magnitude::Kilo),
            "M" => Some(Magnitude::Mega),
            "G" | "g" => Some(Magnitude::Giga),
            _ => None,
        }
    }
}

/// Physical domain of a reading; picks the unit suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Frequency,
    Power,
}

impl Quantity {
    pub fn suffix(self) -> &'static str {
        match self {
            Quantity::Frequency => "Hz",
            Quantity::Power => "W",
        }
    }
}

const TOP_STEP: usize = Magnitude::LADDER.len() - 1;

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Rescale `value` (expressed in `source` units) to the most readable
/// magnitude and print it with one decimal, e.g. `1300000 k` -> `1.3GHz`.
///
/// Negative and non-finite readings are clamped to zero. The mantissa always
/// stays below 1000, so the result fits in 8 columns up to the giga range.
pub fn format_quantity(value: f64, source: Magnitude, quantity: Quantity) -> String {
    let mut scaled = if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    };
    let mut step = source.step();

    while scaled >= 1000.0 && step < TOP_STEP {
        scaled /= 1000.0;
        step += 1;
    }
    while scaled > 0.0 && scaled < 1.0 && step > 0 {
        scaled *= 1000.0;
        step -= 1;
    }
    // 999.96 rounds to 1000.0: move up one more step
    if round_tenth(scaled) >= 1000.0 && step < TOP_STEP {
        scaled /= 1000.0;
        step += 1;
    }

    format!(
        "{:.1}{}{}",
        round_tenth(scaled),
        Magnitude::LADDER[step].prefix(),
        quantity.suffix()
    )
}

/// Inverse of [`format_quantity`]: `"1.3GHz"` -> `(1.3, Giga)`.
pub fn parse_quantity(text: &str, quantity: Quantity) -> Option<(f64, Magnitude)> {
    let body = text.trim().strip_suffix(quantity.suffix())?;
    let (number, magnitude) = match body.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => {
            (&body[..idx], Magnitude::from_prefix(&body[idx..])?)
        }
        _ => (body, Magnitude::Unit),
    };
    number.trim().parse::<f64>().ok().map(|value| (value, magnitude))
}

/// Boolean status to a label and its color: green when active, red otherwise.
pub fn format_status(flag: bool, active_label: &str, inactive_label: &str) -> (String, Color) {
    if flag {
        (active_label.to_string(), Color::Green)
    } else {
        (inactive_label.to_string(), Color::Red)
    }
}
