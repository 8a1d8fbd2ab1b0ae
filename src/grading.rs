//! Produce quality grading.
//!
//! Maps the categorical attributes of a produce lot to a weighted score in
//! [0.0, 1.0], a letter grade, and a certification label. The function is
//! pure and deterministic: the same attributes always produce the same
//! result, so it can be called from any number of tasks without
//! synchronization.

use serde::Serialize;

/// Per-value weights for each categorical attribute. Values are matched on
/// their lower-cased form; anything not in a table falls back to that
/// attribute's default weight.
static FERTILIZER_WEIGHTS: &[(&str, f64)] = &[
    ("urea", 0.05),
    ("compost", 0.18),
    ("vermicompost", 0.20),
    ("biofertilizer", 0.22),
    ("npk", 0.10),
    ("dap", 0.08),
];

static SOIL_WEIGHTS: &[(&str, f64)] = &[
    ("loamy", 0.18),
    ("sandy", 0.08),
    ("sandy loam", 0.15),
    ("clay", 0.10),
    ("silt", 0.12),
];

static IRRIGATION_WEIGHTS: &[(&str, f64)] = &[
    ("drip", 0.15),
    ("sprinkler", 0.12),
    ("flood", 0.05),
    ("manual", 0.03),
];

static QUALITY_WEIGHTS: &[(&str, f64)] = &[
    ("premium", 0.18),
    ("high", 0.14),
    ("medium", 0.08),
    ("low", 0.03),
];

const FERTILIZER_DEFAULT: f64 = 0.05;
const SOIL_DEFAULT: f64 = 0.08;
const IRRIGATION_DEFAULT: f64 = 0.03;
const QUALITY_DEFAULT: f64 = 0.03;

/// Weight when the organic attribute equals "organic" / anything else.
const ORGANIC_WEIGHT: f64 = 0.25;
const NON_ORGANIC_WEIGHT: f64 = 0.10;

/// Bonus when an organic lot also uses a compost-family fertilizer.
const INTERACTION_BONUS: f64 = 0.08;

/// Quantity contributes `quantity / 500`, capped at this value.
const QUANTITY_CAP: f64 = 0.12;

/// Result of grading one produce lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingResult {
    pub score: f64,
    pub grade: String,
    pub certification: String,
}

fn weight_for(table: &[(&str, f64)], value: &str, default: f64) -> f64 {
    let value = value.to_lowercase();
    table
        .iter()
        .find(|(name, _)| *name == value)
        .map(|(_, w)| *w)
        .unwrap_or(default)
}

/// Maps a final score (0.0–1.0) to a letter grade and certification label.
///
/// | Range       | Grade | Certification        |
/// |-------------|-------|----------------------|
/// | >= 0.85     | A+    | Organic Premium Plus |
/// | >= 0.70     | A     | Organic Premium      |
/// | >= 0.55     | B     | Certified Good       |
/// | >= 0.40     | C     | Standard             |
/// | < 0.40      | D     | Needs Improvement    |
pub fn band(score: f64) -> (&'static str, &'static str) {
    match score {
        s if s >= 0.85 => ("A+", "Organic Premium Plus"),
        s if s >= 0.70 => ("A", "Organic Premium"),
        s if s >= 0.55 => ("B", "Certified Good"),
        s if s >= 0.40 => ("C", "Standard"),
        _ => ("D", "Needs Improvement"),
    }
}

/// Grades one produce lot from its stored attributes.
///
/// String attributes are matched case-insensitively and unknown values fall
/// back to the default weight for their table rather than failing. The score
/// is clamped to [0.0, 1.0] and rounded to two decimal places before the
/// grade band is applied.
pub fn grade_produce(
    fertilizer: &str,
    organic: &str,
    soil: &str,
    irrigation: &str,
    quantity: f64,
    quality: &str,
) -> GradingResult {
    let fertilizer = fertilizer.to_lowercase();
    let is_organic = organic.to_lowercase() == "organic";

    let mut score = 0.0;
    score += weight_for(FERTILIZER_WEIGHTS, &fertilizer, FERTILIZER_DEFAULT);
    score += if is_organic {
        ORGANIC_WEIGHT
    } else {
        NON_ORGANIC_WEIGHT
    };
    score += weight_for(SOIL_WEIGHTS, soil, SOIL_DEFAULT);
    score += weight_for(IRRIGATION_WEIGHTS, irrigation, IRRIGATION_DEFAULT);
    score += weight_for(QUALITY_WEIGHTS, quality, QUALITY_DEFAULT);
    score += (quantity / 500.0).max(0.0).min(QUANTITY_CAP);

    if is_organic
        && matches!(
            fertilizer.as_str(),
            "compost" | "vermicompost" | "biofertilizer"
        )
    {
        score += INTERACTION_BONUS;
    }

    let score = (score.clamp(0.0, 1.0) * 100.0).round() / 100.0;
    let (grade, certification) = band(score);

    GradingResult {
        score,
        grade: grade.to_string(),
        certification: certification.to_string(),
    }
}
