//! Synthetic survey responses for admins seeding or demoing a deployment.
//!
//! Each generated record carries a timestamp and six answers `q1..q6` in
//! `[-1, 1]`, rounded to two decimals.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{json, Value};

use crate::errors::ServiceError;
use crate::survey::{SurveyResponse, TIMESTAMP_FIELD};

pub const QUESTION_COUNT: usize = 6;
pub const MAX_GENERATED: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// N(0, 0.3)
    Normal,
    /// U(-1, 1)
    Uniform,
    /// N(+-0.5, 0.2), peak picked per answer
    Bimodal,
}

impl Distribution {
    /// Unknown names fall back to `Uniform`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "bimodal" => Self::Bimodal,
            _ => Self::Uniform,
        }
    }

    fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        match self {
            Self::Normal => gaussian(rng, 0.0, 0.3),
            Self::Uniform => rng.gen_range(-1.0..1.0),
            Self::Bimodal => {
                let peak = if rng.gen_bool(0.5) { 0.5 } else { -0.5 };
                gaussian(rng, peak, 0.2)
            }
        }
    }
}

// Box-Muller; u1 is kept in (0, 1] so ln() stays finite.
fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn round2(v: f64) -> f64 {
    (v.clamp(-1.0, 1.0) * 100.0).round() / 100.0
}

/// Build `count` records stamped with `now`.
pub fn generate<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    distribution: Distribution,
    now: DateTime<Utc>,
) -> Result<Vec<SurveyResponse>, ServiceError> {
    if count == 0 || count > MAX_GENERATED {
        return Err(ServiceError::Validation(format!(
            "num_responses must be between 1 and {MAX_GENERATED}"
        )));
    }
    let timestamp = now.to_rfc3339();
    let records = (0..count)
        .map(|_| {
            let mut record = SurveyResponse::new();
            record.insert(TIMESTAMP_FIELD.to_string(), Value::String(timestamp.clone()));
            for q in 1..=QUESTION_COUNT {
                record.insert(format!("q{q}"), json!(round2(distribution.sample(&mut *rng))));
            }
            record
        })
        .collect();
    Ok(records)
}

/// `generate` with the thread-local RNG and the current time.
pub fn generate_now(count: usize, distribution: Distribution) -> Result<Vec<SurveyResponse>, ServiceError> {
    generate(&mut rand::thread_rng(), count, distribution, Utc::now())
}
