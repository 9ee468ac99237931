//! Multiple linear regression of each survey question on the other five.
//!
//! For every target `qk` an ordinary least squares model
//! `qk ~ 1 + q(others)` is fitted by solving the normal equations. When the
//! design is rank deficient (for example two answers that always move
//! together) the fit falls back to ridge with a small penalty on the slopes,
//! leaving the intercept unpenalized.

use serde::Serialize;
use tracing::warn;

use crate::errors::ServiceError;
use crate::survey::SurveyResponse;

pub const QUESTIONS: [&str; 6] = ["q1", "q2", "q3", "q4", "q5", "q6"];
pub const MIN_RESPONSES: usize = 6;

// intercept + five predictors
const PARAMS: usize = QUESTIONS.len();
const RIDGE_ALPHA: f64 = 0.001;
const PIVOT_EPS: f64 = 1e-10;

type Matrix = [[f64; PARAMS]; PARAMS];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMethod {
    #[serde(rename = "OLS")]
    Ols,
    Ridge,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegressionResult {
    pub target_question: String,
    pub target_idx: usize,
    pub predictor_indices: Vec<usize>,
    /// Intercept first, then one slope per predictor in `predictor_indices` order.
    pub beta: Vec<f64>,
    /// `None` for ridge fits or when there are no residual degrees of freedom.
    pub standard_errors: Option<Vec<f64>>,
    pub t_stats: Option<Vec<Option<f64>>>,
    pub r2: f64,
    pub adj_r2: Option<f64>,
    pub rmse: f64,
    pub n: usize,
    pub method: FitMethod,
}

/// Fit one model per question over the responses that carry numeric
/// answers for all six questions.
///
/// Fewer than [`MIN_RESPONSES`] such responses is a validation error. Targets
/// whose system cannot be solved even with the ridge penalty are skipped.
pub fn analyze(responses: &[SurveyResponse]) -> Result<Vec<RegressionResult>, ServiceError> {
    let rows = complete_rows(responses);
    if rows.len() < MIN_RESPONSES {
        return Err(ServiceError::Validation(format!(
            "need at least {MIN_RESPONSES} complete responses for regression, have {}",
            rows.len()
        )));
    }

    Ok((0..PARAMS)
        .filter_map(|target| {
            let fit = fit_target(&rows, target);
            if fit.is_none() {
                warn!(target = QUESTIONS[target], rows = rows.len(), "regression system is singular, skipping");
            }
            fit
        })
        .collect())
}

fn complete_rows(responses: &[SurveyResponse]) -> Vec<[f64; PARAMS]> {
    responses
        .iter()
        .filter_map(|r| {
            let mut row = [0.0; PARAMS];
            for (slot, key) in row.iter_mut().zip(QUESTIONS) {
                *slot = r.get(key)?.as_f64()?;
            }
            Some(row)
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn fit_target(rows: &[[f64; PARAMS]], target: usize) -> Option<RegressionResult> {
    let predictors: Vec<usize> = (0..PARAMS).filter(|&i| i != target).collect();
    let design: Vec<[f64; PARAMS]> = rows
        .iter()
        .map(|row| {
            let mut x = [1.0; PARAMS];
            for (slot, &p) in x[1..].iter_mut().zip(&predictors) {
                *slot = row[p];
            }
            x
        })
        .collect();
    let y: Vec<f64> = rows.iter().map(|row| row[target]).collect();

    let mut xtx: Matrix = [[0.0; PARAMS]; PARAMS];
    let mut xty = [0.0; PARAMS];
    for (x, &yi) in design.iter().zip(&y) {
        for i in 0..PARAMS {
            xty[i] += x[i] * yi;
            for j in 0..PARAMS {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }

    let (method, inverse) = match invert(&xtx) {
        Some(inv) => (FitMethod::Ols, inv),
        None => {
            let mut penalized = xtx;
            for (i, row) in penalized.iter_mut().enumerate().skip(1) {
                row[i] += RIDGE_ALPHA;
            }
            (FitMethod::Ridge, invert(&penalized)?)
        }
    };
    let beta: Vec<f64> = inverse.iter().map(|row| dot(row, &xty)).collect();

    let n = rows.len();
    let mean = y.iter().sum::<f64>() / n as f64;
    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for (x, &yi) in design.iter().zip(&y) {
        ss_res += (yi - dot(x, &beta)).powi(2);
        ss_tot += (yi - mean).powi(2);
    }

    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };
    let dof = n - PARAMS;
    let adj_r2 = (dof > 0).then(|| 1.0 - (1.0 - r2) * (n - 1) as f64 / dof as f64);
    // OLS reports the residual standard error, ridge the plain root mean square.
    let rmse = if method == FitMethod::Ols && dof > 0 {
        (ss_res / dof as f64).sqrt()
    } else {
        (ss_res / n as f64).sqrt()
    };

    let standard_errors = (method == FitMethod::Ols && dof > 0).then(|| {
        let sigma2 = ss_res / dof as f64;
        (0..PARAMS).map(|i| (sigma2 * inverse[i][i]).max(0.0).sqrt()).collect::<Vec<_>>()
    });
    let t_stats = standard_errors
        .as_ref()
        .map(|se| se.iter().zip(&beta).map(|(s, b)| (*s > 0.0).then(|| b / s)).collect());

    Some(RegressionResult {
        target_question: format!("Question {}", target + 1),
        target_idx: target,
        predictor_indices: predictors,
        beta,
        standard_errors,
        t_stats,
        r2,
        adj_r2,
        rmse,
        n,
        method,
    })
}

/// Gauss-Jordan inverse with partial pivoting. `None` when a pivot is
/// negligible relative to the largest diagonal entry.
fn invert(m: &Matrix) -> Option<Matrix> {
    let scale = (0..PARAMS).map(|i| m[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 {
        return None;
    }

    let mut a = *m;
    let mut inv: Matrix = [[0.0; PARAMS]; PARAMS];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..PARAMS {
        let pivot = (col..PARAMS).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPS * scale {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..PARAMS {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        let (pivot_row, pivot_inv) = (a[col], inv[col]);
        for r in (0..PARAMS).filter(|&r| r != col) {
            let f = a[r][col];
            if f == 0.0 {
                continue;
            }
            for j in 0..PARAMS {
                a[r][j] -= f * pivot_row[j];
                inv[r][j] -= f * pivot_inv[j];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(q: [f64; 6]) -> SurveyResponse {
        match json!({"timestamp": "t", "q1": q[0], "q2": q[1], "q3": q[2], "q4": q[3], "q5": q[4], "q6": q[5]}) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    // q2..q6 vary independently; q1 = 0.1 + 0.5*q2 - 0.25*q3 exactly.
    fn exact_linear_rows(n: usize) -> Vec<SurveyResponse> {
        (0..n)
            .map(|i| {
                let t = i as f64 + 1.0;
                let q2 = (0.7 * t).sin();
                let q3 = (1.3 * t + 0.4).sin();
                let q4 = (2.1 * t + 1.0).cos();
                let q5 = (0.37 * t * t).sin();
                let q6 = (3.3 * t + 0.2).cos();
                response([0.1 + 0.5 * q2 - 0.25 * q3, q2, q3, q4, q5, q6])
            })
            .collect()
    }

    #[test]
    fn too_few_responses_is_a_validation_error() {
        let rows = exact_linear_rows(5);
        assert!(matches!(analyze(&rows), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn incomplete_responses_do_not_count() {
        let mut rows = exact_linear_rows(5);
        rows.push(response([0.1, 0.2, 0.3, 0.4, 0.5, 0.6]));
        rows[5].remove("q4");
        rows.push(match json!({"timestamp": "t", "q1": "high"}) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        });
        assert!(matches!(analyze(&rows), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn recovers_exact_linear_relationship() -> Result<(), ServiceError> {
        let results = analyze(&exact_linear_rows(10))?;
        assert_eq!(results.len(), 6);

        let q1 = &results[0];
        assert_eq!(q1.target_question, "Question 1");
        assert_eq!(q1.predictor_indices, vec![1, 2, 3, 4, 5]);
        assert_eq!(q1.method, FitMethod::Ols);
        assert_eq!(q1.n, 10);
        let expected = [0.1, 0.5, -0.25, 0.0, 0.0, 0.0];
        for (got, want) in q1.beta.iter().zip(expected) {
            assert!((got - want).abs() < 1e-8, "beta {:?} != {:?}", q1.beta, expected);
        }
        assert!((q1.r2 - 1.0).abs() < 1e-9);
        assert!(q1.rmse < 1e-8);
        assert_eq!(q1.standard_errors.as_ref().map(Vec::len), Some(6));
        Ok(())
    }

    #[test]
    fn collinear_predictors_fall_back_to_ridge() -> Result<(), ServiceError> {
        let rows: Vec<_> = (0..8)
            .map(|i| {
                let t = i as f64 + 1.0;
                let q2 = (0.9 * t).sin();
                response([(1.7 * t).cos(), q2, q2, (0.5 * t).cos(), (2.3 * t).sin(), (0.21 * t * t).cos()])
            })
            .collect();
        let results = analyze(&rows)?;

        // q2 and q3 are both predictors of q1 only
        assert_eq!(results[0].method, FitMethod::Ridge);
        assert!(results[0].standard_errors.is_none());
        assert!(results[0].beta.iter().all(|b| b.is_finite()));
        assert_eq!(results[1].method, FitMethod::Ols);
        Ok(())
    }

    #[test]
    fn result_serializes_with_camel_case_keys() -> Result<(), ServiceError> {
        let results = analyze(&exact_linear_rows(6))?;
        let v = serde_json::to_value(&results[0]).map_err(|e| ServiceError::Validation(e.to_string()))?;
        assert_eq!(v["targetQuestion"], "Question 1");
        assert_eq!(v["method"], "OLS");
        assert_eq!(v["n"], 6);
        // six rows, six parameters: no residual degrees of freedom
        assert!(v["adjR2"].is_null());
        assert!(v["standardErrors"].is_null());
        Ok(())
    }
}
