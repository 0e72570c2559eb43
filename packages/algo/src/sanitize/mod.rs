use crate::types::DiagnosticResult;

/// Largest parameter magnitude still considered healthy
pub const MAX_HEALTHY_WEIGHT: f64 = 1e6;

/// True when any value is NaN or infinite
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Clamp a raw count-derived value into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Checks a set of parameter blocks for NaN, Inf and runaway magnitudes.
pub fn diagnose_parameters(blocks: &[&[f64]]) -> DiagnosticResult {
    let mut has_nan = false;
    let mut has_inf = false;
    let mut max_abs_weight: f64 = 0.0;

    for block in blocks {
        for &val in block.iter() {
            if val.is_nan() {
                has_nan = true;
            } else if val.is_infinite() {
                has_inf = true;
            } else {
                max_abs_weight = max_abs_weight.max(val.abs());
            }
        }
    }

    let is_healthy = !has_nan && !has_inf && max_abs_weight < MAX_HEALTHY_WEIGHT;

    let message = if is_healthy {
        "Model is healthy".to_string()
    } else if has_nan {
        "Model contains NaN values".to_string()
    } else if has_inf {
        "Model contains infinite values".to_string()
    } else {
        format!("Model has exploding weights: {:.2e}", max_abs_weight)
    };

    DiagnosticResult {
        is_healthy,
        has_nan,
        has_inf,
        max_abs_weight,
        message,
    }
}
