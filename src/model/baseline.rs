use super::types::{
    Decomposition, Model, ModelErrorCode, ModelFailure, ModelMetadata, ModelOptions, ModelOutput,
    ValidityMask,
};

const DEFAULT_SES_ALPHA: f64 = 0.3;
const MAX_DETECTED_PERIOD: usize = 52;
const MIN_SEASONAL_ACF: f64 = 0.3;
const MIN_TREND_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMethod {
    Naive,
    SeasonalNaive,
    HistoricAverage,
    Ses,
}

impl BaselineMethod {
    pub fn parse(method: &str) -> Option<Self> {
        let normalized: String = method
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "naive" => Some(Self::Naive),
            "seasonalnaive" | "snaive" => Some(Self::SeasonalNaive),
            "historicaverage" | "mean" | "average" => Some(Self::HistoricAverage),
            "ses" | "ets" | "simpleexponentialsmoothing" => Some(Self::Ses),
            _ => None,
        }
    }

    fn accepts_spec(&self) -> bool {
        matches!(self, Self::Ses)
    }
}

/// Reference forecasters: naive, seasonal naive, historic average and
/// simple exponential smoothing, with normal-approximation intervals.
#[derive(Debug, Clone, Default)]
pub struct BaselineModels;

impl BaselineModels {
    pub fn new() -> Self {
        Self
    }
}

impl Model for BaselineModels {
    fn forecast(
        &self,
        values: &[f64],
        validity: Option<&ValidityMask>,
        options: &ModelOptions,
    ) -> Result<ModelOutput, ModelFailure> {
        let method = BaselineMethod::parse(&options.method).ok_or_else(|| {
            ModelFailure::new(
                ModelErrorCode::InvalidModel,
                format!("unknown forecasting method '{}'", options.method),
            )
        })?;

        if options.model_spec.is_some() && !method.accepts_spec() {
            return Err(ModelFailure::new(
                ModelErrorCode::InvalidModel,
                format!("a model spec is only valid with SES/ETS, not '{}'", options.method),
            ));
        }
        if options.horizon == 0 {
            return Err(ModelFailure::new(
                ModelErrorCode::InvalidInput,
                "horizon must be positive",
            ));
        }
        if !(options.confidence_level > 0.0 && options.confidence_level < 1.0) {
            return Err(ModelFailure::new(
                ModelErrorCode::InvalidInput,
                format!(
                    "confidence level must be in (0, 1), got {}",
                    options.confidence_level
                ),
            ));
        }

        let observed = observed_values(values, validity);
        let z = normal_quantile(0.5 + options.confidence_level / 2.0);

        let fit = match method {
            BaselineMethod::Naive => fit_naive(observed, options.horizon)?,
            BaselineMethod::SeasonalNaive => {
                let period = if options.seasonal_period > 0 {
                    options.seasonal_period
                } else if options.auto_detect_seasonality {
                    detect_period(&observed).unwrap_or(1)
                } else {
                    return Err(ModelFailure::new(
                        ModelErrorCode::InvalidInput,
                        "seasonal naive needs a seasonal period",
                    ));
                };
                fit_seasonal_naive(observed, period, options.horizon)?
            }
            BaselineMethod::HistoricAverage => fit_mean(observed, options.horizon)?,
            BaselineMethod::Ses => {
                let alpha = match options.model_spec.as_deref() {
                    Some(spec) => parse_alpha(spec)?,
                    None => DEFAULT_SES_ALPHA,
                };
                fit_ses(observed, alpha, options.horizon)?
            }
        };

        Ok(fit.into_output(z, options))
    }

    /// Centered moving-average trend plus per-phase seasonal means. Without
    /// a usable cycle only the trend is extracted.
    fn decompose(
        &self,
        values: &[f64],
        validity: Option<&ValidityMask>,
        options: &ModelOptions,
    ) -> Result<Decomposition, ModelFailure> {
        let observed = observed_values(values, validity);
        require(&observed, 1, "Decomposition")?;

        let period = if options.seasonal_period > 0 {
            Some(options.seasonal_period)
        } else if options.auto_detect_seasonality {
            detect_period(&observed)
        } else {
            None
        };
        match period.filter(|p| *p >= 2) {
            Some(p) => {
                require(&observed, 2 * p, "Seasonal decomposition")?;
                Ok(seasonal_decompose(&observed, p))
            }
            None => Ok(trend_decompose(&observed)),
        }
    }
}

struct Fit {
    name: String,
    observed: Vec<f64>,
    /// In-sample one-step fits aligned with `observed`, NaN where undefined.
    fitted: Vec<f64>,
    point: Vec<f64>,
    /// Multiplier of sigma for each forecast step.
    spread: Vec<f64>,
    params: usize,
}

impl Fit {
    fn into_output(self, z: f64, options: &ModelOptions) -> ModelOutput {
        let residuals: Vec<f64> = self
            .observed
            .iter()
            .zip(&self.fitted)
            .map(|(y, f)| y - f)
            .collect();
        let defined: Vec<f64> = residuals.iter().copied().filter(|r| r.is_finite()).collect();
        let mse = if defined.is_empty() {
            None
        } else {
            Some(defined.iter().map(|r| r * r).sum::<f64>() / defined.len() as f64)
        };

        let (lower, upper) = match mse.map(f64::sqrt) {
            Some(sigma) => {
                let width: Vec<f64> = self.spread.iter().map(|k| z * sigma * k).collect();
                let lower = self.point.iter().zip(&width).map(|(p, w)| p - w).collect();
                let upper = self.point.iter().zip(&width).map(|(p, w)| p + w).collect();
                (Some(lower), Some(upper))
            }
            None => (None, None),
        };

        let (aic, bic) = match mse {
            Some(m) if m > 0.0 => {
                let n = self.observed.len() as f64;
                let k = self.params as f64;
                (Some(n * m.ln() + 2.0 * k), Some(n * m.ln() + k * n.ln()))
            }
            _ => (None, None),
        };

        ModelOutput {
            point: self.point,
            lower,
            upper,
            fitted: options.include_fitted.then_some(self.fitted),
            residuals: options.include_residuals.then_some(residuals),
            metadata: ModelMetadata {
                name: self.name,
                aic,
                bic,
                mse,
            },
        }
    }
}

fn observed_values(values: &[f64], validity: Option<&ValidityMask>) -> Vec<f64> {
    values
        .iter()
        .enumerate()
        .filter(|(i, v)| v.is_finite() && validity.map_or(true, |m| m.is_valid(*i)))
        .map(|(_, v)| *v)
        .collect()
}

fn require(observed: &[f64], needed: usize, method: &str) -> Result<(), ModelFailure> {
    if observed.len() < needed {
        return Err(ModelFailure::new(
            ModelErrorCode::InsufficientData,
            format!(
                "{} needs at least {} observations, got {}",
                method,
                needed,
                observed.len()
            ),
        ));
    }
    Ok(())
}

fn fit_naive(observed: Vec<f64>, horizon: usize) -> Result<Fit, ModelFailure> {
    require(&observed, 2, "Naive")?;
    let last = observed[observed.len() - 1];
    let mut fitted = vec![f64::NAN; observed.len()];
    for t in 1..observed.len() {
        fitted[t] = observed[t - 1];
    }
    Ok(Fit {
        name: "Naive".to_string(),
        observed,
        fitted,
        point: vec![last; horizon],
        spread: (1..=horizon).map(|h| (h as f64).sqrt()).collect(),
        params: 0,
    })
}

fn fit_seasonal_naive(
    observed: Vec<f64>,
    period: usize,
    horizon: usize,
) -> Result<Fit, ModelFailure> {
    require(&observed, period + 1, "SeasonalNaive")?;
    let n = observed.len();
    let mut fitted = vec![f64::NAN; n];
    for t in period..n {
        fitted[t] = observed[t - period];
    }
    let point = (0..horizon)
        .map(|h| observed[n - period + (h % period)])
        .collect();
    let spread = (0..horizon)
        .map(|h| ((h / period + 1) as f64).sqrt())
        .collect();
    Ok(Fit {
        name: format!("SeasonalNaive({})", period),
        observed,
        fitted,
        point,
        spread,
        params: 0,
    })
}

fn fit_mean(observed: Vec<f64>, horizon: usize) -> Result<Fit, ModelFailure> {
    require(&observed, 2, "HistoricAverage")?;
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;
    let fitted = vec![mean; observed.len()];
    Ok(Fit {
        name: "HistoricAverage".to_string(),
        observed,
        fitted,
        point: vec![mean; horizon],
        spread: vec![(1.0 + 1.0 / n).sqrt(); horizon],
        params: 1,
    })
}

fn fit_ses(observed: Vec<f64>, alpha: f64, horizon: usize) -> Result<Fit, ModelFailure> {
    require(&observed, 2, "SES")?;
    let mut fitted = vec![f64::NAN; observed.len()];
    let mut level = observed[0];
    for t in 1..observed.len() {
        fitted[t] = level;
        level += alpha * (observed[t] - level);
    }
    if !level.is_finite() {
        return Err(ModelFailure::new(
            ModelErrorCode::Computation,
            "exponential smoothing diverged",
        ));
    }
    let spread = (0..horizon)
        .map(|h| (1.0 + h as f64 * alpha * alpha).sqrt())
        .collect();
    Ok(Fit {
        name: format!("SES({:.2})", alpha),
        observed,
        fitted,
        point: vec![level; horizon],
        spread,
        params: 2,
    })
}

/// Mean over an odd window of `2 * (window / 2) + 1` points centered on
/// each value; edges repeat the nearest full window. Series shorter than
/// the window get their overall mean.
fn centered_trend(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window / 2;
    let span = 2 * half + 1;
    if span > n {
        let mean = values.iter().sum::<f64>() / n as f64;
        return vec![mean; n];
    }

    let mut trend = vec![0.0; n];
    for i in half..n - half {
        trend[i] = values[i - half..=i + half].iter().sum::<f64>() / span as f64;
    }
    let (first, last) = (trend[half], trend[n - half - 1]);
    trend[..half].fill(first);
    trend[n - half..].fill(last);
    trend
}

fn trend_decompose(observed: &[f64]) -> Decomposition {
    let trend = centered_trend(observed, (observed.len() / 5).max(MIN_TREND_WINDOW));
    let remainder = observed.iter().zip(&trend).map(|(y, t)| y - t).collect();
    Decomposition {
        trend,
        seasonal: None,
        period: None,
        remainder,
    }
}

fn seasonal_decompose(observed: &[f64], period: usize) -> Decomposition {
    let trend = centered_trend(observed, period);
    let detrended: Vec<f64> = observed.iter().zip(&trend).map(|(y, t)| y - t).collect();

    let mut phase_means: Vec<f64> = (0..period)
        .map(|phase| {
            let cycle: Vec<f64> = detrended.iter().skip(phase).step_by(period).copied().collect();
            cycle.iter().sum::<f64>() / cycle.len() as f64
        })
        .collect();
    let offset = phase_means.iter().sum::<f64>() / period as f64;
    for m in &mut phase_means {
        *m -= offset;
    }

    let seasonal: Vec<f64> = (0..observed.len()).map(|t| phase_means[t % period]).collect();
    let remainder = detrended.iter().zip(&seasonal).map(|(d, s)| d - s).collect();
    Decomposition {
        trend,
        seasonal: Some(seasonal),
        period: Some(period),
        remainder,
    }
}

/// Accepts `"0.4"` or `"alpha=0.4"`.
fn parse_alpha(spec: &str) -> Result<f64, ModelFailure> {
    let raw = spec
        .trim()
        .strip_prefix("alpha=")
        .unwrap_or(spec.trim())
        .trim();
    match raw.parse::<f64>() {
        Ok(alpha) if alpha > 0.0 && alpha <= 1.0 => Ok(alpha),
        _ => Err(ModelFailure::new(
            ModelErrorCode::InvalidModel,
            format!("invalid SES model spec '{}', expected alpha in (0, 1]", spec),
        )),
    }
}

/// Lag with the strongest autocorrelation above a fixed threshold.
fn detect_period(observed: &[f64]) -> Option<usize> {
    let n = observed.len();
    if n < 4 {
        return None;
    }
    let mean = observed.iter().sum::<f64>() / n as f64;
    let denom: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    if denom == 0.0 {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for lag in 2..=MAX_DETECTED_PERIOD.min(n / 2) {
        let num: f64 = (lag..n)
            .map(|t| (observed[t] - mean) * (observed[t - lag] - mean))
            .sum();
        let acf = num / denom;
        if acf > MIN_SEASONAL_ACF && best.map_or(true, |(_, b)| acf > b) {
            best = Some((lag, acf));
        }
    }
    best.map(|(lag, _)| lag)
}

/// Inverse standard normal CDF (Acklam's rational approximation).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}
