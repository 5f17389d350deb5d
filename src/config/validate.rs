//! Configuration validation.
//!
//! Every rule violation is a distinct, fatal `ConfigError`; nothing is silently
//! defaulted except blank output destinations and near-integer options, which are
//! normalized by [`normalize_option`].

use std::collections::HashSet;

use crate::config::raw::{RawConfig, RawHorizonRange, RawOutputs, RawRegressor};
use crate::domain::{
    CANONICAL_QUANTILES, HorizonRange, QuantileSet, RegressorSet, Transform, TransformKind,
    TransformSpec, same_level,
};
use crate::error::ConfigError;

/// Absolute tolerance for treating a transform option as an integer.
pub const OPTION_INT_TOLERANCE: f64 = 1e-5;

/// Identifiers of the input tables; no output may be written over them.
pub const RESERVED_INPUTS: [&str; 5] = [
    "Readme",
    "Input_parameters",
    "Partition_groups",
    "Data",
    "Processing_Log",
];

/// Most horizons one local projection run may estimate.
pub const MAX_PROJECTION_HORIZONS: usize = 120;

pub const DEFAULT_INPUT: &str = "Output_partitions";
pub const DEFAULT_QUANTREG: &str = "Quant reg coefficients";
pub const DEFAULT_COND_QUANT: &str = "Conditional quantiles";
pub const DEFAULT_LOCAL_PROJECTION: &str = "Local projections";

/// Resolved output destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTargets {
    /// Table holding the input data.
    pub input: String,
    pub quantreg: String,
    pub cond_quant: String,
    pub local_projection: String,
}

impl Default for OutputTargets {
    fn default() -> Self {
        Self {
            input: DEFAULT_INPUT.to_string(),
            quantreg: DEFAULT_QUANTREG.to_string(),
            cond_quant: DEFAULT_COND_QUANT.to_string(),
            local_projection: DEFAULT_LOCAL_PROJECTION.to_string(),
        }
    }
}

/// A fully validated modeling configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantfitConfig {
    pub target: String,
    pub horizon: usize,
    pub horizons: HorizonRange,
    pub quantiles: QuantileSet,
    pub regressors: RegressorSet,
    pub outputs: OutputTargets,
}

impl QuantfitConfig {
    /// Name of the horizon-shifted target column at the primary horizon.
    pub fn depvar(&self) -> String {
        crate::domain::shifted_target_name(&self.target, self.horizon)
    }
}

/// Validate a raw configuration record.
pub fn validate(raw: &RawConfig) -> Result<QuantfitConfig, ConfigError> {
    let quantiles = validate_quantiles(&raw.quantiles)?;

    let target = raw.target.trim();
    if target.is_empty() {
        return Err(ConfigError::EmptyTarget);
    }

    let horizon = validate_horizon(raw.horizon)?;
    let horizons = validate_horizon_range(raw.local_projection, horizon)?;
    let regressors = validate_regressors(&raw.regressors)?;
    let outputs = validate_outputs(&raw.outputs)?;

    Ok(QuantfitConfig {
        target: target.to_string(),
        horizon,
        horizons,
        quantiles,
        regressors,
        outputs,
    })
}

/// Levels must lie strictly in (0, 1), be unique, and include the canonical five.
pub fn validate_quantiles(levels: &[f64]) -> Result<QuantileSet, ConfigError> {
    if levels.is_empty() {
        return Err(ConfigError::EmptyQuantiles);
    }
    for &q in levels {
        if !(q.is_finite() && 0.0 < q && q < 1.0) {
            return Err(ConfigError::QuantileOutOfRange { value: q });
        }
    }
    for (i, &q) in levels.iter().enumerate() {
        if levels[..i].iter().any(|&p| same_level(p, q)) {
            return Err(ConfigError::DuplicateQuantile { value: q });
        }
    }
    for level in CANONICAL_QUANTILES {
        if !levels.iter().any(|&q| same_level(q, level)) {
            return Err(ConfigError::MissingCanonicalQuantile {
                level,
                given: levels.to_vec(),
            });
        }
    }
    Ok(QuantileSet::from_validated(levels.to_vec()))
}

fn validate_horizon(value: i64) -> Result<usize, ConfigError> {
    usize::try_from(value)
        .ok()
        .filter(|&h| h >= 1)
        .ok_or(ConfigError::InvalidHorizon { value })
}

fn validate_horizon_range(
    range: Option<RawHorizonRange>,
    horizon: usize,
) -> Result<HorizonRange, ConfigError> {
    let Some(range) = range else {
        return Ok(HorizonRange::single(horizon));
    };
    let err = ConfigError::InvalidHorizonRange {
        start: range.start,
        end: range.end,
        horizon,
    };
    let start = usize::try_from(range.start).map_err(|_| err.clone())?;
    let end = usize::try_from(range.end).map_err(|_| err.clone())?;
    let horizons = HorizonRange { start, end };
    if start < 1 || !horizons.contains(horizon) {
        return Err(err);
    }
    if horizons.len() > MAX_PROJECTION_HORIZONS {
        return Err(ConfigError::HorizonRangeTooWide {
            start: range.start,
            end: range.end,
            max: MAX_PROJECTION_HORIZONS,
        });
    }
    Ok(horizons)
}

fn validate_regressors(raw: &[RawRegressor]) -> Result<RegressorSet, ConfigError> {
    let mut set = RegressorSet::new();
    for (index, reg) in raw.iter().enumerate() {
        let source = reg.series.trim();
        if source.is_empty() {
            return Err(ConfigError::EmptySeriesName { index });
        }
        let transform = resolve_transform(source, &reg.transform, reg.option)?;
        set.push(TransformSpec {
            source: source.to_string(),
            transform,
        });
    }
    Ok(set)
}

/// Check one regressor's transform name and option and build the typed transform.
pub fn resolve_transform(
    regressor: &str,
    name: &str,
    option: Option<f64>,
) -> Result<Transform, ConfigError> {
    let kind = TransformKind::parse(name).ok_or_else(|| ConfigError::UnknownTransform {
        regressor: regressor.to_string(),
        given: name.to_string(),
    })?;

    if !kind.takes_option() {
        return match option {
            None => Ok(Transform::Identity),
            Some(given) => Err(ConfigError::UnexpectedOption {
                regressor: regressor.to_string(),
                transform: kind.display_name().to_string(),
                given,
            }),
        };
    }

    let k = option
        .and_then(normalize_option)
        .ok_or_else(|| ConfigError::NonIntegerOption {
            regressor: regressor.to_string(),
            transform: kind.display_name().to_string(),
            given: option,
        })?;

    if let Some(min) = kind.min_option() {
        if k < min {
            return Err(ConfigError::OptionBelowMinimum {
                regressor: regressor.to_string(),
                transform: kind.display_name().to_string(),
                given: k,
                min,
            });
        }
    }

    let out_of_range = || ConfigError::NonIntegerOption {
        regressor: regressor.to_string(),
        transform: kind.display_name().to_string(),
        given: option,
    };
    let window = || usize::try_from(k).map_err(|_| out_of_range());

    Ok(match kind {
        TransformKind::Identity => Transform::Identity,
        TransformKind::Lagged => Transform::Lagged(window()?),
        TransformKind::MovingAverage => Transform::MovingAverage(window()?),
        TransformKind::Difference => Transform::Difference(window()?),
        TransformKind::PercentChange => Transform::PercentChange(window()?),
        TransformKind::Power => Transform::Power(i32::try_from(k).map_err(|_| out_of_range())?),
    })
}

/// Round `value` to the nearest integer if it lies within [`OPTION_INT_TOLERANCE`] of it.
///
/// Applies to every option-bearing transform, including `Power`.
pub fn normalize_option(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if (rounded - value).abs() > OPTION_INT_TOLERANCE {
        return None;
    }
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    Some(rounded as i64)
}

fn validate_outputs(raw: &RawOutputs) -> Result<OutputTargets, ConfigError> {
    let pick = |value: &Option<String>, default: &str| -> String {
        value
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    let targets = OutputTargets {
        input: pick(&raw.input, DEFAULT_INPUT),
        quantreg: pick(&raw.quantreg, DEFAULT_QUANTREG),
        cond_quant: pick(&raw.cond_quant, DEFAULT_COND_QUANT),
        local_projection: pick(&raw.local_projection, DEFAULT_LOCAL_PROJECTION),
    };

    let outputs: [(&'static str, &str); 3] = [
        ("quantreg", &targets.quantreg),
        ("cond_quant", &targets.cond_quant),
        ("local_projection", &targets.local_projection),
    ];

    let mut seen: HashSet<&str> = HashSet::new();
    for (i, &(field, value)) in outputs.iter().enumerate() {
        if RESERVED_INPUTS.iter().any(|r| *r == value) || value == targets.input {
            return Err(ConfigError::ReservedDestination {
                field,
                value: value.to_string(),
            });
        }
        if !seen.insert(value) {
            let other = outputs[..i]
                .iter()
                .find(|(_, v)| *v == value)
                .map(|(f, _)| *f)
                .unwrap_or("another output");
            return Err(ConfigError::DuplicateDestination {
                field,
                other,
                value: value.to_string(),
            });
        }
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> RawConfig {
        RawConfig {
            target: "gdp".to_string(),
            horizon: 4,
            quantiles: CANONICAL_QUANTILES.to_vec(),
            regressors: vec![
                RawRegressor::new("fci", "None", None),
                RawRegressor::new("credit", "Lagged", Some(2.0)),
            ],
            local_projection: None,
            outputs: RawOutputs::default(),
        }
    }

    #[test]
    fn accepts_valid_config_with_defaults() {
        let cfg = validate(&base_config()).unwrap();
        assert_eq!(cfg.horizon, 4);
        assert_eq!(cfg.horizons, HorizonRange::single(4));
        assert_eq!(cfg.depvar(), "gdp_hz_4");
        assert_eq!(cfg.outputs, OutputTargets::default());
        assert_eq!(cfg.regressors.names(), vec!["fci_trans_0_None", "credit_trans_1_Lagged"]);
    }

    #[test]
    fn quantiles_must_be_inside_unit_interval() {
        for bad in [0.0, 1.0, -0.2, 1.5, f64::NAN] {
            let mut levels = CANONICAL_QUANTILES.to_vec();
            levels.push(bad);
            assert!(matches!(
                validate_quantiles(&levels),
                Err(ConfigError::QuantileOutOfRange { .. })
            ));
        }
    }

    #[test]
    fn every_canonical_quantile_is_required() {
        for skip in 0..CANONICAL_QUANTILES.len() {
            let levels: Vec<f64> = CANONICAL_QUANTILES
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, q)| *q)
                .collect();
            let err = validate_quantiles(&levels).unwrap_err();
            assert!(matches!(
                err,
                ConfigError::MissingCanonicalQuantile { level, .. }
                    if level == CANONICAL_QUANTILES[skip]
            ));
        }
    }

    #[test]
    fn extra_quantiles_are_kept_in_order() {
        let set = validate_quantiles(&[0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95]).unwrap();
        assert_eq!(set.len(), 7);
        assert_eq!(set.levels()[0], 0.05);
        assert!(set.contains(0.95));
    }

    #[test]
    fn duplicate_and_empty_quantiles_are_rejected() {
        assert_eq!(validate_quantiles(&[]), Err(ConfigError::EmptyQuantiles));
        let mut levels = CANONICAL_QUANTILES.to_vec();
        levels.push(0.5);
        assert!(matches!(
            validate_quantiles(&levels),
            Err(ConfigError::DuplicateQuantile { .. })
        ));
    }

    #[test]
    fn option_normalization_tolerance() {
        assert_eq!(normalize_option(3.0), Some(3));
        assert_eq!(normalize_option(3.000_001), Some(3));
        assert_eq!(normalize_option(2.999_999), Some(3));
        assert_eq!(normalize_option(2.5), None);
        assert_eq!(normalize_option(2.0001), None);
        assert_eq!(normalize_option(f64::INFINITY), None);
        assert_eq!(normalize_option(-2.0), Some(-2));
    }

    #[test]
    fn identity_rejects_option() {
        assert!(matches!(
            resolve_transform("fci", "None", Some(1.0)),
            Err(ConfigError::UnexpectedOption { .. })
        ));
        assert_eq!(resolve_transform("fci", "Identity", None), Ok(Transform::Identity));
    }

    #[test]
    fn option_bearing_transforms_require_integer_option() {
        assert!(matches!(
            resolve_transform("fci", "Lagged", Some(2.5)),
            Err(ConfigError::NonIntegerOption { .. })
        ));
        assert!(matches!(
            resolve_transform("fci", "Diff", None),
            Err(ConfigError::NonIntegerOption { .. })
        ));
        assert_eq!(
            resolve_transform("fci", "MVA", Some(3.000_002)),
            Ok(Transform::MovingAverage(3))
        );
        assert_eq!(resolve_transform("fci", "Power", Some(-1.0)), Ok(Transform::Power(-1)));
        // Non-integer exponents fall under the same integer rule.
        assert!(resolve_transform("fci", "Power", Some(0.5)).is_err());
    }

    #[test]
    fn window_options_have_lower_bounds() {
        assert!(matches!(
            resolve_transform("fci", "Lagged", Some(-1.0)),
            Err(ConfigError::OptionBelowMinimum { min: 0, .. })
        ));
        assert!(matches!(
            resolve_transform("fci", "MVA", Some(0.0)),
            Err(ConfigError::OptionBelowMinimum { min: 1, .. })
        ));
        assert_eq!(resolve_transform("fci", "Lagged", Some(0.0)), Ok(Transform::Lagged(0)));
    }

    #[test]
    fn unknown_transform_is_rejected() {
        let mut raw = base_config();
        raw.regressors.push(RawRegressor::new("fci", "Log", None));
        assert!(matches!(validate(&raw), Err(ConfigError::UnknownTransform { .. })));
    }

    #[test]
    fn horizon_and_range_rules() {
        let mut raw = base_config();
        raw.horizon = 0;
        assert!(matches!(validate(&raw), Err(ConfigError::InvalidHorizon { value: 0 })));

        let mut raw = base_config();
        raw.local_projection = Some(RawHorizonRange { start: 1, end: 8 });
        assert_eq!(validate(&raw).unwrap().horizons, HorizonRange { start: 1, end: 8 });

        raw.local_projection = Some(RawHorizonRange { start: 5, end: 8 });
        assert!(matches!(validate(&raw), Err(ConfigError::InvalidHorizonRange { .. })));

        raw.local_projection = Some(RawHorizonRange { start: 0, end: 8 });
        assert!(matches!(validate(&raw), Err(ConfigError::InvalidHorizonRange { .. })));
    }

    #[test]
    fn huge_projection_range_is_rejected() {
        let mut raw = base_config();
        raw.local_projection = Some(RawHorizonRange {
            start: 1,
            end: i64::MAX,
        });
        assert!(matches!(
            validate(&raw),
            Err(ConfigError::HorizonRangeTooWide { end: i64::MAX, .. })
        ));

        let widest = MAX_PROJECTION_HORIZONS as i64;
        raw.local_projection = Some(RawHorizonRange { start: 1, end: widest });
        assert_eq!(validate(&raw).unwrap().horizons.len(), MAX_PROJECTION_HORIZONS);

        raw.local_projection = Some(RawHorizonRange {
            start: 1,
            end: widest + 1,
        });
        assert!(matches!(
            validate(&raw),
            Err(ConfigError::HorizonRangeTooWide { .. })
        ));
    }

    #[test]
    fn empty_target_is_rejected() {
        let mut raw = base_config();
        raw.target = "  ".to_string();
        assert_eq!(validate(&raw), Err(ConfigError::EmptyTarget));
    }

    #[test]
    fn outputs_cannot_overwrite_inputs() {
        let mut raw = base_config();
        raw.outputs.quantreg = Some("Data".to_string());
        assert!(matches!(
            validate(&raw),
            Err(ConfigError::ReservedDestination { field: "quantreg", .. })
        ));

        let mut raw = base_config();
        raw.outputs.input = Some("Panel".to_string());
        raw.outputs.cond_quant = Some("Panel".to_string());
        assert!(matches!(
            validate(&raw),
            Err(ConfigError::ReservedDestination { field: "cond_quant", .. })
        ));
    }

    #[test]
    fn outputs_must_be_distinct() {
        let mut raw = base_config();
        raw.outputs.quantreg = Some("Results".to_string());
        raw.outputs.local_projection = Some("Results".to_string());
        assert!(matches!(
            validate(&raw),
            Err(ConfigError::DuplicateDestination {
                field: "local_projection",
                other: "quantreg",
                ..
            })
        ));
    }

    #[test]
    fn blank_outputs_fall_back_to_defaults() {
        let mut raw = base_config();
        raw.outputs.quantreg = Some("   ".to_string());
        raw.outputs.cond_quant = Some("GaR".to_string());
        let cfg = validate(&raw).unwrap();
        assert_eq!(cfg.outputs.quantreg, DEFAULT_QUANTREG);
        assert_eq!(cfg.outputs.cond_quant, "GaR");
    }
}
