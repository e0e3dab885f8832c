//! Labelled pillar curves.
//!
//! A [`Curve`] is an ordered vector of labelled, dated pillars. The same
//! structure serves rate/price curves and ATM-volatility vectors: bump
//! application, per-point addressing and whole-vector shifts are identical
//! for both.

use chrono::NaiveDate;

use super::MarketDataError;
use crate::shift::Shift;
use crate::types::FactorId;

/// One curve pillar.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CurvePoint {
    /// Pillar label, e.g. `"3M"`, `"5Y"`, a futures code or an expiry tag.
    pub label: String,
    /// Pillar date.
    pub date: NaiveDate,
    /// Pillar value (rate, price or volatility).
    pub value: f64,
}

impl CurvePoint {
    /// Creates a pillar.
    pub fn new(label: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self {
            label: label.into(),
            date,
            value,
        }
    }
}

/// An ordered, labelled pillar vector.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use risk_core::market::{Curve, CurvePoint};
///
/// let d = |m| NaiveDate::from_ymd_opt(2025, m, 1).unwrap();
/// let curve = Curve::new(vec![
///     CurvePoint::new("1M", d(2), 0.040),
///     CurvePoint::new("3M", d(4), 0.042),
///     CurvePoint::new("6M", d(7), 0.045),
/// ]).unwrap();
///
/// assert_eq!(curve.value_at("3M"), Some(0.042));
/// assert!((curve.mean_level() - 0.042333333).abs() < 1e-6);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Creates a curve from pillars. At least one pillar is required.
    pub fn new(points: Vec<CurvePoint>) -> Result<Self, MarketDataError> {
        if points.is_empty() {
            return Err(MarketDataError::EmptyCurve);
        }
        Ok(Self { points })
    }

    /// Convenience constructor: a flat curve with a single pillar.
    pub fn flat(label: impl Into<String>, date: NaiveDate, value: f64) -> Self {
        Self {
            points: vec![CurvePoint::new(label, date, value)],
        }
    }

    /// The pillars, in construction order.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Number of pillars.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false: construction requires at least one pillar.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value at a labelled pillar, if present.
    pub fn value_at(&self, label: &str) -> Option<f64> {
        self.points.iter().find(|p| p.label == label).map(|p| p.value)
    }

    /// Mean of all pillar values.
    pub fn mean_level(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64
    }

    /// Applies one shift to every pillar.
    pub fn shift_all(&mut self, shift: Shift<f64>) {
        for point in &mut self.points {
            point.value = shift.apply(point.value);
        }
    }

    /// Applies a per-pillar shift vector, in pillar order.
    ///
    /// The vector length must match the pillar count.
    pub fn shift_vector(&mut self, shifts: &[Shift<f64>]) -> Result<(), MarketDataError> {
        if shifts.len() != self.points.len() {
            return Err(MarketDataError::PillarCountMismatch {
                got: shifts.len(),
                expected: self.points.len(),
            });
        }
        for (point, shift) in self.points.iter_mut().zip(shifts) {
            point.value = shift.apply(point.value);
        }
        Ok(())
    }

    /// Applies one shift to a single labelled pillar.
    ///
    /// `curve_id` is only used to report the owning curve on error.
    pub fn shift_point(
        &mut self,
        curve_id: &FactorId,
        label: &str,
        shift: Shift<f64>,
    ) -> Result<(), MarketDataError> {
        let point = self
            .points
            .iter_mut()
            .find(|p| p.label == label)
            .ok_or_else(|| MarketDataError::UnknownPillar {
                curve: curve_id.clone(),
                label: label.to_string(),
            })?;
        point.value = shift.apply(point.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, 1).unwrap()
    }

    fn sample() -> Curve {
        Curve::new(vec![
            CurvePoint::new("1M", d(2), 0.040),
            CurvePoint::new("3M", d(4), 0.042),
            CurvePoint::new("6M", d(7), 0.045),
        ])
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(Curve::new(vec![]).unwrap_err(), MarketDataError::EmptyCurve);
    }

    #[test]
    fn test_value_at_label() {
        let curve = sample();
        assert_eq!(curve.value_at("6M"), Some(0.045));
        assert_eq!(curve.value_at("10Y"), None);
    }

    #[test]
    fn test_mean_level() {
        assert_relative_eq!(sample().mean_level(), (0.040 + 0.042 + 0.045) / 3.0);
    }

    #[test]
    fn test_shift_all_absolute() {
        let mut curve = sample();
        curve.shift_all(Shift::absolute(0.0001));
        assert_relative_eq!(curve.value_at("1M").unwrap(), 0.0401);
        assert_relative_eq!(curve.value_at("6M").unwrap(), 0.0451);
    }

    #[test]
    fn test_shift_vector_relative() {
        let mut curve = sample();
        curve
            .shift_vector(&[
                Shift::relative(0.10),
                Shift::relative(0.0),
                Shift::relative(-0.10),
            ])
            .unwrap();
        assert_relative_eq!(curve.value_at("1M").unwrap(), 0.044);
        assert_relative_eq!(curve.value_at("3M").unwrap(), 0.042);
        assert_relative_eq!(curve.value_at("6M").unwrap(), 0.0405);
    }

    #[test]
    fn test_shift_vector_length_mismatch() {
        let mut curve = sample();
        let err = curve.shift_vector(&[Shift::absolute(0.1)]).unwrap_err();
        assert_eq!(
            err,
            MarketDataError::PillarCountMismatch { got: 1, expected: 3 }
        );
    }

    #[test]
    fn test_shift_point() {
        let mut curve = sample();
        let id = FactorId::new("IR.USD.OIS");
        curve.shift_point(&id, "3M", Shift::absolute(0.0001)).unwrap();
        assert_relative_eq!(curve.value_at("3M").unwrap(), 0.0421);
        // Other pillars untouched.
        assert_relative_eq!(curve.value_at("1M").unwrap(), 0.040);
    }

    #[test]
    fn test_shift_point_unknown_pillar() {
        let mut curve = sample();
        let id = FactorId::new("IR.USD.OIS");
        let err = curve
            .shift_point(&id, "30Y", Shift::absolute(0.0001))
            .unwrap_err();
        assert!(matches!(err, MarketDataError::UnknownPillar { .. }));
    }
}
