//! The market-factor steps: IR curves, FX spots/vols, asset curves/vegas.
//!
//! All five share one sub-step procedure per factor: select the factor's
//! risk-cube rows, book the Taylor estimate, move the working state's
//! copy of that one factor to its end value, reprice, and book the
//! per-trade residual. Factors are discovered from the end state's
//! asset-class registry and processed in sorted order, one reprice each.

use std::collections::BTreeMap;

use risk_core::cube::{measure, Column, Cube, Row, Tag};
use risk_core::market::AssetClass;
use risk_core::model::PvModel;
use risk_core::types::{Currency, FactorId};

use super::{append_residuals, reprice, StepKind};
use crate::ledger::{step_row, Ledger};
use crate::AttributionError;

/// Which market-state section a step's factors live in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Spots,
    Curves,
    Vols,
}

fn sections_for(kind: StepKind) -> &'static [(Section, &'static [AssetClass])] {
    const ASSET_CLASSES: &[AssetClass] = &[AssetClass::Equity, AssetClass::Commodity];
    match kind {
        StepKind::IrCurve => &[(Section::Curves, &[AssetClass::Rates])],
        StepKind::FxSpot => &[(Section::Spots, &[AssetClass::Fx])],
        StepKind::FxVol => &[(Section::Vols, &[AssetClass::Fx])],
        StepKind::AssetCurve => &[
            (Section::Spots, ASSET_CLASSES),
            (Section::Curves, ASSET_CLASSES),
        ],
        StepKind::AssetVega => &[(Section::Vols, ASSET_CLASSES)],
        // The remaining kinds never dispatch here.
        _ => &[],
    }
}

pub(crate) fn run<M: PvModel>(
    kind: StepKind,
    mut model: M,
    end: &M,
    ledger: &mut Ledger,
    mut last_pv: Cube,
    risk_cube: &Cube,
    ccy: Currency,
) -> Result<(M, Cube), AttributionError> {
    for (section, classes) in sections_for(kind) {
        for class in classes.iter() {
            let factors = match section {
                Section::Spots => end.state().spot_factors(*class),
                Section::Curves => end.state().curve_factors(*class),
                Section::Vols => end.state().vol_factors(*class),
            };
            for factor in factors {
                let (next_model, next_pv) = explain_factor(
                    kind, model, end, ledger, last_pv, risk_cube, ccy, &factor, *section,
                )?;
                model = next_model;
                last_pv = next_pv;
            }
        }
    }
    Ok((model, last_pv))
}

/// One factor's sub-step: Taylor estimate, single-factor state move,
/// reprice, residual.
#[allow(clippy::too_many_arguments)]
fn explain_factor<M: PvModel>(
    kind: StepKind,
    model: M,
    end: &M,
    ledger: &mut Ledger,
    last_pv: Cube,
    risk_cube: &Cube,
    ccy: Currency,
    factor: &FactorId,
    section: Section,
) -> Result<(M, Cube), AttributionError> {
    let step = kind.name();
    let mut explained: BTreeMap<String, f64> = BTreeMap::new();
    let factor_rows = risk_cube.filter_text(Column::Underlying, factor.as_str(), false);

    match section {
        Section::Spots => {
            if let (Some(s0), Some(s1)) =
                (model.state().spot(factor), end.state().spot(factor))
            {
                let mv = s1 - s0;
                if mv != 0.0 {
                    for row in delta_rows(&factor_rows).rows() {
                        book(ledger, &model, step, factor, measure::DELTA, row,
                            row.value() * mv, &mut explained);
                    }
                    for row in factor_rows
                        .filter_text(Column::Measure, measure::GAMMA, false)
                        .rows()
                    {
                        book(ledger, &model, step, factor, measure::GAMMA, row,
                            0.5 * row.value() * mv * mv, &mut explained);
                    }
                }
            }
        }
        Section::Curves => {
            if let (Some(c0), Some(c1)) =
                (model.state().curve(factor), end.state().curve(factor))
            {
                for row in factor_rows
                    .filter_text(Column::Measure, measure::DELTA, false)
                    .rows()
                {
                    let Some(label) = row.text(Column::PointLabel) else {
                        continue;
                    };
                    let (Some(v0), Some(v1)) = (c0.value_at(label), c1.value_at(label))
                    else {
                        // Pillar only on one side: its effect lands in
                        // the residual.
                        continue;
                    };
                    let mv = v1 - v0;
                    if mv != 0.0 {
                        book(ledger, &model, step, factor, measure::DELTA, row,
                            row.value() * mv, &mut explained);
                    }
                }
            }
        }
        Section::Vols => {
            if let (Some(v0), Some(v1)) = (
                model.state().vol(factor).map(|c| c.mean_level()),
                end.state().vol(factor).map(|c| c.mean_level()),
            ) {
                let mv = v1 - v0;
                if mv != 0.0 {
                    for row in factor_rows
                        .filter_text(Column::Measure, measure::VEGA, false)
                        .rows()
                    {
                        book(ledger, &model, step, factor, measure::VEGA, row,
                            row.value() * mv, &mut explained);
                    }
                }
            }
        }
    }

    // Move this one factor to its end value on a private working copy.
    let mut state = model.state().clone();
    let class = end
        .state()
        .class_of(factor)
        .unwrap_or(AssetClass::Equity);
    match section {
        Section::Spots => {
            if let Some(s1) = end.state().spot(factor) {
                state.set_spot(factor.clone(), class, s1);
            }
        }
        Section::Curves => {
            if let Some(curve) = end.state().curve(factor) {
                state.add_price_curve(factor.clone(), class, curve.clone());
            }
        }
        Section::Vols => {
            if let Some(vols) = end.state().vol(factor) {
                state.add_vol_surface(factor.clone(), class, vols.clone());
            }
        }
    }
    let new_model = model.rebuild(state, model.portfolio().clone());
    let pv = reprice(&new_model, ccy, step)?;

    let actual = pv.difference(&last_pv).pivot(Column::TradeId);
    append_residuals(
        ledger,
        new_model.portfolio(),
        step,
        Some(factor.as_str()),
        &actual,
        &explained,
    );
    Ok((new_model, pv))
}

/// Spot delta rows: the `Delta` measure without a pillar tag.
fn delta_rows(factor_rows: &Cube) -> Cube {
    factor_rows.filter(
        |row| {
            row.tag(Column::Measure) == Some(&Tag::Text(measure::DELTA.to_string()))
                && row.tag(Column::PointLabel).is_none()
        },
        false,
    )
}

/// Books one Taylor estimate row and tracks it in the running
/// explained-by-trade map.
fn book<M: PvModel>(
    ledger: &mut Ledger,
    model: &M,
    step: &'static str,
    factor: &FactorId,
    measure_name: &str,
    source: &Row,
    estimate: f64,
    explained: &mut BTreeMap<String, f64>,
) {
    let Some(trade) = source.text(Column::TradeId) else {
        return;
    };
    if estimate == 0.0 {
        return;
    }
    let mut row = step_row(step, trade, model.portfolio(), estimate)
        .with_text(Column::SubStep, factor.as_str())
        .with_text(Column::SubSubStep, measure_name)
        .with_text(Column::Underlying, factor.as_str());
    if let Some(label) = source.text(Column::PointLabel) {
        row = row.with_text(Column::PointLabel, label);
    }
    if let Some(Tag::Date(date)) = source.tag(Column::PointDate) {
        row = row.with_date(Column::PointDate, *date);
    }
    ledger.append(row);
    *explained.entry(trade.to_string()).or_insert(0.0) += estimate;
}
