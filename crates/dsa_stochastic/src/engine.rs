//! Single simulation run.
//!
//! [`simulate`] runs the whole pipeline once: fit the shock model, draw
//! raw shocks, aggregate them to annual frequency, add them to the
//! baseline and roll the debt ratio forward. Every call builds a fresh
//! [`SimulationResult`]; nothing is shared between calls.

use dsa_core::rng::DsaRng;
use dsa_core::types::{BaselinePaths, ShockPanel};
use tracing::{debug, info, instrument};

use crate::aggregator::{aggregate, AnnualShockEnsemble};
use crate::error::StochasticError;
use crate::estimator::fit;
use crate::request::SimulationRequest;
use crate::sampler::sample;
use crate::simulator::{combine, simulate_debt, SimulatedPathSet};

/// Output of one simulation run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Seed that reproduces this run.
    pub seed: u64,
    /// Annual shocks.
    pub annual: AnnualShockEnsemble,
    /// Simulated paths.
    pub paths: SimulatedPathSet,
}

/// Fits the shock model and draws annual shocks for a request.
///
/// The panel's frequency sets the draw frequency. Returns the seed used
/// together with the shocks.
///
/// # Errors
///
/// - `StochasticError::Request` for an invalid request
/// - `StochasticError::Estimation` if the shock model cannot be fitted
pub fn draw_annual_shocks(
    request: &SimulationRequest,
    panel: &ShockPanel,
) -> Result<(u64, AnnualShockEnsemble), StochasticError> {
    request.validate()?;

    let frequency = panel.frequency();
    let model = fit(panel, request.mode(), request.currency_regime())?;

    let mut rng = DsaRng::from_optional_seed(request.seed());
    debug!(seed = rng.seed(), "initialised shock generator");

    let steps = frequency.draw_steps(request.horizon());
    let pb_zero_steps = request.pb_zero_steps(frequency);
    let raw = sample(
        &model,
        request.n_paths(),
        steps,
        pb_zero_steps,
        frequency,
        &mut rng,
    );
    debug!(
        n_paths = request.n_paths(),
        steps,
        pb_zero_steps,
        frequency = %frequency,
        "drew raw shocks"
    );

    let annual = aggregate(
        &raw,
        request.horizon(),
        request.composition(),
        request.avg_res_mat(),
    );
    Ok((rng.seed(), annual))
}

/// Combines annual shocks with a baseline and simulates debt.
///
/// # Errors
///
/// - `StochasticError::Data` for an inconsistent baseline
/// - `StochasticError::Request` if the stochastic window does not fit it
pub fn simulate_paths(
    request: &SimulationRequest,
    annual: &AnnualShockEnsemble,
    baseline: &BaselinePaths,
) -> Result<SimulatedPathSet, StochasticError> {
    baseline.validate()?;
    request.check_window(baseline.len())?;

    let mut paths = combine(annual, baseline, request.stochastic_start())?;
    simulate_debt(&mut paths, request.composition());
    Ok(paths)
}

/// Runs one full simulation.
///
/// # Errors
///
/// Any data, request or estimation error. Estimation failures are fatal
/// for the run.
///
/// # Example
///
/// ```
/// use dsa_core::types::{BaselinePaths, DebtComposition, ShockFrequency, ShockPanel};
/// use dsa_stochastic::{simulate, SimulationRequest};
///
/// let periods = (2000..2020).map(|y| y.to_string()).collect();
/// let rows = vec![[0.0; 6]; 20];
/// let panel = ShockPanel::new(ShockFrequency::Annual, periods, rows).unwrap();
///
/// let n = 8;
/// let baseline = BaselinePaths {
///     start_year: 2024,
///     debt: vec![80.0; n],
///     exr_eur: vec![1.0; n],
///     exr_usd: vec![1.0; n],
///     implicit_rate: vec![2.0; n],
///     growth: vec![2.0; n],
///     primary_balance: vec![0.0; n],
///     stock_flow: vec![0.0; n],
///     overall_balance: vec![-1.6; n],
/// };
///
/// let request = SimulationRequest::builder()
///     .n_paths(100)
///     .stochastic_start(1)
///     .composition(DebtComposition::domestic_only(0.2).unwrap())
///     .avg_res_mat(5.0)
///     .seed(7)
///     .build()
///     .unwrap();
///
/// let result = simulate(&request, &panel, &baseline).unwrap();
/// assert_eq!(result.paths.debt.n_cols(), 6);
/// assert!((result.paths.debt.get(0, 5) - 80.0).abs() < 1e-9);
/// ```
#[instrument(skip_all, fields(n_paths = request.n_paths(), horizon = request.horizon()))]
pub fn simulate(
    request: &SimulationRequest,
    panel: &ShockPanel,
    baseline: &BaselinePaths,
) -> Result<SimulationResult, StochasticError> {
    baseline.validate()?;
    request.check_window(baseline.len())?;

    let (seed, annual) = draw_annual_shocks(request, panel)?;
    let paths = simulate_paths(request, &annual, baseline)?;

    info!(
        seed,
        mode = %request.mode(),
        observations = panel.len(),
        "simulation complete"
    );
    Ok(SimulationResult {
        seed,
        annual,
        paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::request::{EstimationMode, PolicyWindow};
    use dsa_core::types::{DebtComposition, ShockFrequency, N_SHOCK_VARIABLES};

    fn baseline(n: usize) -> BaselinePaths {
        BaselinePaths {
            start_year: 2024,
            debt: vec![100.0; n],
            exr_eur: vec![1.0; n],
            exr_usd: vec![1.0; n],
            implicit_rate: vec![3.0; n],
            growth: vec![3.0; n],
            primary_balance: vec![0.0; n],
            stock_flow: vec![0.0; n],
            overall_balance: vec![-3.0; n],
        }
    }

    fn panel(frequency: ShockFrequency, n: usize, seed: u64) -> ShockPanel {
        let mut rng = DsaRng::from_seed(seed);
        let rows = (0..n)
            .map(|_| {
                let mut row = [0.0; N_SHOCK_VARIABLES];
                rng.fill_normal(&mut row);
                row
            })
            .collect();
        let periods = (0..n).map(|i| format!("{}Q{}", 1990 + i / 4, i % 4 + 1)).collect();
        ShockPanel::new(frequency, periods, rows).unwrap()
    }

    fn request(mode: EstimationMode, seed: Option<u64>) -> SimulationRequest {
        SimulationRequest::builder()
            .n_paths(200)
            .stochastic_start(2)
            .mode(mode)
            .composition(DebtComposition::domestic_only(0.3).unwrap())
            .avg_res_mat(6.0)
            .maybe_seed(seed)
            .build()
            .unwrap()
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let p = panel(ShockFrequency::Quarterly, 80, 1);
        let b = baseline(10);
        for mode in [
            EstimationMode::Normal,
            EstimationMode::VarBootstrap,
            EstimationMode::VarCholesky,
        ] {
            let r = request(mode, Some(99));
            let first = simulate(&r, &p, &b).unwrap();
            let second = simulate(&r, &p, &b).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.seed, 99);
        }
    }

    #[test]
    fn test_unseeded_run_reports_seed() {
        let p = panel(ShockFrequency::Annual, 30, 2);
        let b = baseline(10);
        let first = simulate(&request(EstimationMode::Normal, None), &p, &b).unwrap();
        let replay = simulate(&request(EstimationMode::Normal, Some(first.seed)), &p, &b).unwrap();
        assert_eq!(first.paths, replay.paths);
    }

    #[test]
    fn test_window_outside_baseline() {
        let p = panel(ShockFrequency::Annual, 30, 3);
        let err = simulate(&request(EstimationMode::Normal, Some(1)), &p, &baseline(6)).unwrap_err();
        assert!(matches!(
            err,
            StochasticError::Request(RequestError::WindowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_estimation_failure_is_fatal() {
        let p = panel(ShockFrequency::Annual, 6, 4);
        let err = simulate(&request(EstimationMode::VarBootstrap, Some(1)), &p, &baseline(10))
            .unwrap_err();
        assert!(err.is_estimation());
    }

    #[test]
    fn test_pb_shocks_suppressed_in_adjustment_window() {
        let p = panel(ShockFrequency::Quarterly, 80, 5);
        let b = baseline(10);
        let r = SimulationRequest::builder()
            .n_paths(50)
            .stochastic_start(2)
            .adjustment_end(4)
            .policy_window(PolicyWindow::ApplyZeroing)
            .composition(DebtComposition::domestic_only(0.3).unwrap())
            .avg_res_mat(6.0)
            .seed(8)
            .build()
            .unwrap();
        let result = simulate(&r, &p, &b).unwrap();
        // Years 2..=4 overlap the adjustment: PB equals the baseline there.
        for path in 0..50 {
            for col in 1..=3 {
                assert_eq!(result.paths.primary_balance.get(path, col), 0.0);
            }
            assert_ne!(result.paths.primary_balance.get(path, 4), 0.0);
        }
    }
}
