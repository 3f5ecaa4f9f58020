//! Aggregation of raw draws into annual shocks.
//!
//! Quarterly draws are summed over the four quarters of each simulated
//! year; annual draws are taken as is. The long-term rate is different:
//! a shock to it only reprices the share of the debt stock that rolls
//! over, so year `t` carries the sum of the last `min(steps, maturity)`
//! long-term draws weighted by `min(avg_res_mat, t) / avg_res_mat`.
//! Short- and long-term shocks are then blended with the debt shares into
//! one implicit-rate shock.

use dsa_core::math::stats::round_half_even;
use dsa_core::types::{DebtComposition, ShockFrequency, ShockVariable};

use crate::sampler::ShockEnsemble;

/// Number of annual shock channels.
pub const N_ANNUAL_CHANNELS: usize = 5;

/// Shock channel of an [`AnnualShockEnsemble`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnnualChannel {
    /// Exchange rate against the euro.
    ExrEur = 0,
    /// Exchange rate against the US dollar.
    ExrUsd = 1,
    /// Implicit interest rate.
    Interest = 2,
    /// Nominal GDP growth.
    Growth = 3,
    /// Primary balance.
    PrimaryBalance = 4,
}

impl AnnualChannel {
    /// All channels in storage order.
    pub const ALL: [AnnualChannel; N_ANNUAL_CHANNELS] = [
        AnnualChannel::ExrEur,
        AnnualChannel::ExrUsd,
        AnnualChannel::Interest,
        AnnualChannel::Growth,
        AnnualChannel::PrimaryBalance,
    ];

    /// Storage position.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Annual shocks, `[path][channel][year]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnualShockEnsemble {
    n_paths: usize,
    years: usize,
    data: Vec<f64>,
}

impl AnnualShockEnsemble {
    /// All-zero ensemble.
    pub fn zeros(n_paths: usize, years: usize) -> Self {
        Self {
            n_paths,
            years,
            data: vec![0.0; n_paths * N_ANNUAL_CHANNELS * years],
        }
    }

    /// Builds an ensemble from `[path][channel][year]` data.
    ///
    /// Returns `None` if the length does not match.
    pub fn from_raw(n_paths: usize, years: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == n_paths * N_ANNUAL_CHANNELS * years).then_some(Self {
            n_paths,
            years,
            data,
        })
    }

    /// Number of paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of simulated years.
    #[inline]
    pub fn years(&self) -> usize {
        self.years
    }

    /// Shock of one path, channel and year.
    #[inline]
    pub fn get(&self, path: usize, channel: AnnualChannel, year: usize) -> f64 {
        self.data[self.offset(path, channel) + year]
    }

    /// Overwrite one shock.
    #[inline]
    pub fn set(&mut self, path: usize, channel: AnnualChannel, year: usize, value: f64) {
        let offset = self.offset(path, channel);
        self.data[offset + year] = value;
    }

    /// Yearly shocks of one path and channel.
    #[inline]
    pub fn series(&self, path: usize, channel: AnnualChannel) -> &[f64] {
        let offset = self.offset(path, channel);
        &self.data[offset..offset + self.years]
    }

    /// Mutable yearly shocks of one path and channel.
    #[inline]
    pub fn series_mut(&mut self, path: usize, channel: AnnualChannel) -> &mut [f64] {
        let offset = self.offset(path, channel);
        &mut self.data[offset..offset + self.years]
    }

    #[inline]
    fn offset(&self, path: usize, channel: AnnualChannel) -> usize {
        (path * N_ANNUAL_CHANNELS + channel.index()) * self.years
    }
}

/// Aggregates raw draws into `years` annual shocks per path.
///
/// The ensemble must hold `years` steps at annual frequency or
/// `4 × years` steps at quarterly frequency.
///
/// # Arguments
///
/// * `raw` - Raw draws
/// * `years` - Simulated years
/// * `composition` - Debt shares used to blend short- and long-term rates
/// * `avg_res_mat` - Average residual maturity in years (positive)
pub fn aggregate(
    raw: &ShockEnsemble,
    years: usize,
    composition: &DebtComposition,
    avg_res_mat: f64,
) -> AnnualShockEnsemble {
    let frequency = raw.frequency();
    let per_year = frequency.periods_per_year();
    debug_assert_eq!(raw.steps(), frequency.draw_steps(years));

    // Long-term window length in draw steps.
    let maturity_steps = match frequency {
        ShockFrequency::Quarterly => round_half_even(avg_res_mat * 4.0),
        ShockFrequency::Annual => round_half_even(avg_res_mat),
    }
    .max(0.0) as usize;

    let simple = [
        (AnnualChannel::ExrEur, ShockVariable::ExrEur),
        (AnnualChannel::ExrUsd, ShockVariable::ExrUsd),
        (AnnualChannel::Growth, ShockVariable::NominalGdpGrowth),
        (AnnualChannel::PrimaryBalance, ShockVariable::PrimaryBalance),
    ];

    let mut annual = AnnualShockEnsemble::zeros(raw.n_paths(), years);
    let mut short_term = vec![0.0; years];
    let mut long_term = vec![0.0; years];

    for path in 0..raw.n_paths() {
        let year_sum = |variable: ShockVariable, year: usize| -> f64 {
            (year * per_year..(year + 1) * per_year)
                .map(|step| raw.get(path, step, variable))
                .sum()
        };

        for (channel, variable) in simple {
            let out = annual.series_mut(path, channel);
            for (year, value) in out.iter_mut().enumerate() {
                *value = year_sum(variable, year);
            }
        }

        for year in 0..years {
            short_term[year] = year_sum(ShockVariable::InterestRateSt, year);

            let t = year + 1;
            let end = t * per_year;
            let window = end.min(maturity_steps);
            let weight = avg_res_mat.min(t as f64) / avg_res_mat;
            long_term[year] = weight
                * (end - window..end)
                    .map(|step| raw.get(path, step, ShockVariable::InterestRateLt))
                    .sum::<f64>();
        }

        let interest = annual.series_mut(path, AnnualChannel::Interest);
        for year in 0..years {
            interest[year] = composition.short_term * short_term[year]
                + composition.long_term * long_term[year];
        }
    }

    annual
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dsa_core::rng::DsaRng;
    use proptest::prelude::*;

    fn composition(short_term: f64) -> DebtComposition {
        DebtComposition::domestic_only(short_term).unwrap()
    }

    fn constant_ensemble(
        n_paths: usize,
        years: usize,
        frequency: ShockFrequency,
        value: f64,
    ) -> ShockEnsemble {
        let steps = frequency.draw_steps(years);
        let mut raw = ShockEnsemble::zeros(n_paths, steps, frequency);
        for path in 0..n_paths {
            for step in 0..steps {
                for v in ShockVariable::ALL {
                    raw.set(path, step, v, value);
                }
            }
        }
        raw
    }

    // ========================================
    // Quarterly Aggregation Tests
    // ========================================

    #[test]
    fn test_quarterly_sums_four_quarters() {
        let raw = constant_ensemble(3, 5, ShockFrequency::Quarterly, 0.5);
        let annual = aggregate(&raw, 5, &composition(1.0), 5.0);
        for year in 0..5 {
            assert_relative_eq!(annual.get(2, AnnualChannel::Growth, year), 2.0);
            assert_relative_eq!(annual.get(2, AnnualChannel::ExrUsd, year), 2.0);
            assert_relative_eq!(annual.get(2, AnnualChannel::PrimaryBalance, year), 2.0);
            // Short-term share of one: interest equals the summed short-term rate.
            assert_relative_eq!(annual.get(2, AnnualChannel::Interest, year), 2.0);
        }
    }

    #[test]
    fn test_quarterly_long_term_weighting() {
        // avg_res_mat = 2.5 years -> 10 quarters.
        let raw = constant_ensemble(1, 4, ShockFrequency::Quarterly, 1.0);
        let annual = aggregate(&raw, 4, &composition(0.0), 2.5);
        // t=1: weight 1/2.5, 4 quarters; t=2: 2/2.5, 8; t=3: 1, 10; t=4: 1, 10.
        let expected = [0.4 * 4.0, 0.8 * 8.0, 10.0, 10.0];
        for (year, e) in expected.iter().enumerate() {
            assert_relative_eq!(annual.get(0, AnnualChannel::Interest, year), *e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_long_term_window_uses_latest_draws() {
        let mut raw = ShockEnsemble::zeros(1, 8, ShockFrequency::Quarterly);
        for step in 0..8 {
            raw.set(0, step, ShockVariable::InterestRateLt, step as f64);
        }
        // 1 year maturity -> the last four quarters of each year, weight 1.
        let annual = aggregate(&raw, 2, &composition(0.0), 1.0);
        assert_relative_eq!(annual.get(0, AnnualChannel::Interest, 0), 0.0 + 1.0 + 2.0 + 3.0);
        assert_relative_eq!(annual.get(0, AnnualChannel::Interest, 1), 4.0 + 5.0 + 6.0 + 7.0);
    }

    #[test]
    fn test_maturity_rounds_half_to_even() {
        // 0.625 * 4 = 2.5 quarters rounds to 2.
        let mut raw = ShockEnsemble::zeros(1, 4, ShockFrequency::Quarterly);
        for step in 0..4 {
            raw.set(0, step, ShockVariable::InterestRateLt, 1.0);
        }
        let annual = aggregate(&raw, 1, &composition(0.0), 0.625);
        assert_relative_eq!(annual.get(0, AnnualChannel::Interest, 0), 2.0);
    }

    // ========================================
    // Annual Aggregation Tests
    // ========================================

    #[test]
    fn test_annual_passthrough() {
        let mut raw = ShockEnsemble::zeros(2, 3, ShockFrequency::Annual);
        raw.set(1, 2, ShockVariable::NominalGdpGrowth, -1.5);
        raw.set(1, 0, ShockVariable::ExrEur, 0.25);
        let annual = aggregate(&raw, 3, &composition(0.3), 4.0);
        assert_eq!(annual.get(1, AnnualChannel::Growth, 2), -1.5);
        assert_eq!(annual.get(1, AnnualChannel::ExrEur, 0), 0.25);
        assert_eq!(annual.get(0, AnnualChannel::Growth, 2), 0.0);
    }

    #[test]
    fn test_annual_interest_blend() {
        let mut raw = ShockEnsemble::zeros(1, 2, ShockFrequency::Annual);
        raw.set(0, 0, ShockVariable::InterestRateSt, 1.0);
        raw.set(0, 0, ShockVariable::InterestRateLt, 2.0);
        raw.set(0, 1, ShockVariable::InterestRateSt, 1.0);
        raw.set(0, 1, ShockVariable::InterestRateLt, 2.0);
        // Maturity 2 years: t=1 weight 0.5 over 1 year, t=2 weight 1 over 2 years.
        let annual = aggregate(&raw, 2, &composition(0.25), 2.0);
        assert_relative_eq!(
            annual.get(0, AnnualChannel::Interest, 0),
            0.25 * 1.0 + 0.75 * (0.5 * 2.0)
        );
        assert_relative_eq!(
            annual.get(0, AnnualChannel::Interest, 1),
            0.25 * 1.0 + 0.75 * 4.0
        );
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(AnnualShockEnsemble::from_raw(2, 3, vec![0.0; 30]).is_some());
        assert!(AnnualShockEnsemble::from_raw(2, 3, vec![0.0; 29]).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_each_year_is_sum_of_its_quarters(seed in any::<u64>(), years in 1usize..6) {
            let mut rng = DsaRng::from_seed(seed);
            let steps = ShockFrequency::Quarterly.draw_steps(years);
            let summed = [
                (AnnualChannel::Growth, ShockVariable::NominalGdpGrowth),
                (AnnualChannel::PrimaryBalance, ShockVariable::PrimaryBalance),
                (AnnualChannel::Interest, ShockVariable::InterestRateSt),
            ];
            let mut raw = ShockEnsemble::zeros(4, steps, ShockFrequency::Quarterly);
            for path in 0..4 {
                for step in 0..steps {
                    for (_, variable) in summed {
                        raw.set(path, step, variable, rng.gen_normal());
                    }
                }
            }
            // All debt short-term and no long-term draws: interest is the
            // short-rate sum.
            let annual = aggregate(&raw, years, &composition(1.0), 3.0);
            for path in 0..4 {
                for (channel, variable) in summed {
                    for year in 0..years {
                        let quarters: f64 = (year * 4..(year + 1) * 4)
                            .map(|s| raw.get(path, s, variable))
                            .sum();
                        prop_assert_eq!(annual.get(path, channel, year), quarters);
                    }
                }
            }
        }
    }
}
