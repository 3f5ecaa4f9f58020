//! Deterministic baseline inputs.
//!
//! The baseline projection engine is an external collaborator. Its output
//! enters the stochastic engine as a [`BaselinePaths`] value: one array per
//! variable covering the full projection horizon, index 0 being the
//! projection start year.

use super::error::DataError;

/// Tolerance for share vectors summing to one.
pub const SHARE_TOLERANCE: f64 = 1e-6;

/// Deterministic projection paths over the full horizon.
///
/// All rates and ratios are in percent (debt 85.0 means 85% of GDP,
/// implicit rate 2.5 means 2.5%). Exchange rates are levels.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaselinePaths {
    /// Calendar year of index 0.
    pub start_year: i32,
    /// Debt-to-GDP ratio.
    pub debt: Vec<f64>,
    /// Exchange rate against the euro.
    pub exr_eur: Vec<f64>,
    /// Exchange rate against the US dollar.
    pub exr_usd: Vec<f64>,
    /// Implicit interest rate on the debt stock.
    pub implicit_rate: Vec<f64>,
    /// Nominal GDP growth.
    pub growth: Vec<f64>,
    /// Primary balance.
    pub primary_balance: Vec<f64>,
    /// Stock-flow adjustment.
    pub stock_flow: Vec<f64>,
    /// Overall fiscal balance.
    pub overall_balance: Vec<f64>,
}

impl BaselinePaths {
    /// Number of projection years.
    #[inline]
    pub fn len(&self) -> usize {
        self.debt.len()
    }

    /// True when the projection has no years.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.debt.is_empty()
    }

    /// Calendar year of a projection index.
    #[inline]
    pub fn year(&self, index: usize) -> i32 {
        self.start_year + index as i32
    }

    /// Checks that every series is finite and as long as `debt`.
    ///
    /// # Errors
    ///
    /// - `DataError::InvalidInput` if the projection is empty
    /// - `DataError::LengthMismatch` if a series differs in length
    /// - `DataError::NonFinite` if a value is NaN or infinite
    pub fn validate(&self) -> Result<(), DataError> {
        if self.is_empty() {
            return Err(DataError::InvalidInput("baseline has no years".into()));
        }
        let n = self.len();
        for (name, series) in self.series() {
            if series.len() != n {
                return Err(DataError::length_mismatch(name, n, series.len()));
            }
            if let Some(i) = series.iter().position(|v| !v.is_finite()) {
                return Err(DataError::non_finite(name, i));
            }
        }
        if let Some(i) = self
            .exr_eur
            .iter()
            .chain(&self.exr_usd)
            .position(|&v| v == 0.0)
        {
            return Err(DataError::InvalidInput(format!(
                "exchange rate level is zero at position {}",
                i % n
            )));
        }
        Ok(())
    }

    fn series(&self) -> [(&'static str, &[f64]); 8] {
        [
            ("debt", &self.debt),
            ("exr_eur", &self.exr_eur),
            ("exr_usd", &self.exr_usd),
            ("implicit_rate", &self.implicit_rate),
            ("growth", &self.growth),
            ("primary_balance", &self.primary_balance),
            ("stock_flow", &self.stock_flow),
            ("overall_balance", &self.overall_balance),
        ]
    }
}

/// Currency and maturity composition of the debt stock.
///
/// `domestic + eur + usd` and `short_term + long_term` must each sum to one.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebtComposition {
    /// Share denominated in domestic currency.
    pub domestic: f64,
    /// Share denominated in euro.
    pub eur: f64,
    /// Share denominated in US dollar.
    pub usd: f64,
    /// Share repricing at the short-term rate.
    pub short_term: f64,
    /// Share repricing at the long-term rate.
    pub long_term: f64,
}

impl DebtComposition {
    /// Creates a validated composition.
    ///
    /// # Errors
    ///
    /// `DataError::InvalidInput` if a share is outside `[0, 1]` or a
    /// share group does not sum to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use dsa_core::types::DebtComposition;
    ///
    /// let comp = DebtComposition::new(0.8, 0.15, 0.05, 0.2, 0.8).unwrap();
    /// assert_eq!(comp.usd, 0.05);
    /// assert!(DebtComposition::new(0.8, 0.3, 0.0, 0.2, 0.8).is_err());
    /// ```
    pub fn new(
        domestic: f64,
        eur: f64,
        usd: f64,
        short_term: f64,
        long_term: f64,
    ) -> Result<Self, DataError> {
        let comp = Self {
            domestic,
            eur,
            usd,
            short_term,
            long_term,
        };
        comp.validate()?;
        Ok(comp)
    }

    /// Entirely domestic-currency debt with the given short-term share.
    pub fn domestic_only(short_term: f64) -> Result<Self, DataError> {
        Self::new(1.0, 0.0, 0.0, short_term, 1.0 - short_term)
    }

    /// Checks share ranges and sums.
    pub fn validate(&self) -> Result<(), DataError> {
        let shares = [self.domestic, self.eur, self.usd, self.short_term, self.long_term];
        if shares.iter().any(|s| !(0.0..=1.0).contains(s)) {
            return Err(DataError::InvalidInput(format!(
                "debt shares must lie in [0, 1]: {:?}",
                shares
            )));
        }
        let currency = self.domestic + self.eur + self.usd;
        if (currency - 1.0).abs() > SHARE_TOLERANCE {
            return Err(DataError::InvalidInput(format!(
                "currency shares sum to {}, expected 1",
                currency
            )));
        }
        let maturity = self.short_term + self.long_term;
        if (maturity - 1.0).abs() > SHARE_TOLERANCE {
            return Err(DataError::InvalidInput(format!(
                "maturity shares sum to {}, expected 1",
                maturity
            )));
        }
        Ok(())
    }
}
