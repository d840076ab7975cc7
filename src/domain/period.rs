use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// How often a subscription price is re-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdjustmentPeriod {
    /// Every 3 months
    Quarterly,
    /// Every 4 months
    FourMonthly,
    /// Every 6 months
    Semiannual,
}

impl AdjustmentPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentPeriod::Quarterly => "quarterly",
            AdjustmentPeriod::FourMonthly => "four-monthly",
            AdjustmentPeriod::Semiannual => "semiannual",
        }
    }

    /// Accepts the canonical names plus the Spanish labels used by older data
    /// (`trimestral`, `cuatrimestral`, `semestral`).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "quarterly" | "trimestral" => Some(AdjustmentPeriod::Quarterly),
            "four-monthly" | "fourmonthly" | "cuatrimestral" => {
                Some(AdjustmentPeriod::FourMonthly)
            }
            "semiannual" | "semi-annual" | "semestral" => Some(AdjustmentPeriod::Semiannual),
            _ => None,
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            AdjustmentPeriod::Quarterly => 3,
            AdjustmentPeriod::FourMonthly => 4,
            AdjustmentPeriod::Semiannual => 6,
        }
    }
}

impl std::fmt::Display for AdjustmentPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Next adjustment date after `date` for the given period.
///
/// Rolls over year boundaries; when the day does not exist in the target month
/// it clamps to that month's last day (Jan 31 + 3 months = Apr 30).
/// Saturates at the end of the representable calendar.
pub fn advance(date: NaiveDate, period: AdjustmentPeriod) -> NaiveDate {
    date.checked_add_months(Months::new(period.months()))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_period_aliases() {
        assert_eq!(
            AdjustmentPeriod::from_str("trimestral"),
            Some(AdjustmentPeriod::Quarterly)
        );
        assert_eq!(
            AdjustmentPeriod::from_str("Cuatrimestral"),
            Some(AdjustmentPeriod::FourMonthly)
        );
        assert_eq!(
            AdjustmentPeriod::from_str("semestral"),
            Some(AdjustmentPeriod::Semiannual)
        );
        assert_eq!(AdjustmentPeriod::from_str("mensual"), None);

        for period in [
            AdjustmentPeriod::Quarterly,
            AdjustmentPeriod::FourMonthly,
            AdjustmentPeriod::Semiannual,
        ] {
            assert_eq!(AdjustmentPeriod::from_str(period.as_str()), Some(period));
        }
    }

    #[test]
    fn test_advance_quarterly() {
        assert_eq!(
            advance(date("2024-01-15"), AdjustmentPeriod::Quarterly),
            date("2024-04-15")
        );
    }

    #[test]
    fn test_advance_four_monthly() {
        assert_eq!(
            advance(date("2024-03-10"), AdjustmentPeriod::FourMonthly),
            date("2024-07-10")
        );
    }

    #[test]
    fn test_advance_rolls_over_year() {
        assert_eq!(
            advance(date("2024-11-15"), AdjustmentPeriod::Semiannual),
            date("2025-05-15")
        );
        assert_eq!(
            advance(date("2024-10-01"), AdjustmentPeriod::Quarterly),
            date("2025-01-01")
        );
    }

    #[test]
    fn test_advance_clamps_month_end() {
        assert_eq!(
            advance(date("2024-01-31"), AdjustmentPeriod::Quarterly),
            date("2024-04-30")
        );
        // 2024 is a leap year
        assert_eq!(
            advance(date("2023-11-30"), AdjustmentPeriod::Quarterly),
            date("2024-02-29")
        );
        assert_eq!(
            advance(date("2024-08-31"), AdjustmentPeriod::Semiannual),
            date("2025-02-28")
        );
    }
}
