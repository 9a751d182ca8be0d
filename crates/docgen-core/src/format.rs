//! Fixed locale policy for the values written into templates.

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

const MAX_PRECISION: u32 = 6;

/// Currency rendering: symbol, grouping and precision.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub precision: u32,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "$".to_string(),
            thousands_separator: '.',
            decimal_separator: ',',
            precision: 0,
        }
    }
}

/// Formatting applied by every context resolver. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatPolicy {
    pub currency: CurrencyFormat,
}

impl FormatPolicy {
    /// `1234567.0` → `$1.234.567` with the default policy.
    pub fn currency(&self, amount: f64) -> String {
        let fmt = &self.currency;
        let precision = fmt.precision.min(MAX_PRECISION);
        let factor = 10u128.pow(precision);
        let scaled = (amount.abs() * factor as f64).round() as u128;
        let sign = if amount < 0.0 && scaled != 0 { "-" } else { "" };

        let mut out = format!(
            "{}{}{}",
            sign,
            fmt.symbol,
            group_digits(scaled / factor, fmt.thousands_separator)
        );
        if precision > 0 {
            out.push(fmt.decimal_separator);
            out.push_str(&format!(
                "{:0width$}",
                scaled % factor,
                width = precision as usize
            ));
        }
        out
    }

    /// Quantities keep up to two decimals and drop trailing zeros: `2.50` → `2,5`.
    pub fn quantity(&self, quantity: f64) -> String {
        let scaled = (quantity.abs() * 100.0).round() as u128;
        let sign = if quantity < 0.0 && scaled != 0 { "-" } else { "" };
        let whole = group_digits(scaled / 100, self.currency.thousands_separator);
        let cents = scaled % 100;
        if cents == 0 {
            format!("{}{}", sign, whole)
        } else {
            let decimals = format!("{:02}", cents);
            format!(
                "{}{}{}{}",
                sign,
                whole,
                self.currency.decimal_separator,
                decimals.trim_end_matches('0')
            )
        }
    }

    /// Long form: `18 de octubre de 2026`.
    pub fn date(&self, date: NaiveDate) -> String {
        format!(
            "{} de {} de {}",
            date.day(),
            MONTHS[date.month0() as usize],
            date.year()
        )
    }

    pub fn period(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!("{} al {}", self.date(start), self.date(end))
    }
}

fn group_digits(value: u128, separator: char) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_default_policy() {
        let policy = FormatPolicy::default();
        assert_eq!(policy.currency(0.0), "$0");
        assert_eq!(policy.currency(999.0), "$999");
        assert_eq!(policy.currency(1000.0), "$1.000");
        assert_eq!(policy.currency(1234567.4), "$1.234.567");
        assert_eq!(policy.currency(1234567.5), "$1.234.568");
        assert_eq!(policy.currency(-2500.0), "-$2.500");
    }

    #[test]
    fn test_currency_with_decimals() {
        let policy = FormatPolicy {
            currency: CurrencyFormat {
                symbol: "US$".to_string(),
                thousands_separator: ',',
                decimal_separator: '.',
                precision: 2,
            },
        };
        assert_eq!(policy.currency(1234.5), "US$1,234.50");
        assert_eq!(policy.currency(0.05), "US$0.05");
    }

    #[test]
    fn test_quantity() {
        let policy = FormatPolicy::default();
        assert_eq!(policy.quantity(3.0), "3");
        assert_eq!(policy.quantity(2.5), "2,5");
        assert_eq!(policy.quantity(0.75), "0,75");
        assert_eq!(policy.quantity(1500.0), "1.500");
    }

    #[test]
    fn test_long_date() {
        let policy = FormatPolicy::default();
        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(policy.date(date), "18 de octubre de 2026");
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(
            policy.period(start, date),
            "1 de enero de 2026 al 18 de octubre de 2026"
        );
    }
}
