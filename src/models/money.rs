//! Money type for representing currency amounts
//!
//! Internally stores amounts in minor units (cents, i64) to avoid
//! floating-point precision issues. Parsing from decimal strings is done with
//! integer arithmetic only; floats are accepted at the boundary but are
//! converted through their shortest decimal representation first.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use thiserror::Error;

/// Minor units per major unit
const MINOR_PER_MAJOR: i64 = 100;

/// Currency symbols dropped before parsing
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥'];

/// Represents a monetary amount stored as cents (hundredths of the currency unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Create a Money amount from cents
    ///
    /// # Examples
    /// ```
    /// use ledger_cli::models::Money;
    /// let amount = Money::from_cents(1050); // $10.50
    /// assert_eq!(amount.to_major_string(), "10.50");
    /// ```
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Create a zero Money amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Get the amount in cents
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Check if the amount is zero
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Check if the amount is positive
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Check if the amount is negative
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Parse a decimal amount in major units
    ///
    /// Accepts `"10.50"`, `"-10.50"`, `"$1,234.56"`, `"(42.00)"` (negative),
    /// `"25.99-"` (trailing sign) and `"10"`. More than two decimals are
    /// rounded half away from zero. Commas are only accepted between groups
    /// of three whole digits and whitespace never splits the number, so
    /// `"1.234,56"` and `"1 2"` are rejected rather than misread.
    ///
    /// ```
    /// use ledger_cli::models::Money;
    /// assert_eq!(Money::from_major_str("(42.00)").unwrap().cents(), -4200);
    /// assert_eq!(Money::from_major_str("0.125").unwrap().cents(), 13);
    /// ```
    pub fn from_major_str(s: &str) -> Result<Self, MoneyParseError> {
        let original = s;
        let invalid = || MoneyParseError::InvalidFormat(original.trim().to_string());
        let is_numeric = |c: char| c.is_ascii_digit() || c == ',' || c == '.';

        let mut cleaned = String::with_capacity(s.len());
        let mut after_space = false;
        for c in s.trim().chars() {
            if c.is_whitespace() {
                after_space = true;
                continue;
            }
            if CURRENCY_SYMBOLS.contains(&c) {
                continue;
            }
            if after_space && is_numeric(c) && cleaned.chars().last().is_some_and(is_numeric) {
                return Err(invalid());
            }
            after_space = false;
            cleaned.push(c);
        }

        if cleaned.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        // Accounting format: parentheses mean negative
        let (parenthesized, body) = match cleaned
            .strip_prefix('(')
            .and_then(|inner| inner.strip_suffix(')'))
        {
            Some(inner) => (true, inner),
            None => (false, cleaned.as_str()),
        };

        let (signed_negative, digits) = if let Some(rest) = body.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = body.strip_prefix('+') {
            (false, rest)
        } else if let Some(rest) = body.strip_suffix('-') {
            (true, rest)
        } else {
            (false, body)
        };

        if parenthesized && signed_negative {
            return Err(invalid());
        }

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        let whole = ungroup(whole).ok_or_else(invalid)?;

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let mut magnitude: i64 = 0;
        for digit in whole.bytes() {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add(i64::from(digit - b'0')))
                .ok_or(MoneyParseError::Overflow)?;
        }
        magnitude = magnitude
            .checked_mul(MINOR_PER_MAJOR)
            .ok_or(MoneyParseError::Overflow)?;

        let mut fraction_digits = fraction.bytes().map(|d| i64::from(d - b'0'));
        let tenths = fraction_digits.next().unwrap_or(0);
        let hundredths = fraction_digits.next().unwrap_or(0);
        let round_up = fraction_digits.next().is_some_and(|d| d >= 5);

        magnitude = magnitude
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))
            .ok_or(MoneyParseError::Overflow)?;

        if parenthesized || signed_negative {
            Ok(Self(-magnitude))
        } else {
            Ok(Self(magnitude))
        }
    }

    /// Convert a float amount in major units
    ///
    /// The float is formatted with its shortest round-trip representation and
    /// then parsed as a decimal string, so `1.005` becomes 101 cents rather
    /// than the 100 that `(1.005 * 100.0).round()` would give.
    pub fn from_major_f64(value: f64) -> Result<Self, MoneyParseError> {
        if !value.is_finite() {
            return Err(MoneyParseError::NotFinite);
        }
        Self::from_major_str(&value.to_string())
    }

    /// Format in major units with sign and grouping separators, no symbol
    ///
    /// ```
    /// use ledger_cli::models::Money;
    /// assert_eq!(Money::from_cents(-123456).to_major_string(), "-1,234.56");
    /// ```
    pub fn to_major_string(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}", sign, self.unsigned_major())
    }

    /// Format with a currency symbol, e.g. `-€1,234.56`
    pub fn format_with_symbol(&self, symbol: &str) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        format!("{}{}{}", sign, symbol, self.unsigned_major())
    }

    fn unsigned_major(&self) -> String {
        let magnitude = self.0.unsigned_abs();
        let whole = magnitude / MINOR_PER_MAJOR as u64;
        let minor = magnitude % MINOR_PER_MAJOR as u64;
        format!("{}.{:02}", group_thousands(whole), minor)
    }
}

/// Strip thousands separators, which must sit between groups of three
/// digits (`1,234,567`); any other comma placement is `None`
fn ungroup(whole: &str) -> Option<String> {
    if !whole.contains(',') {
        return Some(whole.to_string());
    }

    let mut groups = whole.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 {
        return None;
    }

    let mut digits = lead.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Insert `,` every three digits from the right
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with_symbol("$"))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Self)
    }
}

/// Error type for money parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("Empty money amount")]
    Empty,
    #[error("Invalid money format: {0}")]
    InvalidFormat(String),
    #[error("Money amount out of range")]
    Overflow,
    #[error("Money amount is not a finite number")]
    NotFinite,
}
