use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;
pub const DISPLAY_FRACTION_DIGITS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount must not be empty")]
    Empty,
    #[error("amount must be a positive decimal number")]
    Invalid,
    #[error("amount has more than {decimals} fractional digits")]
    TooPrecise { decimals: u8 },
    #[error("amount is too large")]
    Overflow,
}

/// Token quantity in base units (the smallest indivisible unit of the token).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TokenAmount(u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn base_units(self) -> u128 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Parses a base-unit integer as returned by contract reads ("12500000000000000000").
    pub fn parse_base_units(raw: &str) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(AmountError::Invalid);
        }
        trimmed
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::Overflow)
    }

    /// Parses a human decimal such as "12.50" into base units.
    pub fn parse_units(raw: &str, decimals: u8) -> Result<Self, AmountError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountError::Invalid);
        }
        let all_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return Err(AmountError::Invalid);
        }
        if fraction.len() > usize::from(decimals) {
            return Err(AmountError::TooPrecise { decimals });
        }

        let scale = pow10(decimals)?;
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u128>().map_err(|_| AmountError::Overflow)?
        };
        let fraction_units = if fraction.is_empty() {
            0
        } else {
            let digits = u8::try_from(fraction.len()).map_err(|_| AmountError::TooPrecise { decimals })?;
            let padding = decimals - digits;
            fraction
                .parse::<u128>()
                .map_err(|_| AmountError::Overflow)?
                .checked_mul(pow10(padding)?)
                .ok_or(AmountError::Overflow)?
        };

        whole_units
            .checked_mul(scale)
            .and_then(|units| units.checked_add(fraction_units))
            .map(Self)
            .ok_or(AmountError::Overflow)
    }

    /// Formats with a fixed number of fraction digits, truncating the rest.
    #[must_use]
    pub fn format_units(self, decimals: u8, fraction_digits: usize) -> String {
        let Ok(scale) = pow10(decimals) else {
            return self.0.to_string();
        };
        let whole = self.0 / scale;
        if fraction_digits == 0 {
            return whole.to_string();
        }
        let fraction = self.0 % scale;
        let mut fraction_text = if decimals == 0 {
            String::new()
        } else {
            format!("{:0width$}", fraction, width = usize::from(decimals))
        };
        fraction_text.truncate(fraction_digits);
        while fraction_text.len() < fraction_digits {
            fraction_text.push('0');
        }
        format!("{whole}.{fraction_text}")
    }

    #[must_use]
    pub fn display(self, decimals: u8) -> String {
        self.format_units(decimals, DISPLAY_FRACTION_DIGITS)
    }
}

fn pow10(exponent: u8) -> Result<u128, AmountError> {
    10_u128
        .checked_pow(u32::from(exponent))
        .ok_or(AmountError::Overflow)
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<TokenAmount> for String {
    fn from(value: TokenAmount) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = AmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_base_units(&value)
    }
}
