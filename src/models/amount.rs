//! Token amounts
//!
//! Fixed-point token quantities stored as atto units (1 token = 10^18 atto).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimals of one token
pub const DECIMALS: u32 = 18;

const ATTO_PER_TOKEN: u128 = 10u128.pow(DECIMALS);

/// Amount parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount: {0}")]
    Invalid(String),

    #[error("negative amount: {0}")]
    Negative(String),

    #[error("amount {0} is more precise than 1e-18")]
    Precision(String),

    #[error("amount {0} is out of range")]
    Overflow(String),
}

/// Token quantity in atto units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_atto(atto: u128) -> Self {
        Self(atto)
    }

    pub fn from_tokens(tokens: u64) -> Self {
        Self(tokens as u128 * ATTO_PER_TOKEN)
    }

    pub fn atto(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Multiply by a count, saturating on overflow
    pub fn times(self, count: u64) -> Amount {
        Amount(self.0.saturating_mul(count as u128))
    }

    /// Parse a hex encoded atto quantity as returned by the RPC (`0x...`)
    pub fn from_hex(value: &str) -> Result<Self, AmountError> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        if digits.is_empty() {
            return Ok(Amount::ZERO);
        }
        u128::from_str_radix(digits, 16)
            .map(Amount)
            .map_err(|_| AmountError::Invalid(value.to_string()))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts `12`, `0.5`, `.5`, `1.00E-18` and `2e3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }
        if s.starts_with('-') {
            return Err(AmountError::Negative(s.to_string()));
        }
        let unsigned = s.strip_prefix('+').unwrap_or(s);

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(idx) => {
                let exp: i32 = unsigned[idx + 1..]
                    .parse()
                    .map_err(|_| AmountError::Invalid(s.to_string()))?;
                (&unsigned[..idx], exp)
            }
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let digits = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Amount::ZERO);
        }
        let mut value: u128 = digits
            .parse()
            .map_err(|_| AmountError::Overflow(s.to_string()))?;

        // value * 10^(DECIMALS + exponent - frac_len)
        let scale = DECIMALS as i64 + exponent as i64 - frac_part.len() as i64;
        if scale >= 0 {
            for _ in 0..scale {
                value = value
                    .checked_mul(10)
                    .ok_or_else(|| AmountError::Overflow(s.to_string()))?;
            }
        } else {
            for _ in 0..(-scale) {
                if value % 10 != 0 {
                    return Err(AmountError::Precision(s.to_string()));
                }
                value /= 10;
            }
        }

        Ok(Amount(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / ATTO_PER_TOKEN;
        let frac = self.0 % ATTO_PER_TOKEN;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
        }

        let text = match Raw::deserialize(deserializer)? {
            Raw::Int(n) => n.to_string(),
            Raw::Float(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!("1".parse::<Amount>().unwrap(), Amount::from_tokens(1));
        assert_eq!(
            "0.5".parse::<Amount>().unwrap(),
            Amount::from_atto(500_000_000_000_000_000)
        );
        assert_eq!(".25".parse::<Amount>().unwrap().to_string(), "0.25");
        assert_eq!("0".parse::<Amount>().unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!("1.00E-18".parse::<Amount>().unwrap(), Amount::from_atto(1));
        assert_eq!("2e3".parse::<Amount>().unwrap(), Amount::from_tokens(2000));
        assert_eq!(
            "1e-19".parse::<Amount>(),
            Err(AmountError::Precision("1e-19".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Empty));
        assert!(matches!(
            "-1".parse::<Amount>(),
            Err(AmountError::Negative(_))
        ));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Invalid(_))));
        assert!(matches!(".".parse::<Amount>(), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn test_parse_extreme_exponents() {
        assert_eq!("0e-900000000".parse::<Amount>().unwrap(), Amount::ZERO);
        assert_eq!("0.000e2147483647".parse::<Amount>().unwrap(), Amount::ZERO);
        assert_eq!(
            "1e-2147483648".parse::<Amount>(),
            Err(AmountError::Precision("1e-2147483648".to_string()))
        );
        assert_eq!(
            "1e2147483647".parse::<Amount>(),
            Err(AmountError::Overflow("1e2147483647".to_string()))
        );
    }

    #[test]
    fn test_display_trims_zeros() {
        assert_eq!(Amount::from_tokens(10).to_string(), "10");
        assert_eq!(Amount::from_atto(1).to_string(), "0.000000000000000001");
        assert_eq!("1.2500".parse::<Amount>().unwrap().to_string(), "1.25");
    }

    #[test]
    fn test_from_hex() {
        assert_eq!(
            Amount::from_hex("0xde0b6b3a7640000").unwrap(),
            Amount::from_tokens(1)
        );
        assert_eq!(Amount::from_hex("0x").unwrap(), Amount::ZERO);
        assert!(Amount::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_arithmetic() {
        let one = Amount::from_tokens(1);
        assert_eq!(one.times(10), Amount::from_tokens(10));
        assert_eq!(one.checked_sub(Amount::from_tokens(2)), None);
        assert_eq!(one.saturating_sub(Amount::from_tokens(2)), Amount::ZERO);
        assert_eq!(
            one.checked_add(one).unwrap(),
            Amount::from_tokens(2)
        );
    }

    #[test]
    fn test_deserialize_yaml_forms() {
        #[derive(Deserialize)]
        struct Holder {
            a: Amount,
            b: Amount,
            c: Amount,
        }

        let holder: Holder = serde_yaml::from_str("a: 1\nb: 0.001\nc: \"1.00E-18\"\n").unwrap();
        assert_eq!(holder.a, Amount::from_tokens(1));
        assert_eq!(holder.b.to_string(), "0.001");
        assert_eq!(holder.c, Amount::from_atto(1));
    }
}
