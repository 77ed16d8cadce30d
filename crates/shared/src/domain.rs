use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(AxonId);
id_newtype!(ActionId);
id_newtype!(NeuronId);

pub const ACCOUNT_ID_LEN: usize = 32;
pub const ACCOUNT_ID_HEX_LEN: usize = ACCOUNT_ID_LEN * 2;

/// Smallest-unit tokens per whole token.
pub const E8S_PER_TOKEN: u64 = 100_000_000;
const TOKEN_DECIMALS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountParseError {
    #[error("account must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("account is not valid hex")]
    InvalidHex,
}

/// Ledger account identifier, carried on the wire as `{ "hash": [..] }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId {
    pub hash: [u8; ACCOUNT_ID_LEN],
}

impl AccountId {
    pub fn from_hex(raw: &str) -> Result<Self, AccountParseError> {
        let actual = raw.chars().count();
        if actual != ACCOUNT_ID_HEX_LEN {
            return Err(AccountParseError::InvalidLength {
                expected: ACCOUNT_ID_HEX_LEN,
                actual,
            });
        }

        let mut hash = [0u8; ACCOUNT_ID_LEN];
        hex::decode_to_slice(raw, &mut hash).map_err(|_| AccountParseError::InvalidHex)?;
        Ok(Self { hash })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl FromStr for AccountId {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("amount '{0}' is not a non-negative number")]
    Malformed(String),
    #[error("amount has more than 8 decimal places")]
    TooPrecise,
    #[error("amount is too large")]
    Overflow,
}

/// Token count in e8s (10^-8 of a token).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TokenAmount {
    pub e8s: u64,
}

impl TokenAmount {
    pub fn from_e8s(e8s: u64) -> Self {
        Self { e8s }
    }

    pub fn from_tokens(tokens: u64) -> Option<Self> {
        tokens.checked_mul(E8S_PER_TOKEN).map(Self::from_e8s)
    }

    pub fn whole_tokens(&self) -> u64 {
        self.e8s / E8S_PER_TOKEN
    }

    /// Parses a decimal token count such as `5`, `0.25` or `12.`.
    pub fn parse_tokens(raw: &str) -> Result<Self, AmountParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(AmountParseError::Malformed(raw.to_string()));
        }
        if frac.len() > TOKEN_DECIMALS {
            return Err(AmountParseError::TooPrecise);
        }

        // Digits only at this point, so a parse failure means overflow.
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| AmountParseError::Overflow)?
        };
        let frac: u64 = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = TOKEN_DECIMALS)
                .parse()
                .map_err(|_| AmountParseError::Overflow)?
        };

        whole
            .checked_mul(E8S_PER_TOKEN)
            .and_then(|e8s| e8s.checked_add(frac))
            .map(Self::from_e8s)
            .ok_or(AmountParseError::Overflow)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frac = self.e8s % E8S_PER_TOKEN;
        if frac == 0 {
            return write!(f, "{}", self.whole_tokens());
        }
        let frac = format!("{frac:08}");
        write!(f, "{}.{}", self.whole_tokens(), frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
