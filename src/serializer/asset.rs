//! Assets, symbols and prices.
//!
//! # Design Decisions
//! - Text amounts are rounded to the symbol precision at parse time, so
//!   `parse(to_string(parse(s))) == parse(s)` holds
//! - A tagged (NAI) asset keeps the raw integer the node sent and writes
//!   it back verbatim; text assets are scaled by `10^precision` when
//!   encoded. The two paths are intentionally not unified.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EncodingError;
use crate::serializer::{ByteBuffer, Encode};

/// Symbols are packed into this many null-padded bytes.
const SYMBOL_WIDTH: usize = 7;

/// A token symbol with its fixed precision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Yang,
    Qi,
    Gold,
    Food,
    Wood,
    Fabric,
    Herb,
    /// Any other symbol; precision comes from the parsed amount.
    Custom { name: String, precision: u8 },
}

/// Known symbols: name, numeric asset id, precision.
static REGISTRY: [(Symbol, &str, &str, u8); 7] = [
    (Symbol::Yang, "YANG", "@@000000021", 3),
    (Symbol::Qi, "QI", "@@000000037", 6),
    (Symbol::Gold, "GOLD", "@@000000045", 6),
    (Symbol::Food, "FOOD", "@@000000053", 6),
    (Symbol::Wood, "WOOD", "@@000000061", 6),
    (Symbol::Fabric, "FABR", "@@000000079", 6),
    (Symbol::Herb, "HERB", "@@000000087", 6),
];

impl Symbol {
    fn entry(&self) -> Option<&'static (Symbol, &'static str, &'static str, u8)> {
        REGISTRY.iter().find(|(symbol, ..)| symbol == self)
    }

    /// Resolve a textual symbol. `precision` is only used for custom symbols.
    pub fn from_name(name: &str, precision: u8) -> Self {
        REGISTRY
            .iter()
            .find(|(_, known, ..)| *known == name)
            .map(|(symbol, ..)| symbol.clone())
            .unwrap_or_else(|| Symbol::Custom {
                name: name.to_string(),
                precision,
            })
    }

    /// Resolve a numeric asset id such as `@@000000021`.
    pub fn from_nai(nai: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|(_, _, known, _)| *known == nai)
            .map(|(symbol, ..)| symbol.clone())
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Custom { name, .. } => name,
            known => known.entry().map(|(_, name, ..)| *name).unwrap_or_default(),
        }
    }

    pub fn precision(&self) -> u8 {
        match self {
            Symbol::Custom { precision, .. } => *precision,
            known => known.entry().map(|(.., p)| *p).unwrap_or_default(),
        }
    }

    pub fn nai(&self) -> Option<&'static str> {
        self.entry().map(|(_, _, nai, _)| *nai)
    }

    fn scale(&self) -> f64 {
        10f64.powi(i32::from(self.precision()))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An amount of a token.
///
/// A tagged asset also keeps the integer the node sent, which is what
/// gets written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    amount: f64,
    symbol: Symbol,
    raw: Option<i64>,
}

impl Asset {
    pub fn new(amount: f64, symbol: Symbol) -> Self {
        Self {
            amount,
            symbol,
            raw: None,
        }
    }

    /// An asset in numeric-id form; `raw` is the integer as the node sent it.
    pub fn tagged(raw: i64, symbol: Symbol) -> Self {
        Self {
            amount: raw as f64 / symbol.scale(),
            symbol,
            raw: Some(raw),
        }
    }

    pub fn yang(amount: f64) -> Self {
        Self::new(amount, Symbol::Yang)
    }

    pub fn qi(amount: f64) -> Self {
        Self::new(amount, Symbol::Qi)
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn precision(&self) -> u8 {
        self.symbol.precision()
    }

    /// Whether this asset came in numeric-id form.
    pub fn is_tagged(&self) -> bool {
        self.raw.is_some()
    }

    /// The decimal amount regardless of form.
    pub fn value(&self) -> f64 {
        self.amount
    }

    /// The integer written on the wire.
    pub fn raw_amount(&self) -> Result<i64, EncodingError> {
        if let Some(raw) = self.raw {
            return Ok(raw);
        }
        let scaled = (self.amount * self.symbol.scale()).round();
        // 2^63; i64::MAX itself is not representable as f64.
        const LIMIT: f64 = 9_223_372_036_854_775_808.0;
        if !scaled.is_finite() || scaled < -LIMIT || scaled >= LIMIT {
            return Err(EncodingError::InvalidField {
                path: String::new(),
                message: format!("amount {self} does not fit in 64 bits"),
            });
        }
        Ok(scaled as i64)
    }

    pub fn checked_add(&self, other: &Asset) -> Option<Asset> {
        (self.symbol == other.symbol).then(|| self.with_value(self.value() + other.value()))
    }

    pub fn checked_sub(&self, other: &Asset) -> Option<Asset> {
        (self.symbol == other.symbol).then(|| self.with_value(self.value() - other.value()))
    }

    fn with_value(&self, value: f64) -> Asset {
        Asset::new(round_to(value, &self.symbol), self.symbol.clone())
    }

    fn invalid(input: &str, reason: impl Into<String>) -> EncodingError {
        EncodingError::InvalidAsset {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

fn round_to(value: f64, symbol: &Symbol) -> f64 {
    let scale = symbol.scale();
    (value * scale).round() / scale
}

impl FromStr for Asset {
    type Err = EncodingError;

    /// Accepts `"1.000 YANG"` and `"1000 @@000000021"`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();
        let (Some(amount), Some(symbol), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Asset::invalid(input, "expected `<amount> <symbol>`"));
        };

        if symbol.starts_with("@@") {
            let symbol = Symbol::from_nai(symbol)
                .ok_or_else(|| Asset::invalid(input, "unknown asset id"))?;
            let raw: i64 = amount
                .parse()
                .map_err(|_| Asset::invalid(input, "tagged amount must be an integer"))?;
            return Ok(Asset::tagged(raw, symbol));
        }

        let value: f64 = amount
            .parse()
            .map_err(|_| Asset::invalid(input, "amount is not a number"))?;
        if !value.is_finite() {
            return Err(Asset::invalid(input, "amount is not finite"));
        }
        let digits = amount.split_once('.').map(|(_, frac)| frac.len()).unwrap_or(0);
        let precision =
            u8::try_from(digits).map_err(|_| Asset::invalid(input, "too many decimals"))?;
        let symbol = Symbol::from_name(symbol, precision);
        Ok(Asset::new(round_to(value, &symbol), symbol))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.*} {}",
            usize::from(self.precision()),
            self.value(),
            self.symbol
        )
    }
}

impl Encode for Asset {
    fn encode(&self, buf: &mut ByteBuffer) -> Result<(), EncodingError> {
        let name = self.symbol.name();
        if name.len() > SYMBOL_WIDTH || !name.is_ascii() {
            return Err(EncodingError::SymbolTooLong {
                symbol: name.to_string(),
                path: String::new(),
            });
        }
        if !self.amount.is_finite() {
            return Err(EncodingError::InvalidField {
                path: String::new(),
                message: format!("amount {} is not finite", self.amount),
            });
        }

        buf.write_i64(self.raw_amount()?);
        buf.write_u8(self.precision());
        let mut packed = [0u8; SYMBOL_WIDTH];
        packed[..name.len()].copy_from_slice(name.as_bytes());
        buf.write_bytes(&packed);
        Ok(())
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self.raw, self.symbol.nai()) {
            (Some(raw), Some(nai)) => NaiAsset {
                amount: NaiAmount::Text(raw.to_string()),
                precision: self.precision(),
                nai: nai.to_string(),
            }
            .serialize(serializer),
            _ => serializer.collect_str(self),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct NaiAsset {
    amount: NaiAmount,
    precision: u8,
    nai: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum NaiAmount {
    Text(String),
    Int(i64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AssetRepr {
    Text(String),
    Nai(NaiAsset),
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error as _;

        match AssetRepr::deserialize(deserializer)? {
            AssetRepr::Text(text) => text.parse().map_err(D::Error::custom),
            AssetRepr::Nai(NaiAsset {
                amount,
                precision,
                nai,
            }) => {
                let symbol = Symbol::from_nai(&nai)
                    .ok_or_else(|| D::Error::custom(format!("unknown asset id `{nai}`")))?;
                if symbol.precision() != precision {
                    return Err(D::Error::custom(format!(
                        "precision {precision} does not match {symbol} ({})",
                        symbol.precision()
                    )));
                }
                let raw = match amount {
                    NaiAmount::Int(raw) => raw,
                    NaiAmount::Text(text) => text.parse().map_err(D::Error::custom)?,
                };
                Ok(Asset::tagged(raw, symbol))
            }
        }
    }
}

/// Exchange rate between two assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Result<Self, EncodingError> {
        let input = format!("{base} / {quote}");
        if base.symbol == quote.symbol {
            return Err(Asset::invalid(&input, "base and quote share a symbol"));
        }
        if base.value() == 0.0 || quote.value() == 0.0 {
            return Err(Asset::invalid(&input, "price legs must be nonzero"));
        }
        Ok(Self { base, quote })
    }

    /// Express `asset` in the other leg of the price.
    pub fn convert(&self, asset: &Asset) -> Result<Asset, EncodingError> {
        let (from, to) = if asset.symbol == self.base.symbol {
            (&self.base, &self.quote)
        } else if asset.symbol == self.quote.symbol {
            (&self.quote, &self.base)
        } else {
            return Err(Asset::invalid(
                &asset.to_string(),
                format!("not a leg of {} / {}", self.base.symbol, self.quote.symbol),
            ));
        };
        let value = asset.value() * to.value() / from.value();
        Ok(Asset::new(round_to(value, &to.symbol), to.symbol.clone()))
    }
}

crate::serializer::impl_encode_fields!(Price { base, quote });
