//! Blob decode/encode for the three wire formats a blob's key extension selects.
//!
//! Grounded on `examples/original_source/internal/orderbook/hist.go`
//! and `internal/orderbook/orderbook.go` (`DepthLevel.MarshalJSON`).
//! Each format calls its own codec here, unlike the source, where the
//! `json` and `msgpack` branches both called the msgpack decoder.
//!
//! Only the `json` codec needs a custom `DepthLevel` representation
//! (JSON requires string map keys; msgpack and bincode do not), so the
//! `msgpack`/`bin` codecs serialize the domain types directly while
//! `json` goes through a `JsonDepthLevel` newtype.

use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;
use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CacheError;
use crate::model::{DepthDiff, DepthLevel, OrderBook, OrderBookHistory};

/// The three wire formats a blob's key extension selects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bin,
    MsgPack,
    Json,
}

impl Format {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "bin" => Some(Format::Bin),
            "msgpack" => Some(Format::MsgPack),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Bin => "bin",
            Format::MsgPack => "msgpack",
            Format::Json => "json",
        }
    }
}

// ---- native (numeric-keyed) wire shape: msgpack + bin -------------

#[derive(Serialize, Deserialize)]
struct NativeOrderBook {
    time: i64,
    bids: DepthLevel,
    asks: DepthLevel,
}

#[derive(Serialize, Deserialize)]
struct NativeDepthDiff {
    time: i64,
    bids: DepthLevel,
    asks: DepthLevel,
}

#[derive(Serialize, Deserialize)]
struct NativeHistory {
    symbol: String,
    start: NativeOrderBook,
    history: Vec<NativeDepthDiff>,
}

impl From<&OrderBookHistory> for NativeHistory {
    fn from(h: &OrderBookHistory) -> Self {
        NativeHistory {
            symbol: h.symbol.clone(),
            start: NativeOrderBook {
                time: h.start.time,
                bids: h.start.bids.clone(),
                asks: h.start.asks.clone(),
            },
            history: h
                .diffs
                .iter()
                .map(|d| NativeDepthDiff {
                    time: d.time,
                    bids: d.bids.clone(),
                    asks: d.asks.clone(),
                })
                .collect(),
        }
    }
}

impl From<NativeHistory> for OrderBookHistory {
    fn from(n: NativeHistory) -> Self {
        OrderBookHistory {
            symbol: n.symbol,
            start: OrderBook {
                time: n.start.time,
                bids: n.start.bids,
                asks: n.start.asks,
            },
            diffs: n
                .history
                .into_iter()
                .map(|d| DepthDiff {
                    time: d.time,
                    bids: d.bids,
                    asks: d.asks,
                })
                .collect(),
        }
    }
}

// ---- json (string-keyed) wire shape ---------------------------------

/// `DepthLevel` encoded as a map whose keys and values are the
/// `UpperExp`-formatted string representations of the underlying
/// reals, matching
/// `internal/orderbook/orderbook.go`'s `MarshalJSON`/`UnmarshalJSON`.
struct JsonDepthLevel(DepthLevel);

fn format_real(v: f32) -> String {
    format!("{v:E}")
}

impl Serialize for JsonDepthLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (price, volume) in &self.0 {
            map.serialize_entry(&format_real(price.into_inner()), &format_real(*volume))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for JsonDepthLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: HashMap<String, String> = HashMap::deserialize(deserializer)?;
        let mut level = BTreeMap::new();
        for (key, value) in raw {
            let price: f32 = key.parse().map_err(D::Error::custom)?;
            let volume: f32 = value.parse().map_err(D::Error::custom)?;
            level.insert(OrderedFloat(price), volume);
        }
        Ok(JsonDepthLevel(level))
    }
}

#[derive(Serialize, Deserialize)]
struct JsonOrderBook {
    time: i64,
    bids: JsonDepthLevel,
    asks: JsonDepthLevel,
}

#[derive(Serialize, Deserialize)]
struct JsonDepthDiff {
    time: i64,
    bids: JsonDepthLevel,
    asks: JsonDepthLevel,
}

#[derive(Serialize, Deserialize)]
struct JsonHistory {
    symbol: String,
    start: JsonOrderBook,
    history: Vec<JsonDepthDiff>,
}

impl From<&OrderBookHistory> for JsonHistory {
    fn from(h: &OrderBookHistory) -> Self {
        JsonHistory {
            symbol: h.symbol.clone(),
            start: JsonOrderBook {
                time: h.start.time,
                bids: JsonDepthLevel(h.start.bids.clone()),
                asks: JsonDepthLevel(h.start.asks.clone()),
            },
            history: h
                .diffs
                .iter()
                .map(|d| JsonDepthDiff {
                    time: d.time,
                    bids: JsonDepthLevel(d.bids.clone()),
                    asks: JsonDepthLevel(d.asks.clone()),
                })
                .collect(),
        }
    }
}

impl From<JsonHistory> for OrderBookHistory {
    fn from(j: JsonHistory) -> Self {
        OrderBookHistory {
            symbol: j.symbol,
            start: OrderBook {
                time: j.start.time,
                bids: j.start.bids.0,
                asks: j.start.asks.0,
            },
            diffs: j
                .history
                .into_iter()
                .map(|d| DepthDiff {
                    time: d.time,
                    bids: d.bids.0,
                    asks: d.asks.0,
                })
                .collect(),
        }
    }
}

/// Decodes a blob's bytes into a history. Pure and deterministic; a
/// decode failure is fatal to the owning request.
pub fn decode(bytes: &[u8], format: Format) -> Result<OrderBookHistory, CacheError> {
    match format {
        Format::MsgPack => rmp_serde::from_slice::<NativeHistory>(bytes)
            .map(Into::into)
            .map_err(|e| CacheError::Decode(e.to_string())),
        Format::Bin => bincode::deserialize::<NativeHistory>(bytes)
            .map(Into::into)
            .map_err(|e| CacheError::Decode(e.to_string())),
        Format::Json => serde_json::from_slice::<JsonHistory>(bytes)
            .map(Into::into)
            .map_err(|e| CacheError::Decode(e.to_string())),
    }
}

/// Encodes a history into a blob of the given format. Used to build
/// fixtures in tests; the data-miner (out of core scope) is the only
/// real producer.
pub fn encode(history: &OrderBookHistory, format: Format) -> Result<Vec<u8>, CacheError> {
    match format {
        Format::MsgPack => {
            rmp_serde::to_vec(&NativeHistory::from(history)).map_err(|e| CacheError::Decode(e.to_string()))
        }
        Format::Bin => {
            bincode::serialize(&NativeHistory::from(history)).map_err(|e| CacheError::Decode(e.to_string()))
        }
        Format::Json => {
            serde_json::to_vec(&JsonHistory::from(history)).map_err(|e| CacheError::Decode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrderBookHistory {
        let mut start = OrderBook::new(100);
        start.bids.insert(OrderedFloat(1.0), 2.0);
        start.asks.insert(OrderedFloat(1.5), 3.0);

        let mut d = DepthDiff {
            time: 110,
            ..Default::default()
        };
        d.bids.insert(OrderedFloat(1.0), 0.0);
        d.bids.insert(OrderedFloat(1.25), 5.0);

        OrderBookHistory {
            symbol: "btcusdt".into(),
            start,
            diffs: vec![d],
        }
    }

    #[test]
    fn json_round_trips() {
        let original = sample();
        let bytes = encode(&original, Format::Json).unwrap();
        let decoded = decode(&bytes, Format::Json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn msgpack_round_trips() {
        let original = sample();
        let bytes = encode(&original, Format::MsgPack).unwrap();
        let decoded = decode(&bytes, Format::MsgPack).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn bin_round_trips() {
        let original = sample();
        let bytes = encode(&original, Format::Bin).unwrap();
        let decoded = decode(&bytes, Format::Bin).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn each_extension_selects_its_own_format() {
        assert_eq!(Format::from_extension("bin"), Some(Format::Bin));
        assert_eq!(Format::from_extension("msgpack"), Some(Format::MsgPack));
        assert_eq!(Format::from_extension("json"), Some(Format::Json));
        assert_eq!(Format::from_extension("yaml"), None);
    }

    #[test]
    fn malformed_bytes_are_a_decode_error() {
        let err = decode(b"not a real blob", Format::Json).unwrap_err();
        assert!(matches!(err, CacheError::Decode(_)));
    }
}
