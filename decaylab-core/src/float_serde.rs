//! Lossless serde for configuration floats that may be infinite.
//!
//! JSON has no literal for infinity (`serde_json` writes `null`), so
//! non-finite values are written as the strings `"inf"`, `"-inf"` and
//! `"nan"`. Finite values stay plain numbers. Either form is accepted on
//! load, so TOML's native `inf` keeps working.
//!
//! Use with `#[serde(with = "decaylab_core::float_serde")]`.

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else if value.is_nan() {
        serializer.serialize_str("nan")
    } else if value.is_sign_positive() {
        serializer.serialize_str("inf")
    } else {
        serializer.serialize_str("-inf")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr {
    Number(f64),
    Text(String),
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Text(text) => match text.as_str() {
            "inf" | "+inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "nan" => Ok(f64::NAN),
            other => Err(de::Error::invalid_value(
                Unexpected::Str(other),
                &"a number, \"inf\", \"-inf\" or \"nan\"",
            )),
        },
    }
}
