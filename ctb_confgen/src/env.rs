//! Environment provider that reads values against the configuration shape.
//!
//! Figment's [`Env`] parses every value, so `CTBMODULES_GEN_CTB_HSI__HOST_CTB_HSI=12345`
//! would arrive as an integer and fail to fit a string setting. [`ShapedEnv`]
//! keeps a value as text whenever the same key holds a string in the shape
//! it was given, and parses it as figment would otherwise.

use figment::providers::Env;
use figment::util::nest;
use figment::value::{Dict, Map, Value};
use figment::{Error, Metadata, Profile, Provider};

/// Prefixed, `__`-nested environment variables typed by a JSON shape.
pub(crate) struct ShapedEnv {
    inner: Env,
    shape: serde_json::Value,
}

impl ShapedEnv {
    /// Reads variables starting with `prefix`; `shape` is usually the
    /// serialised defaults.
    pub(crate) fn new(prefix: &str, shape: serde_json::Value) -> Self {
        Self {
            inner: Env::prefixed(prefix).split("__"),
            shape,
        }
    }

    fn is_text(&self, key: &str) -> bool {
        let pointer = format!("/{}", key.replace('.', "/"));
        self.shape
            .pointer(&pointer)
            .is_some_and(serde_json::Value::is_string)
    }

    fn parse_value(&self, key: &str, raw: &str) -> Value {
        if self.is_text(key) {
            return Value::from(raw.to_owned());
        }
        let trimmed = raw.trim();
        trimmed
            .parse()
            .unwrap_or_else(|_| Value::from(trimmed.to_owned()))
    }
}

impl Provider for ShapedEnv {
    fn metadata(&self) -> Metadata {
        self.inner.metadata()
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();
        for (raw_key, raw_value) in self.inner.iter() {
            let key = raw_key.as_str().to_ascii_lowercase();
            let value = self.parse_value(&key, &raw_value);
            let Some(nested) = nest(&key, value).into_dict() else {
                return Err(Error::from(format!(
                    "environment key `{key}` produced a non-object value"
                )));
            };
            merge_dicts(&mut dict, nested);
        }
        Ok(self.inner.profile.collect(dict))
    }
}

/// Sibling keys such as `BOOT__USE_K8S` and `BOOT__IMAGE` share a section.
fn merge_dicts(target: &mut Dict, incoming: Dict) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Dict(_, existing)), Value::Dict(_, nested)) => {
                merge_dicts(existing, nested);
            }
            (_, replacement) => {
                target.insert(key, replacement);
            }
        }
    }
}
