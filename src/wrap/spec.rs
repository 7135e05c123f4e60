use serde_json::Value;

use crate::error::ProfileError;
use crate::telemetry::event::Options;

/// Label and options attached to a wrapped callable.
///
/// Every call shape converts into it:
///
/// ```ignore
/// profile_with(f, ());                 // nothing
/// profile_with(f, "db");               // label
/// profile_with(f, options);            // options
/// profile_with(f, ("db", options));    // label + options
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSpec {
    pub label: Option<String>,
    pub options: Option<Options>,
}

impl ProfileSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }
}

impl From<()> for ProfileSpec {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<&str> for ProfileSpec {
    fn from(label: &str) -> Self {
        Self::new().label(label)
    }
}

impl From<String> for ProfileSpec {
    fn from(label: String) -> Self {
        Self::new().label(label)
    }
}

impl From<Options> for ProfileSpec {
    fn from(options: Options) -> Self {
        Self::new().options(options)
    }
}

impl<L: Into<String>> From<(L, Options)> for ProfileSpec {
    fn from((label, options): (L, Options)) -> Self {
        Self::new().label(label).options(options)
    }
}

/// Resolves an untyped argument: a string is a label, an object is options.
impl TryFrom<Value> for ProfileSpec {
    type Error = ProfileError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(label) => Ok(Self::new().label(label)),
            Value::Object(map) => Ok(Self::new().options(map.into())),
            other => Err(ProfileError::UnsupportedSpec {
                found: json_kind(&other),
            }),
        }
    }
}

/// Resolves the two-argument form `(label, options)`. Either half may be
/// `null` to leave it unset.
impl TryFrom<(Value, Value)> for ProfileSpec {
    type Error = ProfileError;

    fn try_from((label, options): (Value, Value)) -> Result<Self, Self::Error> {
        let label = match label {
            Value::Null => None,
            Value::String(label) => Some(label),
            other => {
                return Err(ProfileError::UnsupportedSpec {
                    found: json_kind(&other),
                })
            }
        };
        let options = match options {
            Value::Null => None,
            Value::Object(map) => Some(map.into()),
            other => {
                return Err(ProfileError::UnsupportedSpec {
                    found: json_kind(&other),
                })
            }
        };
        Ok(Self { label, options })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
