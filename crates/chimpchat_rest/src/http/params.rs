//! Query string decoding and typed per-action parameters

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Local;
use image::ImageFormat;
use thiserror::Error;

use crate::capability::is_property_name;

/// Connection wait used by `init` when no `timeout` is given, in milliseconds
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("invalid value '{value}' for parameter '{name}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Decoded query string: parameter name to its values in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, Vec<String>>,
}

impl QueryParams {
    /// Decode `key=value&key=value`.
    ///
    /// Names and values are percent-decoded with `+` read as a space; names
    /// are trimmed. A key without `=` is recorded with no values.
    pub fn parse(query: Option<&str>) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();

        for pair in query.unwrap_or("").split('&') {
            if pair.is_empty() {
                continue;
            }
            let (name, value) = match pair.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (pair, None),
            };

            let name = decode(name).trim().to_string();
            let entry = values.entry(name).or_default();
            if let Some(value) = value {
                entry.push(decode(value).into_owned());
            }
        }

        Self { values }
    }

    /// First value of `name`; later repeats are never consulted
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.first(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn required(&self, name: &'static str) -> Result<String, ParamError> {
        match self.first(name) {
            None => Err(ParamError::Missing(name)),
            Some("") => Err(ParamError::Invalid {
                name,
                value: String::new(),
                reason: "must not be empty".to_string(),
            }),
            Some(v) => Ok(v.to_string()),
        }
    }

    /// A required value that is also a well-formed property name
    fn property_name(&self, name: &'static str) -> Result<String, ParamError> {
        let value = self.required(name)?;
        if !is_property_name(&value) {
            return Err(ParamError::Invalid {
                name,
                value,
                reason: "expected letters, digits and . _ : @ -".to_string(),
            });
        }
        Ok(value)
    }
}

fn decode(raw: &str) -> Cow<'_, str> {
    if raw.contains('+') {
        let spaced = raw.replace('+', " ");
        let decoded = urlencoding::decode(&spaced)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| spaced.clone());
        Cow::Owned(decoded)
    } else {
        urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw))
    }
}

/// Typed parameters of one action, extracted from the query string
pub trait FromQuery: Sized {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError>;
}

/// `/init?timeout=<ms>&serialno=<serial>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitParams {
    pub timeout: Duration,
    pub serialno: Option<String>,
}

impl FromQuery for InitParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        let timeout_ms = match params.first("timeout") {
            None => DEFAULT_INIT_TIMEOUT_MS,
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ParamError::Invalid {
                name: "timeout",
                value: raw.to_string(),
                reason: e.to_string(),
            })?,
        };

        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
            serialno: params.optional("serialno"),
        })
    }
}

/// `/reboot?into=<mode>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebootParams {
    pub into: Option<String>,
}

impl FromQuery for RebootParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        Ok(Self {
            into: params.optional("into"),
        })
    }
}

/// `/install?apk=<path>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallParams {
    pub apk: PathBuf,
}

impl FromQuery for InstallParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        Ok(Self {
            apk: PathBuf::from(params.required("apk")?),
        })
    }
}

/// `/remove?pkg=<package>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveParams {
    pub pkg: String,
}

impl FromQuery for RemoveParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        Ok(Self {
            pkg: params.required("pkg")?,
        })
    }
}

/// `/getVar?var=<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetVarParams {
    pub var: String,
}

impl FromQuery for GetVarParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        Ok(Self {
            var: params.property_name("var")?,
        })
    }
}

/// `/getProp?prop=<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetPropParams {
    pub prop: String,
}

impl FromQuery for GetPropParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        Ok(Self {
            prop: params.property_name("prop")?,
        })
    }
}

/// `/type?s=<text>`; an empty `s` types nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParams {
    pub text: String,
}

impl FromQuery for TypeParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        params
            .first("s")
            .map(|s| Self { text: s.to_string() })
            .ok_or(ParamError::Missing("s"))
    }
}

/// `/takeSnapshot?path=<file>&format=<format>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotParams {
    pub path: PathBuf,
    pub format: Option<ImageFormat>,
}

impl FromQuery for SnapshotParams {
    fn from_query(params: &QueryParams) -> Result<Self, ParamError> {
        let format = params
            .optional("format")
            .map(|raw| {
                ImageFormat::from_extension(raw.to_ascii_lowercase()).ok_or_else(|| {
                    ParamError::Invalid {
                        name: "format",
                        value: raw.clone(),
                        reason: "unknown image format".to_string(),
                    }
                })
            })
            .transpose()?;

        let path = match params.optional("path") {
            Some(path) => PathBuf::from(path),
            None => default_snapshot_path(format),
        };

        Ok(Self { path, format })
    }
}

/// `snapshot_<timestamp>.<ext>` in the working directory
fn default_snapshot_path(format: Option<ImageFormat>) -> PathBuf {
    let ext = format
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("png");
    let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S-%3f");
    PathBuf::from(format!("snapshot_{}.{}", stamp, ext))
}
