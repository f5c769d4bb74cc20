// src/params.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;

use crate::error::{EvalError, Result};

/// Separator between values in a parameter id, e.g. `0.51:0.99:3`.
pub const PARAM_DELIMITER: char = ':';

/// A decoded parameter value. Numbers are kept numeric so that tables can be
/// sorted and grouped on them; anything else stays text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(v) => ParamValue::Number(v),
            Err(_) => ParamValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// Classifiers with a built-in parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Rdp,
    Blast,
    Sortmerna,
    SortmernaW16,
    Uclust,
    Vsearch,
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Rdp,
        Method::Blast,
        Method::Sortmerna,
        Method::SortmernaW16,
        Method::Uclust,
        Method::Vsearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Rdp => "rdp",
            Method::Blast => "blast",
            Method::Sortmerna => "sortmerna",
            Method::SortmernaW16 => "sortmerna-w16",
            Method::Uclust => "uclust",
            Method::Vsearch => "vsearch",
        }
    }

    /// Names of the colon-separated fields of this method's parameter id.
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Method::Rdp => &["confidence"],
            Method::Blast => &["e-value"],
            Method::Sortmerna | Method::SortmernaW16 => &[
                "min consensus fraction",
                "similarity",
                "best N alignments",
                "coverage",
                "e value",
            ],
            Method::Uclust | Method::Vsearch => {
                &["min consensus fraction", "similarity", "max accepts"]
            }
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| EvalError::UnknownMethod(s.to_string()))
    }
}

/// Method id → parameter field names. Starts with the built-in methods;
/// callers can register schemas for other classifiers.
#[derive(Debug, Clone)]
pub struct ParamSchemas {
    schemas: AHashMap<String, Vec<String>>,
}

impl Default for ParamSchemas {
    fn default() -> Self {
        let schemas = Method::ALL
            .iter()
            .map(|m| {
                let names = m.parameter_names().iter().map(|n| n.to_string()).collect();
                (m.as_str().to_string(), names)
            })
            .collect();
        ParamSchemas { schemas }
    }
}

impl ParamSchemas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the schema for `method`.
    pub fn register(&mut self, method: &str, names: Vec<String>) {
        self.schemas.insert(method.to_string(), names);
    }

    /// Parse `method=field1,field2` and register it.
    pub fn register_spec(&mut self, spec: &str) -> Result<()> {
        let (method, fields) = spec
            .split_once('=')
            .ok_or_else(|| EvalError::UnknownMethod(spec.to_string()))?;
        let names: Vec<String> = fields
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self.register(method.trim(), names);
        Ok(())
    }

    pub fn lookup(&self, method: &str) -> Result<&[String]> {
        self.schemas
            .get(method)
            .map(Vec::as_slice)
            .ok_or_else(|| EvalError::UnknownMethod(method.to_string()))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.schemas.contains_key(method)
    }

    /// Split `params` on `:` and name each value by the method's schema.
    /// A parameter id with more or fewer fields than the schema names is a
    /// `ParameterArity` error, never truncated.
    pub fn decode(&self, method: &str, params: &str) -> Result<BTreeMap<String, ParamValue>> {
        let names = self.lookup(method)?;
        let values: Vec<&str> = params.split(PARAM_DELIMITER).collect();
        if values.len() != names.len() {
            return Err(EvalError::ParameterArity {
                method: method.to_string(),
                expected: names.len(),
                params: params.to_string(),
            });
        }
        Ok(names
            .iter()
            .zip(values)
            .map(|(name, raw)| (name.clone(), ParamValue::parse(raw)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uclust_parameters_decode_to_numbers() {
        let schemas = ParamSchemas::new();
        let decoded = schemas.decode("uclust", "0.51:0.8:3").unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded["min consensus fraction"], ParamValue::Number(0.51));
        assert_eq!(decoded["similarity"], ParamValue::Number(0.8));
        assert_eq!(decoded["max accepts"].as_f64(), Some(3.0));
    }

    #[test]
    fn blast_e_value_keeps_scientific_notation_numeric() {
        let decoded = ParamSchemas::new().decode("blast", "1e-10").unwrap();
        assert_eq!(decoded["e-value"], ParamValue::Number(1e-10));
    }

    #[test]
    fn unknown_method_is_an_explicit_error() {
        let err = ParamSchemas::new().decode("mystery", "1").unwrap_err();
        assert!(matches!(err, EvalError::UnknownMethod(m) if m == "mystery"));
        assert!("mystery".parse::<Method>().is_err());
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = ParamSchemas::new().decode("rdp", "0.5:0.6").unwrap_err();
        assert!(matches!(err, EvalError::ParameterArity { expected: 1, .. }));
    }

    #[test]
    fn registered_schema_is_used() {
        let mut schemas = ParamSchemas::new();
        assert!(!schemas.contains("q2-nb"));
        schemas.register_spec("q2-nb=confidence, alpha").unwrap();
        let decoded = schemas.decode("q2-nb", "0.7:fast").unwrap();
        assert_eq!(decoded["alpha"], ParamValue::Text("fast".to_string()));
        assert_eq!(decoded["confidence"].to_string(), "0.7");
    }

    #[test]
    fn method_names_round_trip() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>().unwrap(), m);
        }
        assert_eq!(Method::SortmernaW16.parameter_names().len(), 5);
    }
}
