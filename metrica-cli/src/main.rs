//! Metrica command line front end
//!
//! Reads one JSON request per line from stdin and writes one JSON response
//! per line to stdout.
//!
//! Methods:
//! - parse: Read a quantity or level from text
//! - convert: Read a quantity or level and express it in another measure
//! - extend: Add inline definitions to the catalog
//! - load: Add a definitions file to the catalog
//! - list: List catalog entries

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use metrica_core::{codes, Diagnostic};
use metrica_runtime::{LoadError, LoaderConfig, RuntimeLoader};
use metrica_units::{
    try_parse, Catalog, FamilyId, Measure, Module, NumberFormat, NumberStyles, Parsed,
};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    diagnostics: Vec<Diagnostic>,
}

impl ErrorBody {
    fn new(code: &str, message: impl Into<String>) -> Self {
        ErrorBody { code: code.to_string(), message: message.into(), diagnostics: Vec::new() }
    }

    fn invalid(message: impl Into<String>) -> Self {
        ErrorBody::new("INVALID_REQUEST", message)
    }
}

impl From<LoadError> for ErrorBody {
    fn from(e: LoadError) -> Self {
        let code = e.diagnostics.first().map_or(codes::LOAD_ERROR, |d| d.code.as_str()).to_string();
        ErrorBody { code, message: e.to_string(), diagnostics: e.diagnostics }
    }
}

struct Session {
    catalog: Catalog<f64>,
    loader: RuntimeLoader,
}

impl Session {
    fn start(config: LoaderConfig) -> Result<Self, LoadError> {
        let mut catalog = Catalog::new();
        let mut loader = RuntimeLoader::new(config);
        let added = loader.install(&mut catalog, Module::builtin(), None)?;
        tracing::info!(added, "built-in catalog loaded");
        Ok(Session { catalog, loader })
    }

    fn handle(&mut self, request: &Request) -> Response {
        let params = request.params.clone().unwrap_or_else(|| json!({}));
        let result = match request.method.as_str() {
            "parse" => self.parse(&params),
            "convert" => self.convert(&params),
            "extend" => self.extend(&params),
            "load" => self.load(&params),
            "list" => self.list(&params),
            "version" => Ok(json!({ "version": SERVER_VERSION })),
            _ => Err(ErrorBody::new("METHOD_NOT_FOUND", format!("Method not found: {}", request.method))),
        };

        match result {
            Ok(r) => Response { id: request.id.clone(), result: Some(r), error: None },
            Err(e) => Response { id: request.id.clone(), result: None, error: Some(e) },
        }
    }

    fn parse(&self, params: &JsonValue) -> Result<JsonValue, ErrorBody> {
        let text = str_param(params, "text")?;
        let allowed: Vec<Measure<f64>> = match family_param(params)? {
            Some(family) => self.catalog.items_in_family(family).cloned().collect(),
            None => self.catalog.items().cloned().collect(),
        };
        let parsed = read(text, &allowed, params)?;
        Ok(parsed_json(&parsed))
    }

    fn convert(&self, params: &JsonValue) -> Result<JsonValue, ErrorBody> {
        let text = str_param(params, "text")?;
        let to = str_param(params, "to")?;
        let target = self.catalog.find(to)
            .ok_or_else(|| ErrorBody::new(codes::UNDEFINED_REF, format!("unknown symbol '{}'", to)))?;

        let allowed: Vec<Measure<f64>> = self.catalog.items_in_family(target.family()).cloned().collect();
        let parsed = read(text, &allowed, params)?;

        let converted = match (&parsed, target) {
            (Parsed::Quantity(q), Measure::Unit(u)) => u.from(q).map(Parsed::Quantity),
            (Parsed::Level(l), Measure::Unit(u)) => u.from(&l.to_quantity()).map(Parsed::Quantity),
            (Parsed::Quantity(q), Measure::Scale(s)) => s.from_quantity(q).map(Parsed::Level),
            (Parsed::Level(l), Measure::Scale(s)) => s.from_level(l).map(Parsed::Level),
        }
        .map_err(|e| ErrorBody::new(codes::INCOMPATIBLE_FAMILY, e.to_string()))?;

        Ok(json!({
            "from": parsed_json(&parsed),
            "value": converted.value(),
            "symbol": to,
            "name": target.name(),
            "kind": target.kind(),
            "text": format!("{}", converted),
        }))
    }

    fn extend(&mut self, params: &JsonValue) -> Result<JsonValue, ErrorBody> {
        let definitions = str_param(params, "definitions")?;
        let report = self.loader.load_str(&mut self.catalog, definitions)?;
        serde_json::to_value(report).map_err(|e| ErrorBody::new(codes::IO_ERROR, e.to_string()))
    }

    fn load(&mut self, params: &JsonValue) -> Result<JsonValue, ErrorBody> {
        let path = PathBuf::from(str_param(params, "path")?);
        let report = self.loader.load_file(&mut self.catalog, &path)?;
        serde_json::to_value(report).map_err(|e| ErrorBody::new(codes::IO_ERROR, e.to_string()))
    }

    fn list(&self, params: &JsonValue) -> Result<JsonValue, ErrorBody> {
        let family = family_param(params)?;
        let entries: Vec<JsonValue> = self.catalog
            .items_where(|m: &Measure<f64>| family.map_or(true, |f| m.family() == f))
            .map(|m| json!({
                "name": m.name(),
                "kind": m.kind(),
                "symbols": m.symbols(),
                "family": m.family(),
                "primary": self.catalog.is_primary(m),
                "sense": m.sense().to_string(),
            }))
            .collect();
        Ok(json!({ "count": entries.len(), "entries": entries }))
    }
}

fn str_param<'a>(params: &'a JsonValue, key: &str) -> Result<&'a str, ErrorBody> {
    params.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ErrorBody::invalid(format!("Missing {} argument", key)))
}

fn family_param(params: &JsonValue) -> Result<Option<FamilyId>, ErrorBody> {
    match params.get("family") {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v.as_u64()
            .and_then(|n| FamilyId::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ErrorBody::invalid("family must be a non-negative integer")),
    }
}

fn read(text: &str, allowed: &[Measure<f64>], params: &JsonValue) -> Result<Parsed<f64>, ErrorBody> {
    let format = params.get("locale")
        .and_then(|v| v.as_str())
        .map_or_else(NumberFormat::invariant, NumberFormat::for_locale);
    try_parse(text, allowed, NumberStyles::ANY, &format)
        .map_err(|e| ErrorBody::new(codes::PARSE_FAILURE, e.to_string()))
}

fn parsed_json(parsed: &Parsed<f64>) -> JsonValue {
    let measure = parsed.measure();
    json!({
        "value": parsed.value(),
        "symbol": measure.symbols().first(),
        "name": measure.name(),
        "kind": measure.kind(),
    })
}

fn write_response(response: &Response) -> io::Result<()> {
    let line = serde_json::to_string(response).map_err(io::Error::other)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("METRICA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    let mut session = match Session::start(LoaderConfig::from_env()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "cannot seed the catalog");
            std::process::exit(1);
        }
    };

    if let Ok(path) = env::var("METRICA_DEFINITIONS") {
        match session.loader.load_file(&mut session.catalog, &PathBuf::from(&path)) {
            Ok(report) => tracing::info!(path = %path, outcome = ?report.outcome, added = report.added, "startup definitions loaded"),
            Err(e) => tracing::warn!(path = %path, error = %e, "startup definitions rejected"),
        }
    }

    tracing::info!(version = SERVER_VERSION, entries = session.catalog.len(), "metrica ready");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "error reading input");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "processing request");
                session.handle(&request)
            }
            Err(e) => Response {
                id: None,
                result: None,
                error: Some(ErrorBody::new("BAD_REQUEST", format!("Parse error: {}", e))),
            },
        };

        if let Err(e) = write_response(&response) {
            tracing::error!(error = %e, "error writing response");
            break;
        }
    }

    tracing::debug!("input closed, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::start(LoaderConfig::default()).unwrap()
    }

    fn call(session: &mut Session, line: &str) -> Response {
        let request: Request = serde_json::from_str(line).unwrap();
        session.handle(&request)
    }

    #[test]
    fn test_parse_request() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 1, "method": "parse", "params": {"text": "12.5 km", "family": 1}}"#);
        let result = r.result.unwrap();
        assert_eq!(result["value"], json!(12.5));
        assert_eq!(result["name"], json!("Kilometer"));
        assert_eq!(result["kind"], json!("unit"));
        assert_eq!(r.id, Some(json!(1)));
    }

    #[test]
    fn test_parse_failure_lists_allowed() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 2, "method": "parse", "params": {"text": "12 kg", "family": 1}}"#);
        let error = r.error.unwrap();
        assert_eq!(error.code, codes::PARSE_FAILURE);
        assert!(error.message.contains("km"));
    }

    #[test]
    fn test_convert_between_scales() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 3, "method": "convert", "params": {"text": "212 °F", "to": "°C"}}"#);
        let value = r.result.unwrap()["value"].as_f64().unwrap();
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_extend_then_convert() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 4, "method": "extend", "params": {"definitions": "unit NauticalMile \"nmi\" = 1852 * Meter;"}}"#);
        assert_eq!(r.result.unwrap()["outcome"], json!("compiled"));

        let r = call(&mut s, r#"{"id": 5, "method": "convert", "params": {"text": "2 nmi", "to": "km"}}"#);
        let value = r.result.unwrap()["value"].as_f64().unwrap();
        assert!((value - 3.704).abs() < 1e-9);
    }

    #[test]
    fn test_extend_reports_diagnostics() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 6, "method": "extend", "params": {"definitions": "unit Nmi \"nmi\" = 1852 * Metre;"}}"#);
        let error = r.error.unwrap();
        assert_eq!(error.code, codes::UNDEFINED_REF);
        assert_eq!(error.diagnostics.len(), 1);
    }

    #[test]
    fn test_list_family() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 7, "method": "list", "params": {"family": 11}}"#);
        let result = r.result.unwrap();
        assert_eq!(result["count"], json!(4));
        assert_eq!(result["entries"][0]["name"], json!("EUR"));
        assert_eq!(result["entries"][0]["primary"], json!(true));
    }

    #[test]
    fn test_unknown_method() {
        let mut s = session();
        let r = call(&mut s, r#"{"id": 8, "method": "explode"}"#);
        assert_eq!(r.error.unwrap().code, "METHOD_NOT_FOUND");
    }
}
