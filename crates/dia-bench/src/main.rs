//! Benchmark for Dia serialization using JSON input.
//!
//! Converts a JSON file into a Dia graph, sharing structurally identical
//! objects, then times every encoding in both directions.

use std::collections::HashMap;
use std::fs;
use std::time::{Duration, Instant};

use dia::codec::{AxonOptions, axon, bion};
use dia::{Decimal, Document, Graph, Kind, NodeId, Value, validate_document};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ITERS: u32 = 10;
const ZSTD_LEVEL: i32 = 3;

// =============================================================================
// JSON CONVERSION
// =============================================================================

/// Converts JSON values into graph values, reusing the node of any object
/// already seen with the same content.
struct Converter {
    graph: Graph,
    objects: HashMap<String, NodeId>,
    shared_hits: usize,
}

impl Converter {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            objects: HashMap::new(),
            shared_hits: 0,
        }
    }

    fn convert(&mut self, value: &serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::null(Kind::Record),
            serde_json::Value::Bool(b) => Value::from(*b),
            serde_json::Value::Number(n) => number(n),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                let seq = self.graph.sequence();
                for item in items {
                    let child = self.convert(item);
                    self.graph.push(seq, child).expect("sequence node exists");
                }
                Value::Composite(seq)
            }
            serde_json::Value::Object(fields) => {
                // serde_json keeps object keys sorted, so equal objects
                // print identically.
                let key = value.to_string();
                if let Some(&id) = self.objects.get(&key) {
                    self.shared_hits += 1;
                    return Value::Composite(id);
                }
                let record = self.graph.record();
                for (name, field) in fields {
                    let child = self.convert(field);
                    self.graph
                        .insert(record, name.as_str(), child)
                        .expect("record node exists");
                }
                self.objects.insert(key, record);
                Value::Composite(record)
            }
        }
    }
}

fn number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::from(i);
    }
    if let Some(u) = n.as_u64() {
        return Value::from(u);
    }
    // Shortest float form, e.g. "1.5" or "1e-7", read as mantissa/exponent.
    let text = n.to_string();
    let (digits, exp) = match text.split_once(['e', 'E']) {
        Some((digits, exp)) => (digits, exp.trim_start_matches('+').parse::<i32>().unwrap_or(0)),
        None => (text.as_str(), 0),
    };
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    match format!("{int}{frac}").parse::<i64>() {
        Ok(mantissa) => Value::from(Decimal::new(mantissa, exp - frac.len() as i32)),
        Err(_) => {
            warn!(number = %text, "float mantissa out of range, storing as string");
            Value::string(text)
        }
    }
}

/// A city list where every city points at one of a few shared countries.
fn synthetic_input() -> serde_json::Value {
    let countries: Vec<serde_json::Value> = ["Andorra", "Belize", "Chile", "Denmark", "Estonia"]
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "name": name, "code": i, "currency": { "code": "EUR", "minor_units": 2 } }))
        .collect();

    let cities: Vec<serde_json::Value> = (0..20_000)
        .map(|i| {
            let parity = if i % 2 == 0 { "even" } else { "odd" };
            json!({
                "id": i,
                "name": format!("City {i}"),
                "population": (i * 7919) % 1_000_000,
                "latitude": (i as f64) * 0.001 - 45.5,
                "capital": i % 97 == 0,
                "country": countries[i % countries.len()],
                "tags": ["synthetic", parity],
            })
        })
        .collect();

    json!({ "source": "synthetic", "cities": cities })
}

// =============================================================================
// MEASUREMENT
// =============================================================================

#[derive(Debug, Serialize)]
struct FormatResult {
    format: &'static str,
    bytes: usize,
    encode_us: u128,
    decode_us: u128,
    vs_json_percent: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    input: String,
    json_bytes: usize,
    composites: usize,
    shared_objects: usize,
    iterations: u32,
    formats: Vec<FormatResult>,
}

/// Average wall time of `iters` runs after a short warmup.
fn time<T>(iters: u32, mut f: impl FnMut() -> T) -> (T, Duration) {
    for _ in 0..2 {
        let _ = f();
    }
    let start = Instant::now();
    let mut out = f();
    for _ in 1..iters {
        out = f();
    }
    (out, start.elapsed() / iters)
}

fn measure<E>(
    format: &'static str,
    json_bytes: usize,
    encode: impl FnMut() -> E,
    mut decode: impl FnMut(&E) -> Document,
    len: impl Fn(&E) -> usize,
    original: &Document,
) -> FormatResult {
    let (encoded, encode_time) = time(ITERS, encode);
    let (decoded, decode_time) = time(ITERS, || decode(&encoded));
    assert!(decoded == *original, "{format} round trip changed the document");

    let bytes = len(&encoded);
    info!(
        format,
        bytes,
        encode = ?encode_time,
        decode = ?decode_time,
        "measured"
    );
    FormatResult {
        format,
        bytes,
        encode_us: encode_time.as_micros(),
        decode_us: decode_time.as_micros(),
        vs_json_percent: 100.0 * bytes as f64 / json_bytes as f64,
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (input, json) = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading JSON");
            let text = fs::read_to_string(&path).expect("Failed to read input file");
            let json: serde_json::Value = serde_json::from_str(&text).expect("Failed to parse JSON");
            (path, json)
        }
        None => {
            info!("no input file given, generating a synthetic document");
            ("synthetic".to_string(), synthetic_input())
        }
    };
    let json_bytes = json.to_string().len();

    let convert_start = Instant::now();
    let mut converter = Converter::new();
    let root = converter.convert(&json);
    let shared_objects = converter.shared_hits;
    let doc = Document::new(converter.graph, root);
    let composites = validate_document(&doc).expect("converted document is valid");
    info!(
        composites,
        shared_objects,
        elapsed = ?convert_start.elapsed(),
        "converted JSON"
    );

    let pretty = AxonOptions::pretty();
    let formats = vec![
        measure(
            "axon-compact",
            json_bytes,
            || axon::serialize(&doc, &AxonOptions::compact()).expect("Failed to serialize"),
            |text: &String| axon::deserialize(text).expect("Failed to deserialize"),
            String::len,
            &doc,
        ),
        measure(
            "axon-pretty",
            json_bytes,
            || axon::serialize(&doc, &pretty).expect("Failed to serialize"),
            |text: &String| axon::deserialize(text).expect("Failed to deserialize"),
            String::len,
            &doc,
        ),
        measure(
            "bion",
            json_bytes,
            || bion::encode(&doc).expect("Failed to encode"),
            |bytes: &Vec<u8>| bion::decode(bytes).expect("Failed to decode"),
            Vec::len,
            &doc,
        ),
        measure(
            "bion-zstd",
            json_bytes,
            || bion::encode_compressed(&doc, ZSTD_LEVEL).expect("Failed to compress"),
            |bytes: &Vec<u8>| bion::decode(bytes).expect("Failed to decode compressed"),
            Vec::len,
            &doc,
        ),
    ];

    let report = Report {
        input,
        json_bytes,
        composites,
        shared_objects,
        iterations: ITERS,
        formats,
    };

    println!("\n=== Summary ===");
    for f in &report.formats {
        println!(
            "{:<14} {:>12} bytes ({:>5.1}% of JSON)  encode {:>8}us  decode {:>8}us",
            f.format, f.bytes, f.vs_json_percent, f.encode_us, f.decode_us
        );
    }
    println!(
        "\n{}",
        serde_json::to_string_pretty(&report).expect("report serializes")
    );
}
