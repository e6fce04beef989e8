//! Prints a Dia file (Axon or Bion, compressed or not) as pretty Axon.

use std::fs;

use dia::codec::{AxonOptions, bion, deserialize, serialize};
use dia::limits::MAGIC_UNCOMPRESSED;
use dia::{Document, validate_document};

fn main() {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: inspect_file <file.axon|file.bion>");
        std::process::exit(2);
    };

    println!("Reading: {}", path);
    let data = fs::read(&path).expect("Failed to read file");
    println!("File size: {} bytes", data.len());

    let doc: Document = if data.starts_with(MAGIC_UNCOMPRESSED) {
        bion::decode(&data).expect("Failed to decode Bion")
    } else {
        let text = String::from_utf8(data).expect("Axon input must be UTF-8");
        deserialize(&text).expect("Failed to parse Axon")
    };

    let reachable = validate_document(&doc).expect("Invalid document");
    println!("Composites: {} ({} reachable)", doc.graph.len(), reachable);
    println!();
    println!(
        "{}",
        serialize(&doc, &AxonOptions::pretty()).expect("Failed to serialize")
    );
}
