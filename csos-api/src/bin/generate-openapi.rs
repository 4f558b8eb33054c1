//! Prints the CSOS OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p csos-api --bin generate-openapi > openapi.json

use csos_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
