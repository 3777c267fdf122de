//! Debug script to see what the Go frontend produces for a model directory.

use std::path::PathBuf;

use soliton_compiler::frontend::create_frontend;

fn main() {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("domain/model"));

    let result = create_frontend("go").and_then(|mut frontend| frontend.parse_directory(&dir));

    match result {
        Ok(aggregates) => {
            println!("Parsed {} aggregate(s) from {}", aggregates.len(), dir.display());
            match serde_json::to_string_pretty(&aggregates) {
                Ok(json) => println!("{}", json),
                Err(e) => println!("Error: {:?}", e),
            }
        }
        Err(e) => {
            println!("Error: {:?}", e);
        }
    }
}
