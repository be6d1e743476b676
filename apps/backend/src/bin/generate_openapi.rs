use std::fs;
use utoipa::OpenApi;

use scoreboard::api::rest::ApiDoc;

fn main() {
    println!("Generating OpenAPI specification...");

    let openapi_spec = ApiDoc::openapi();
    let openapi_json =
        serde_json::to_string_pretty(&openapi_spec).expect("Failed to serialize OpenAPI spec");

    // Defaults to the crate directory; pass a path to write elsewhere
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    if let Err(e) = fs::write(&output_path, &openapi_json) {
        eprintln!("Error: Could not write {}: {}", output_path, e);
        std::process::exit(1);
    }

    println!("✅ Generated {}", output_path);
    println!("📄 {} bytes written", openapi_json.len());
}
