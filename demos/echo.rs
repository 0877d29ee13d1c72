//! Echo demo - a regular handler answering with one command batch.
//!
//! This demo demonstrates:
//! - Registering a typed handler with `register`
//! - Feeding request data the way a web framework would
//! - Writing the JSON batch to a transport (stdout here)
//!
//! # Running
//!
//! ```text
//! cargo run --example echo -- '["hello"]'
//! ```

use std::collections::HashMap;

use domwire::control::{PARAM_ARGS, PARAM_REQUEST};
use domwire::{write_output, Dispatcher, Response};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args()
        .nth(1)
        .unwrap_or_else(|| r#"["hello"]"#.to_string());

    let mut dispatcher = Dispatcher::new();
    dispatcher
        .set_request_uri("/ajax")
        .register("echo", |r: &mut Response, text: String| {
            r.set_html("#echo", text.to_uppercase())
                .set_css_property("#echo", "color", "navy");
        })
        .set_request_data(HashMap::from([
            (PARAM_REQUEST.to_string(), "echo".to_string()),
            (PARAM_ARGS.to_string(), args),
        ]));

    // The page would embed this once
    eprintln!("bootstrap: {}", dispatcher.bootstrap_script()?);

    let mut stdout = tokio::io::stdout();
    write_output(dispatcher.dispatch()?, &mut stdout).await?;
    println!();

    Ok(())
}
