//! Comet demo - a handler streaming progress while it works.
//!
//! This demo demonstrates:
//! - Registering a streaming handler with `comet::register_comet_callback`
//! - Returning a suspending `Outcome` that flushes after every step
//! - Pumping the chunks to a transport as they are produced
//!
//! # Running
//!
//! ```text
//! cargo run --example comet -- 5
//! ```

use std::collections::HashMap;
use std::time::Duration;

use domwire::control::{PARAM_ARGS, PARAM_REQUEST};
use domwire::handler::{HandlerOptions, Step};
use domwire::plugin::comet;
use domwire::{write_output, Dispatcher, Outcome, Response};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let total = std::env::args().nth(1).unwrap_or_else(|| "5".to_string());

    let mut dispatcher = Dispatcher::new();
    comet::register_comet_callback(
        &mut dispatcher,
        "count",
        |_: &mut Response, total: u32| {
            let mut done = 0;
            Outcome::stream(move |r: &mut Response| {
                if done == total {
                    r.set_html("#status", "finished");
                    return Ok(Step::Complete);
                }
                // Simulate some work
                std::thread::sleep(Duration::from_millis(200));
                done += 1;
                r.set_html("#status", format!("{done}/{total}"));
                Ok(Step::Yield)
            })
        },
        HandlerOptions::new(),
    );
    dispatcher.set_request_data(HashMap::from([
        (PARAM_REQUEST.to_string(), "count".to_string()),
        (PARAM_ARGS.to_string(), format!("[{total}]")),
    ]));

    let mut stdout = tokio::io::stdout();
    let written = write_output(dispatcher.dispatch()?, &mut stdout).await?;
    eprintln!("\n{written} bytes streamed");

    Ok(())
}
