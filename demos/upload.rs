//! Upload demo - a form submitted through the upload plugin.
//!
//! This demo demonstrates:
//! - Registering an upload handler and emitting its page script
//! - Passing a fixed extra argument ahead of the form values
//! - Reading the submitted form id and resetting the form
//!
//! # Running
//!
//! ```text
//! cargo run --example upload
//! ```

use std::collections::HashMap;

use domwire::control::{PARAM_ARGS, PARAM_REQUEST};
use domwire::handler::HandlerOptions;
use domwire::plugin::upload;
use domwire::response::StreamConfig;
use domwire::{write_output, Dispatcher, Response};
use serde::Deserialize;

/// Fields of the submitted form.
#[derive(Deserialize, Debug)]
struct Profile {
    name: String,
    #[serde(default)]
    bio: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut dispatcher = Dispatcher::new();
    let script = upload::register_upload_callback(
        &mut dispatcher,
        "profile",
        |r: &mut Response, bucket: String, profile: Profile| {
            let form_id = r.form_id().unwrap_or("?").to_string();
            r.alert(format!(
                "{} saved {} ({} bytes of bio) to {bucket}",
                form_id,
                profile.name,
                profile.bio.len()
            ));
            r.reset_form();
        },
        HandlerOptions::new()
            .extra_args(["avatars"])?
            .context(upload::UploadContext::factory(
                StreamConfig::new().padding_len(16),
            )),
    )?;
    eprintln!("page script: {script}");

    dispatcher.set_request_data(HashMap::from([
        (PARAM_REQUEST.to_string(), upload::public_name("profile")),
        (PARAM_ARGS.to_string(), r#"["profile"]"#.to_string()),
        ("name".to_string(), "Ada".to_string()),
        ("bio".to_string(), "Analyst".to_string()),
    ]));

    let mut stdout = tokio::io::stdout();
    write_output(dispatcher.dispatch()?, &mut stdout).await?;
    println!();

    Ok(())
}
