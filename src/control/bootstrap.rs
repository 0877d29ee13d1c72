//! Client-side configuration scripts.

use serde_json::json;

use super::{CLIENT_NAMESPACE, UPLOAD_NAMESPACE};
use crate::error::Result;

/// Build the script that points the client at the dispatch endpoint.
///
/// # Arguments
///
/// * `request_uri` - URI the client posts requests to
/// * `json_uri` - optional URI of a JSON polyfill for old browsers
pub fn build_bootstrap_script(request_uri: &str, json_uri: Option<&str>) -> Result<String> {
    let mut js = format!(
        "{}.setRequestUri({});",
        CLIENT_NAMESPACE,
        serde_json::to_string(request_uri)?
    );
    if let Some(uri) = json_uri {
        js.push_str(&format!(
            "{}.setJsonUri({});",
            CLIENT_NAMESPACE,
            serde_json::to_string(uri)?
        ));
    }
    Ok(js)
}

/// Build the script that turns a form into an upload form once the page is
/// ready.
pub fn build_upload_registration(form_id: &str, public_name: &str) -> Result<String> {
    let params = json!({
        "formId": form_id,
        "callback": public_name,
    });
    Ok(format!(
        "jQuery(function() {{ {}.registerForm({}); }});",
        UPLOAD_NAMESPACE,
        serde_json::to_string(&params)?
    ))
}
