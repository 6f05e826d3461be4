//! Tells the user that the graphics context could not be used.
//!
//! On the web the page body is replaced with a link to a WebGL help page; on
//! native targets the same message goes to the log.

use std::fmt::Display;

use log::error;

/// Where the user can read about enabling WebGL.
pub const HELP_URL: &str = "https://get.webgl.org/";

/// The text shown for a context failure.
pub fn message(error: &dyn Display) -> String {
    format!(
        "You need a modern WebGL browser (Chrome/Firefox) to use this viewer. \
         Click here for more information. (WebGL error: {error})"
    )
}

#[cfg(target_family = "wasm")]
pub fn show_context_error(error: &dyn Display) {
    let text = message(error);
    error!("{text}");

    let Some(document) = web_sys::window().and_then(|window| window.document()) else {
        return;
    };
    let Some(body) = document.body() else {
        return;
    };
    let anchor = match document.create_element("a") {
        Ok(anchor) => anchor,
        Err(err) => {
            error!("Could not create diagnostic link: {err:?}");
            return;
        }
    };
    if let Err(err) = anchor.set_attribute("href", HELP_URL) {
        error!("Could not set diagnostic link target: {err:?}");
    }
    anchor.set_text_content(Some(&text));

    body.set_inner_html("");
    if let Err(err) = body.append_child(&anchor) {
        error!("Could not show diagnostic link: {err:?}");
    }
}

#[cfg(not(target_family = "wasm"))]
pub fn show_context_error(error: &dyn Display) {
    error!("{} ({HELP_URL})", message(error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::error::ContextError;

    #[test]
    fn test_message_names_the_failure() {
        let text = message(&ContextError::Adapter("none found".to_string()));
        assert!(text.starts_with("You need a modern WebGL browser"));
        assert!(text.ends_with("(WebGL error: no compatible graphics adapter found: none found)"));
    }
}
