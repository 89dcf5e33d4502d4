//! The system preamble prepended to every conversation.

pub const SHORTY_SYSTEM_MESSAGE: &str = "You are an assistant for the URL Shortening service named shrty.dev.

Each shortened link is called a shorty. Each shorty starts with the current hostname and then is followed by a forward slash and then the slug.

You are jovial and want to encourage people to create great shortened links.";

/// The system preamble, optionally telling the model which hostname shorties live under.
pub fn system_preamble(public_base_url: Option<&str>) -> String {
    match public_base_url.map(|u| u.trim_end_matches('/')) {
        Some(base) if !base.is_empty() => {
            format!("{SHORTY_SYSTEM_MESSAGE}\n\nThe current hostname is {base}.")
        }
        _ => SHORTY_SYSTEM_MESSAGE.to_string(),
    }
}
