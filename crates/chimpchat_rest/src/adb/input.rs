//! Text input for Android devices

use crate::config::TIMING_CONFIG;
use crate::error::Result;
use base64::{engine::general_purpose, Engine as _};
use tracing::debug;

use super::device::AdbDevice;

/// Characters the device shell would interpret inside `input text`
const SHELL_SPECIAL: &[char] = &[
    '(', ')', '<', '>', '|', ';', '&', '*', '\\', '~', '"', '\'', '`', '$', '!', '?', '[', ']',
    '{', '}', '#',
];

/// Type text into the currently focused input field.
///
/// ASCII goes through `input text`, one call per line with an Enter key
/// event between lines. Anything else needs the ADB Keyboard IME, which
/// receives the text base64-encoded in a broadcast.
pub(crate) async fn type_text(device: &AdbDevice, text: &str) -> Result<()> {
    if text.is_ascii() {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                device
                    .run_checked(
                        device.shell(["input", "keyevent", "KEYCODE_ENTER"]),
                        TIMING_CONFIG.command_timeout(),
                        "press enter",
                    )
                    .await?;
            }
            if line.is_empty() {
                continue;
            }
            let escaped = escape_input_text(line);
            device
                .run_checked(
                    device.shell(["input", "text", escaped.as_str()]),
                    TIMING_CONFIG.command_timeout(),
                    "input text",
                )
                .await?;
        }
        Ok(())
    } else {
        debug!("Typing non-ASCII text through ADB Keyboard");
        let encoded_text = general_purpose::STANDARD.encode(text.as_bytes());
        device
            .run_checked(
                device.shell([
                    "am",
                    "broadcast",
                    "-a",
                    "ADB_INPUT_B64",
                    "--es",
                    "msg",
                    encoded_text.as_str(),
                ]),
                TIMING_CONFIG.command_timeout(),
                "ADB Keyboard broadcast",
            )
            .await?;
        Ok(())
    }
}

/// Escape a single line for `input text`: spaces become `%s` and shell
/// metacharacters are backslash-escaped
fn escape_input_text(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len() * 2);
    for c in line.chars() {
        match c {
            ' ' => escaped.push_str("%s"),
            '\t' => escaped.push_str("%s"),
            '\r' => {}
            c if SHELL_SPECIAL.contains(&c) => {
                escaped.push('\\');
                escaped.push(c);
            }
            c => escaped.push(c),
        }
    }
    escaped
}
