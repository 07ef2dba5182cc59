// ── CLI prompt handling ──
//
// Pure text helpers for an interactive IOS-style shell: detecting the
// trailing prompt in a read buffer, and turning the raw terminal stream
// into clean command output.

/// Characters that terminate an exec (`>`) or privileged (`#`) prompt.
pub const PROMPT_TERMINATORS: &[char] = &['#', '>'];

/// Remove ANSI escape sequences, backspaces, and carriage returns, and
/// normalise line endings to `\n`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{1b}' => {
                // CSI: ESC [ params final-byte
                if chars.peek() == Some(&'[') {
                    chars.next();
                    for next in chars.by_ref() {
                        if next.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
            '\u{8}' => {
                out.pop();
            }
            '\r' => {}
            other => out.push(other),
        }
    }

    out
}

/// Whether `line` looks like a device prompt.
///
/// With a known `base` (the hostname), the prompt must start with it, which
/// also matches config-mode prompts such as `core-sw01(config-if)#`.
pub fn is_prompt_line(line: &str, base: Option<&str>) -> bool {
    let line = line.trim();
    let Some(body) = line.strip_suffix(PROMPT_TERMINATORS) else {
        return false;
    };
    if body.is_empty() || body.chars().any(char::is_whitespace) {
        return false;
    }
    base.is_none_or(|b| body.starts_with(b))
}

/// If the buffer currently ends in a prompt, return that prompt line.
pub fn trailing_prompt<'a>(buffer: &'a str, base: Option<&str>) -> Option<&'a str> {
    let last = buffer.rsplit('\n').next()?;
    is_prompt_line(last, base).then(|| last.trim())
}

/// Strip exactly one trailing prompt terminator, leaving the hostname.
pub fn hostname_from_prompt(prompt: &str) -> &str {
    let prompt = prompt.trim();
    prompt.strip_suffix(PROMPT_TERMINATORS).unwrap_or(prompt)
}

/// Turn a raw command transcript into its output: drop the echoed command
/// line and the trailing prompt.
pub fn command_output(transcript: &str, command: &str, base: Option<&str>) -> String {
    let text = normalize(transcript);
    let mut lines: Vec<&str> = text.split('\n').collect();

    if lines
        .first()
        .is_some_and(|first| first.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }
    if lines
        .last()
        .is_some_and(|last| is_prompt_line(last, base))
    {
        lines.pop();
    }

    lines.join("\n").trim_end().to_owned()
}

/// Raw shell output accumulated between prompts.
///
/// Bytes are kept undecoded so a multi-byte character split across two
/// packets survives; text is decoded once, when the buffer is taken.
#[derive(Debug, Default)]
pub struct ReadBuffer {
    bytes: Vec<u8>,
}

impl ReadBuffer {
    pub fn push(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the output so far ends in a prompt. Only the last line is
    /// decoded, so each check costs the length of that line.
    pub fn ends_with_prompt(&self, base: Option<&str>) -> bool {
        let start = self
            .bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |idx| idx + 1);
        let last = normalize(&String::from_utf8_lossy(&self.bytes[start..]));
        trailing_prompt(&last, base).is_some()
    }

    /// Everything read so far, decoded and normalised, without consuming it.
    pub fn text(&self) -> String {
        normalize(&String::from_utf8_lossy(&self.bytes))
    }

    /// Hand back everything read so far as text and start over.
    pub fn take(&mut self) -> String {
        let bytes = std::mem::take(&mut self.bytes);
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}
