//! Response post-processing.
//!
//! Generated text marks bold spans with `**` and line breaks with a single `*`.
//! [`format_response`] turns that into a small tag vocabulary (`<b>`, `</b>`,
//! `</br>`) which the renderers read back with [`tokenize`].

pub const BOLD_OPEN: &str = "<b>";
pub const BOLD_CLOSE: &str = "</b>";
pub const LINE_BREAK: &str = "</br>";

const BOLD_DELIMITER: &str = "**";

/// A piece of formatted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    BoldOn,
    BoldOff,
    Break,
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub bold: bool,
}

/// Convert raw service text into markup.
///
/// Paired `**` spans become `<b>…</b>`. An unpaired trailing `**` is left
/// alone and, like every other `*`, ends up as `</br>`.
pub fn format_response(raw: &str) -> String {
    let escaped = escape(raw);
    let parts: Vec<&str> = escaped.split(BOLD_DELIMITER).collect();

    // An even number of parts means the last delimiter has no partner.
    let paired = if parts.len() % 2 == 0 {
        parts.len() - 1
    } else {
        parts.len()
    };

    let mut out = String::with_capacity(escaped.len() + parts.len() * 4);
    for (i, part) in parts.iter().enumerate() {
        if i >= paired {
            out.push_str(BOLD_DELIMITER);
            out.push_str(part);
        } else if i % 2 == 1 {
            out.push_str(BOLD_OPEN);
            out.push_str(part);
            out.push_str(BOLD_CLOSE);
        } else {
            out.push_str(part);
        }
    }

    out.replace('*', LINE_BREAK)
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split markup into tokens. Newlines count as breaks, unknown tags are text.
pub fn tokenize(markup: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        let tag = if rest.starts_with(BOLD_OPEN) {
            Some((Token::BoldOn, BOLD_OPEN.len()))
        } else if rest.starts_with(BOLD_CLOSE) {
            Some((Token::BoldOff, BOLD_CLOSE.len()))
        } else if rest.starts_with(LINE_BREAK) {
            Some((Token::Break, LINE_BREAK.len()))
        } else if c == '\n' {
            Some((Token::Break, 1))
        } else {
            None
        };

        match tag {
            Some((token, len)) => {
                if !text.is_empty() {
                    tokens.push(Token::Text(unescape(&text)));
                    text.clear();
                }
                tokens.push(token);
                rest = &rest[len..];
            }
            None => {
                if c != '\r' {
                    text.push(c);
                }
                rest = &rest[c.len_utf8()..];
            }
        }
    }

    if !text.is_empty() {
        tokens.push(Token::Text(unescape(&text)));
    }
    tokens
}

/// Group markup into lines of styled spans. An unclosed `<b>` stays bold
/// until the end, which is what a half-revealed answer looks like.
pub fn lines(markup: &str) -> Vec<Vec<StyledSpan>> {
    let mut lines = vec![Vec::new()];
    let mut bold = false;

    for token in tokenize(markup) {
        match token {
            Token::Text(text) => {
                if let Some(line) = lines.last_mut() {
                    line.push(StyledSpan { text, bold });
                }
            }
            Token::BoldOn => bold = true,
            Token::BoldOff => bold = false,
            Token::Break => lines.push(Vec::new()),
        }
    }

    lines
}
