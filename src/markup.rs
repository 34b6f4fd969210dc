//! Conversion of model output (loose Markdown) into Telegram MarkdownV2.
//!
//! MarkdownV2 rejects a whole message if any reserved character appears
//! unescaped outside an entity, so everything not recognised as formatting
//! is escaped.

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];

/// Make generated text safe to send with `parse_mode = MarkdownV2`.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    let mut in_fence = false;

    for (i, line) in raw.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim_start();

        if let Some(info) = trimmed.strip_prefix("```") {
            match info.find("```") {
                // Fence opened and closed on one line: render as inline code.
                Some(end) if !in_fence => {
                    let code = &info[..end];
                    if !code.is_empty() {
                        out.push('`');
                        out.push_str(&escape_code(code));
                        out.push('`');
                    }
                    out.push_str(&convert_inline(&info[end + 3..]));
                }
                _ => {
                    out.push_str("```");
                    out.push_str(&escape_code(info.trim()));
                    in_fence = !in_fence;
                }
            }
        } else if in_fence {
            out.push_str(&escape_code(line));
        } else {
            out.push_str(&convert_line(line));
        }
    }

    if in_fence {
        out.push_str("\n```");
    }
    out
}

fn convert_line(line: &str) -> String {
    let trimmed = line.trim_start();
    let indent = &line[..line.len() - trimmed.len()];

    if let Some(title) = heading(trimmed) {
        if title.is_empty() {
            return String::new();
        }
        return format!("*{}*", escape_plain(&title.replace("**", "")));
    }

    let bullet = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "));
    if let Some(item) = bullet {
        return format!("{indent}• {}", convert_inline(item));
    }

    if let Some(quote) = trimmed.strip_prefix('>') {
        return format!(">{}", convert_inline(quote.trim_start()));
    }

    format!("{indent}{}", convert_inline(trimmed))
}

fn heading(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) {
        line[hashes..].strip_prefix(' ').map(str::trim)
    } else {
        None
    }
}

fn convert_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let rendered = match c {
            '`' => code_span(&chars, i),
            '*' if chars.get(i + 1) == Some(&'*') => wrapped(&chars, i, &['*', '*'], '*'),
            '~' if chars.get(i + 1) == Some(&'~') => wrapped(&chars, i, &['~', '~'], '~'),
            '*' | '_' => emphasis(&chars, i, c, out.ends_with('_')),
            '[' => link(&chars, i),
            _ => None,
        };

        match rendered {
            Some((entity, next)) => {
                out.push_str(&entity);
                i = next;
            }
            None => {
                push_escaped(&mut out, c, RESERVED);
                i += 1;
            }
        }
    }

    out
}

fn code_span(chars: &[char], i: usize) -> Option<(String, usize)> {
    let end = find(chars, i + 1, &['`'])?;
    let inner: String = chars[i + 1..end].iter().collect();
    Some((format!("`{}`", escape_code(&inner)), end + 1))
}

fn wrapped(chars: &[char], i: usize, marker: &[char], tag: char) -> Option<(String, usize)> {
    let start = i + marker.len();
    let end = find(chars, start, marker)?;
    let inner = &chars[start..end];
    let first = inner.first()?;
    let last = inner.last()?;
    if first.is_whitespace() || last.is_whitespace() {
        return None;
    }
    let inner: String = inner.iter().collect();
    Some((
        format!("{tag}{}{tag}", escape_plain(&inner)),
        end + marker.len(),
    ))
}

/// Single `*` or `_` emphasis; only at word boundaries so `snake_case` stays literal.
///
/// Never emitted directly next to another `_`, since MarkdownV2 reads `__` as underline.
fn emphasis(
    chars: &[char],
    i: usize,
    marker: char,
    after_underscore: bool,
) -> Option<(String, usize)> {
    if after_underscore || (i > 0 && chars[i - 1].is_alphanumeric()) {
        return None;
    }
    let (entity, next) = wrapped(chars, i, &[marker], '_')?;
    if chars
        .get(next)
        .is_some_and(|&c| c == '_' || c.is_alphanumeric())
    {
        return None;
    }
    Some((entity, next))
}

fn link(chars: &[char], i: usize) -> Option<(String, usize)> {
    let close = find(chars, i + 1, &[']'])?;
    if chars.get(close + 1) != Some(&'(') {
        return None;
    }
    let end = find(chars, close + 2, &[')'])?;
    let label: String = chars[i + 1..close].iter().collect();
    let url: String = chars[close + 2..end].iter().collect();
    if label.is_empty() || url.is_empty() {
        return None;
    }
    Some((
        format!("[{}]({})", escape_plain(&label), escape_url(&url)),
        end + 1,
    ))
}

fn find(chars: &[char], from: usize, pattern: &[char]) -> Option<usize> {
    if from > chars.len() {
        return None;
    }
    chars[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|p| p + from)
}

fn escape_plain(text: &str) -> String {
    escape_with(text, RESERVED)
}

fn escape_code(text: &str) -> String {
    escape_with(text, &['`', '\\'])
}

fn escape_url(text: &str) -> String {
    escape_with(text, &[')', '\\'])
}

fn escape_with(text: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        push_escaped(&mut out, c, reserved);
    }
    out
}

fn push_escaped(out: &mut String, c: char, reserved: &[char]) {
    if reserved.contains(&c) {
        out.push('\\');
    }
    out.push(c);
}
