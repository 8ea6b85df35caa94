/// Split knowledge base text into atomic units.
///
/// Each non-empty bullet line is one unit. Plain prose lines are further split on sentence
/// boundaries so that a paragraph never becomes a single multi-fact unit. Markdown headings
/// are dropped.
pub fn split_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match strip_bullet(line) {
            Some(item) => {
                if !item.is_empty() {
                    units.push(item.to_string());
                }
            }
            None => units.extend(split_sentences(line)),
        }
    }

    units
}

fn strip_bullet(line: &str) -> Option<&str> {
    if matches!(line, "-" | "*" | "•") {
        return Some("");
    }
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }

    // Numbered items: "1. ", "12) "
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(item) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(item.trim());
        }
    }

    None
}

fn split_sentences(line: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let chars: Vec<(usize, char)> = line.char_indices().collect();

    for i in 0..chars.len() {
        let (pos, c) = chars[i];
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        // Boundary: terminator, whitespace, then an uppercase letter or digit.
        let next_ws = chars.get(i + 1).map(|(_, n)| n.is_whitespace()).unwrap_or(false);
        let next_start = chars
            .iter()
            .skip(i + 1)
            .find(|(_, n)| !n.is_whitespace())
            .map(|(_, n)| n.is_uppercase() || n.is_ascii_digit())
            .unwrap_or(false);

        if next_ws && next_start {
            let end = pos + c.len_utf8();
            let sentence = line[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }
    }

    let rest = line[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}
