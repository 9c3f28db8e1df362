use serde::{Deserialize, Serialize};

/// A fenced code block found in an assistant reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the fence info string, if any.
    pub language: Option<String>,
    pub code: String,
}

/// Extract fenced code blocks (```` ``` ```` or `~~~`) from markdown text.
///
/// A fence closes only on a line with the same fence character and at least
/// the opening length. An unterminated fence runs to the end of the input.
pub fn extract_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(char, usize, Option<String>, Vec<&str>)> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();
        match open.as_mut() {
            None => {
                if let Some((fence_char, fence_len)) = fence_marker(trimmed) {
                    let info = trimmed[fence_len..].trim();
                    let language = info
                        .split_whitespace()
                        .next()
                        .map(str::to_owned);
                    open = Some((fence_char, fence_len, language, Vec::new()));
                }
            }
            Some((fence_char, fence_len, _, lines)) => {
                if let Some((close_char, close_len)) = fence_marker(trimmed)
                    && close_char == *fence_char
                    && close_len >= *fence_len
                    && trimmed[close_len..].trim().is_empty()
                {
                    if let Some((_, _, language, lines)) = open.take() {
                        blocks.push(CodeBlock {
                            language,
                            code: lines.join("\n"),
                        });
                    }
                } else {
                    lines.push(line);
                }
            }
        }
    }

    if let Some((_, _, language, lines)) = open {
        blocks.push(CodeBlock {
            language,
            code: lines.join("\n"),
        });
    }

    blocks
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let first = line.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let len = line.chars().take_while(|c| *c == first).count();
    (len >= 3).then_some((first, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_blocks_with_language() {
        let reply = "Here:\n```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nand\n~~~\nplain\n~~~\n";
        let blocks = extract_code_blocks(reply);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("rust"));
        assert_eq!(blocks[0].code, "fn main() {\n    println!(\"hi\");\n}");
        assert_eq!(blocks[1].language, None);
        assert_eq!(blocks[1].code, "plain");
    }

    #[test]
    fn other_fence_char_does_not_close_block() {
        let blocks = extract_code_blocks("```\n~~~\nstill code\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "~~~\nstill code");
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let blocks = extract_code_blocks("text\n```python\nprint(1)\nprint(2)");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "print(1)\nprint(2)");
    }

    #[test]
    fn plain_text_has_no_blocks() {
        assert!(extract_code_blocks("just `inline` code").is_empty());
    }
}
