//! Message chunking: length limits, markup balance, content preservation.

use agent_courier::render::chunker::split_chunks;

/// Strip every `<…>` tag, leaving text content only.
fn strip_tags(s: &str) -> String {
    let mut out = String::new();
    let mut rest = s;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(rel) => rest = &rest[start + rel + 1..],
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Whether every opening tag in `s` is closed, in nesting order.
fn is_balanced(s: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find('<') {
        let Some(rel) = rest[start..].find('>') else {
            break;
        };
        let inner = &rest[start + 1..start + rel];
        let (closing, name_part) = match inner.strip_prefix('/') {
            Some(tail) => (true, tail),
            None => (false, inner),
        };
        let name: String = name_part
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect();
        if !name.is_empty() {
            if closing {
                if stack.pop().as_deref() != Some(name.as_str()) {
                    return false;
                }
            } else {
                stack.push(name);
            }
        }
        rest = &rest[start + rel + 1..];
    }
    stack.is_empty()
}

#[test]
fn empty_input_produces_no_chunks() {
    assert!(split_chunks("", 4096).is_empty());
}

#[test]
fn short_input_is_a_single_identical_chunk() {
    let chunks = split_chunks("hello <b>world</b>", 4096);
    assert_eq!(chunks, vec!["hello <b>world</b>".to_owned()]);
}

#[test]
fn plain_text_splits_on_word_boundaries_and_reassembles() {
    let text = "lorem ipsum dolor sit amet ".repeat(400); // ~10.8 KiB
    let chunks = split_chunks(&text, 4096);

    assert!(chunks.len() >= 3);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096, "chunk of {} bytes", chunk.len());
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn paragraph_breaks_are_preferred_cut_points() {
    let paragraph = "x".repeat(3000);
    let text = format!("{paragraph}\n\n{paragraph}\n\n{paragraph}");
    let chunks = split_chunks(&text, 4096);

    // Each paragraph is far below the limit, so every cut lands on the
    // blank line between paragraphs.
    assert_eq!(chunks.len(), 3);
    assert!(chunks[0].starts_with('x'));
    assert!(chunks[0].ends_with("\n\n"));
    assert_eq!(chunks.concat(), text);
}

#[test]
fn nested_markup_chunks_stay_balanced() {
    let unit = "<b>alpha beta</b> gamma <i>delta <code>epsilon()</code> zeta</i> eta. ";
    let text = unit.repeat(130); // ~9.1 KiB
    let chunks = split_chunks(&text, 4000);

    assert!(chunks.len() >= 3);
    for chunk in &chunks {
        assert!(chunk.len() <= 4000, "chunk of {} bytes", chunk.len());
        assert!(is_balanced(chunk), "unbalanced chunk: {chunk:?}");
    }
    assert_eq!(strip_tags(&chunks.concat()), strip_tags(&text));
}

#[test]
fn oversized_preformatted_block_is_repaired_across_chunks() {
    let body = "fn main() { run(); } ".repeat(300); // ~6.3 KiB inside one tag
    let text = format!("<pre>{body}</pre>");
    let chunks = split_chunks(&text, 4000);

    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4000, "chunk of {} bytes", chunk.len());
        assert!(is_balanced(chunk), "unbalanced chunk: {chunk:?}");
    }
    // Continuation chunks reopen the split tag.
    assert!(chunks[0].ends_with("</pre>"));
    assert!(chunks[1].starts_with("<pre>"));
    assert_eq!(strip_tags(&chunks.concat()), strip_tags(&text));
}

#[test]
fn cuts_never_land_inside_a_tag() {
    // Force the limit to fall in the middle of a long attribute-free tag
    // run by removing every other separator.
    let text = "word ".repeat(20) + &"<code>abcdefghij</code>".repeat(40);
    let limit = 110;
    let chunks = split_chunks(&text, limit);

    for chunk in &chunks {
        assert!(chunk.len() <= limit);
        assert!(is_balanced(chunk), "unbalanced chunk: {chunk:?}");
        // A chunk ending mid-tag would leave an unmatched '<'.
        let opens = chunk.matches('<').count();
        let closes = chunk.matches('>').count();
        assert_eq!(opens, closes, "dangling tag bracket in {chunk:?}");
    }
    assert_eq!(strip_tags(&chunks.concat()), strip_tags(&text));
}

#[test]
fn attribute_spaces_do_not_stall_splitting() {
    // Every separator in the head sits inside the href value, so naive
    // cut selection keeps landing on the tag boundary with zero content
    // consumed. Splitting must still advance and terminate.
    let text = format!("<b><a href=\"x y z\">{}</a></b>", "X".repeat(300));
    let chunks = split_chunks(&text, 100);

    assert!(chunks.len() >= 3);
    for chunk in &chunks {
        assert!(chunk.len() <= 100, "chunk of {} bytes", chunk.len());
        assert!(is_balanced(chunk), "unbalanced chunk: {chunk:?}");
        assert!(
            !strip_tags(chunk).is_empty(),
            "chunk without content: {chunk:?}"
        );
    }
    assert_eq!(strip_tags(&chunks.concat()), strip_tags(&text));
}

#[test]
fn unterminated_angle_bracket_is_treated_as_text() {
    let text = format!("a {} b", "x".repeat(50));
    let weird = format!("3 < 5 and {text}");
    let chunks = split_chunks(&weird, 32);

    assert!(!chunks.is_empty());
    for chunk in &chunks {
        assert!(chunk.len() <= 32);
    }
    assert_eq!(chunks.concat(), weird);
}
