//! Transport-safe splitting of long HTML-formatted messages.
//!
//! Given one formatted string of unbounded length and the transport's
//! maximum message length, produce an ordered sequence of chunks, each of
//! which independently satisfies the length limit and has balanced markup.
//!
//! Cut-point selection works backward from the limit, preferring a
//! paragraph break, then a line break, a sentence end, a comma, and
//! finally a space — never landing inside a tag. If no balanced cut is
//! found down to 70% of the limit, the chunk is repaired instead: tags
//! still open at the cut are closed at the end of the chunk and reopened
//! at the start of the next one, with the cut pulled back far enough that
//! the repaired chunk still fits. Content that cannot fit even after
//! repair is truncated at the hard limit rather than emitted oversized.

/// One markup tag occurrence in the scanned text.
#[derive(Debug, Clone)]
struct TagToken {
    /// Byte offset of `<`.
    start: usize,
    /// Byte offset one past `>`.
    end: usize,
    /// Lower-cased tag name, without attributes.
    name: String,
    /// Whether this is a closing tag (`</…>`).
    closing: bool,
}

impl TagToken {
    /// The raw tag text, attributes included (used to reopen tags).
    fn raw<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start..self.end]
    }
}

/// Where and how to cut the current chunk.
enum CutPlan {
    /// The prefix up to this index is tag-balanced; cut cleanly.
    Clean(usize),
    /// Cut here and repair: append `close` to this chunk, prepend
    /// `reopen` to the remainder.
    Repair {
        idx: usize,
        close: String,
        reopen: String,
    },
}

/// Split `text` into chunks of at most `max_len` bytes, each with
/// balanced markup.
///
/// Concatenating the chunks' text content (ignoring repair tags)
/// reconstructs the original, except when a single unit exceeds the hard
/// limit even after repair and must be truncated.
#[must_use]
pub fn split_chunks(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut remaining = text.to_owned();

    loop {
        if remaining.len() <= max_len {
            chunks.push(remaining);
            break;
        }

        match find_cut(&remaining, max_len) {
            CutPlan::Clean(idx) => {
                let tail = remaining.split_off(idx);
                chunks.push(remaining);
                remaining = tail;
            }
            CutPlan::Repair { idx, close, reopen } => {
                let tail = remaining.split_off(idx);
                let mut chunk = remaining;
                chunk.push_str(&close);
                chunks.push(chunk);
                remaining = reopen + &tail;
            }
        }
    }

    chunks
}

/// Choose the cut point for the oversized head of `s`.
fn find_cut(s: &str, max_len: usize) -> CutPlan {
    let tokens = scan_tags(s);

    // Try the preferred separators at progressively smaller targets.
    for percent in [100_usize, 90, 80, 70] {
        let target = max_len * percent / 100;
        let limit = floor_boundary(s, target.min(s.len()));
        for idx in candidate_cuts(s, limit) {
            let idx = shift_out_of_tag(&tokens, idx);
            if idx == 0 || idx > limit {
                continue;
            }
            if open_tags_at(&tokens, idx).is_empty() {
                return CutPlan::Clean(idx);
            }
        }
    }

    // No balanced cut above 70% — repair at the best cut that still fits
    // once the closing tags are appended.
    let mut idx = best_cut_at_most(s, &tokens, max_len);
    loop {
        let open = open_tags_at(&tokens, idx);
        let close = closers(&open);
        let reopen = reopeners(&open, s);
        if idx <= reopen.len() {
            // The chunk would hold nothing but tags that get reopened
            // verbatim in the remainder, so the split makes no progress.
            // Happens when every separator sits inside a tag, e.g.
            // spaces in an attribute value.
            return forced_cut(s, &tokens, max_len, idx);
        }
        if idx + close.len() <= max_len || idx <= 1 {
            // idx <= 1 is the truncation floor: emit what fits, hard cut.
            let idx = if idx + close.len() > max_len {
                floor_boundary(s, max_len.saturating_sub(close.len()).max(1))
            } else {
                idx
            };
            return CutPlan::Repair { idx, close, reopen };
        }
        // Pull the cut back and re-evaluate which tags are open there.
        idx = best_cut_at_most(s, &tokens, idx.saturating_sub(close.len()));
    }
}

/// Repair cut that ignores separator preferences, used when every
/// separator cut lands at or before the end of the open-tag prefix.
/// Walks back from the hard limit until the closing tags fit, and never
/// retreats to `floor` — the resulting chunk always carries at least one
/// byte that is not reopened in the remainder, so splitting terminates.
fn forced_cut(s: &str, tokens: &[TagToken], max_len: usize, floor: usize) -> CutPlan {
    let mut limit = max_len;
    loop {
        let idx = shift_out_of_tag(tokens, floor_boundary(s, limit.min(s.len())));
        let open = open_tags_at(tokens, idx);
        let close = closers(&open);
        let reopen = reopeners(&open, s);
        if idx <= floor.max(reopen.len()) {
            // The closers leave no room for any content; cut one byte
            // past the prefix and let the scanner treat the severed tag
            // as literal text rather than loop.
            let idx = floor_boundary(s, (floor + 1).min(s.len()));
            let open = open_tags_at(tokens, idx);
            let close = closers(&open);
            let reopen = reopeners(&open, s);
            return CutPlan::Repair { idx, close, reopen };
        }
        if idx + close.len() <= max_len {
            return CutPlan::Repair { idx, close, reopen };
        }
        limit = idx.saturating_sub(close.len());
    }
}

/// Closing tags for `open`, innermost first.
fn closers(open: &[&TagToken]) -> String {
    open.iter()
        .rev()
        .map(|t| format!("</{}>", t.name))
        .collect()
}

/// Raw reopening text for `open`, outermost first.
fn reopeners(open: &[&TagToken], s: &str) -> String {
    open.iter().map(|t| t.raw(s).to_owned()).collect()
}

/// Candidate cut indices within `s[..limit]`, best first.
fn candidate_cuts(s: &str, limit: usize) -> Vec<usize> {
    let head = &s[..limit];
    let mut cuts = Vec::new();

    if let Some(i) = head.rfind("\n\n") {
        cuts.push(i + 2);
    }
    if let Some(i) = head.rfind('\n') {
        cuts.push(i + 1);
    }
    let sentence = [". ", "! ", "? "]
        .iter()
        .filter_map(|p| head.rfind(p).map(|i| i + 2))
        .max();
    if let Some(i) = sentence {
        cuts.push(i);
    }
    if let Some(i) = head.rfind(", ") {
        cuts.push(i + 2);
    }
    if let Some(i) = head.rfind(' ') {
        cuts.push(i + 1);
    }

    cuts
}

/// The best available cut at or below `limit`, falling back to a hard
/// character boundary when no separator exists.
fn best_cut_at_most(s: &str, tokens: &[TagToken], limit: usize) -> usize {
    let limit = floor_boundary(s, limit.min(s.len()));
    for idx in candidate_cuts(s, limit) {
        let idx = shift_out_of_tag(tokens, idx);
        if idx > 0 && idx <= limit {
            return idx;
        }
    }
    let hard = shift_out_of_tag(tokens, limit);
    hard.max(1)
}

/// Move a cut that lands inside a tag to just before that tag.
fn shift_out_of_tag(tokens: &[TagToken], idx: usize) -> usize {
    for token in tokens {
        if idx > token.start && idx < token.end {
            return token.start;
        }
    }
    idx
}

/// Tags still open at byte offset `idx`, outermost first.
fn open_tags_at<'a>(tokens: &'a [TagToken], idx: usize) -> Vec<&'a TagToken> {
    let mut stack: Vec<&TagToken> = Vec::new();
    for token in tokens {
        if token.end > idx {
            break;
        }
        if token.closing {
            if let Some(pos) = stack.iter().rposition(|t| t.name == token.name) {
                stack.remove(pos);
            }
        } else {
            stack.push(token);
        }
    }
    stack
}

/// Scan all well-formed tags in `s`. A `<` without a matching `>` is
/// treated as literal text.
fn scan_tags(s: &str) -> Vec<TagToken> {
    let mut tokens = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let Some(rel_end) = s[i..].find('>') else {
            break;
        };
        let end = i + rel_end + 1;
        let inner = &s[i + 1..end - 1];
        let (closing, name_part) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };
        let name: String = name_part
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if !name.is_empty() {
            tokens.push(TagToken {
                start: i,
                end,
                name,
                closing,
            });
        }
        i = end;
    }

    tokens
}

/// Largest char boundary at or below `idx`.
fn floor_boundary(s: &str, mut idx: usize) -> usize {
    idx = idx.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
