use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    o: usize,
}

/// Encode an offset into an opaque cursor string. Callers should treat it
/// as a token, not a readable number.
pub fn encode_cursor(offset: usize) -> String {
    let json = serde_json::to_vec(&CursorPayload { o: offset }).expect("cursor payload always serializes");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a cursor back to an offset. Any malformed or tampered-with
/// cursor decodes to 0 rather than erroring — pagination degrades to
/// "start over" instead of failing the request.
pub fn decode_cursor(cursor: &str) -> usize {
    URL_SAFE_NO_PAD
        .decode(cursor)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<CursorPayload>(&bytes).ok())
        .map(|p| p.o)
        .unwrap_or(0)
}

/// A page of results sliced out of a full result set, with a cursor
/// pointing at the next page (`None` once the results are exhausted).
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub total_hits: usize,
    pub page_size: usize,
}

impl<T: Clone> Page<T> {
    pub fn from_results(all_items: &[T], offset: usize, page_size: usize) -> Self {
        let end = (offset + page_size).min(all_items.len());
        let items = if offset >= all_items.len() { Vec::new() } else { all_items[offset..end].to_vec() };
        let has_more = offset + page_size < all_items.len();

        Page {
            items,
            next_cursor: if has_more { Some(encode_cursor(offset + page_size)) } else { None },
            total_hits: all_items.len(),
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips() {
        let cursor = encode_cursor(42);
        assert_eq!(decode_cursor(&cursor), 42);
    }

    #[test]
    fn invalid_cursor_decodes_to_zero() {
        assert_eq!(decode_cursor("garbage"), 0);
        assert_eq!(decode_cursor(""), 0);
    }

    #[test]
    fn first_page_has_cursor_when_more_remain() {
        let items: Vec<i32> = (0..50).collect();
        let page = Page::from_results(&items, 0, 20);
        assert_eq!(page.items.len(), 20);
        assert_eq!(page.total_hits, 50);
        assert!(page.next_cursor.is_some());
    }

    #[test]
    fn last_page_has_no_cursor() {
        let items: Vec<i32> = (0..5).collect();
        let page = Page::from_results(&items, 0, 20);
        assert_eq!(page.items.len(), 5);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn exact_boundary_has_no_cursor() {
        let items: Vec<i32> = (0..20).collect();
        let page = Page::from_results(&items, 0, 20);
        assert!(page.next_cursor.is_none());
        assert_eq!(page.items.len(), 20);
    }

    #[test]
    fn second_page_via_cursor_continues_correctly() {
        let items: Vec<i32> = (0..30).collect();
        let page1 = Page::from_results(&items, 0, 10);
        let offset2 = decode_cursor(page1.next_cursor.as_ref().unwrap());
        let page2 = Page::from_results(&items, offset2, 10);
        assert_eq!(page2.items, (10..20).collect::<Vec<_>>());
        assert!(page2.next_cursor.is_some());
    }
}
