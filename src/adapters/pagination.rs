//! Cursor pagination over an already-built list, using the same cursor
//! format and slicing rules as graphql-relay's `connectionFromArray`.

use crate::domain::connection::{Connection, ConnectionArgs, Edge, PageInfo};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const PREFIX: &str = "arrayconnection:";

pub fn offset_to_cursor(offset: usize) -> String {
    STANDARD.encode(format!("{}{}", PREFIX, offset))
}

/// Decode a cursor. Returns `None` for anything that is not a valid
/// array-connection cursor.
pub fn cursor_to_offset(cursor: &str) -> Option<i64> {
    let decoded = STANDARD.decode(cursor).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    decoded.strip_prefix(PREFIX)?.parse().ok()
}

fn offset_with_default(cursor: Option<&str>, default: i64) -> i64 {
    cursor.and_then(cursor_to_offset).unwrap_or(default)
}

fn to_offset(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Slice `list` into a connection.
///
/// `after`/`before` cursors pointing outside the list (including negative
/// offsets) are ignored, as are unparseable ones.
pub fn connection_from_list<T: Clone>(list: &[T], args: &ConnectionArgs) -> Connection<T> {
    let length = to_offset(list.len());
    let after_offset = offset_with_default(args.after.as_deref(), -1);
    let before_offset = offset_with_default(args.before.as_deref(), length);

    let mut start_offset = 0;
    let mut end_offset = length;
    if (0..length).contains(&after_offset) {
        start_offset = after_offset + 1;
    }
    if (0..length).contains(&before_offset) {
        end_offset = before_offset;
    }
    if let Some(first) = args.first {
        end_offset = end_offset.min(start_offset.saturating_add(to_offset(first)));
    }
    if let Some(last) = args.last {
        start_offset = start_offset.max(end_offset.saturating_sub(to_offset(last)));
    }

    let edges: Vec<Edge<T>> = if start_offset < end_offset {
        (start_offset..end_offset)
            .map(|offset| Edge {
                cursor: offset_to_cursor(offset as usize),
                node: list[offset as usize].clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let lower_bound = if args.after.is_some() {
        after_offset.saturating_add(1)
    } else {
        0
    };
    let upper_bound = if args.before.is_some() {
        before_offset
    } else {
        length
    };

    let page_info = PageInfo {
        start_cursor: edges.first().map(|edge| edge.cursor.clone()),
        end_cursor: edges.last().map(|edge| edge.cursor.clone()),
        has_previous_page: args.last.is_some() && start_offset > lower_bound,
        has_next_page: args.first.is_some() && end_offset < upper_bound,
    };

    Connection { edges, page_info }
}
