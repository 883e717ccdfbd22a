//! Offset/limit pagination over Soroban vectors.

use soroban_sdk::{Env, IntoVal, TryFromVal, Val, Vec};

pub struct Pagination;

impl Pagination {
    /// Returns `source[offset..min(offset + limit, len)]`.
    ///
    /// An offset at or past the end yields an empty vector rather than an
    /// error, so callers can walk a growing list without racing its length.
    pub fn slice<T>(e: &Env, source: &Vec<T>, offset: u32, limit: u32) -> Vec<T>
    where
        T: IntoVal<Env, Val> + TryFromVal<Env, Val>,
    {
        let len = source.len();
        let mut page = Vec::new(e);
        if offset >= len || limit == 0 {
            return page;
        }
        let end = core::cmp::min(offset.saturating_add(limit), len);
        for i in offset..end {
            page.push_back(source.get_unchecked(i));
        }
        page
    }
}
