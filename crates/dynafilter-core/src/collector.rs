//! Pagination collector.

use dynafilter_model::{BackendError, Item};
use tracing::debug;

use crate::backend::{Backend, BackendRequest};

/// Drive `request` until the backend stops returning a cursor.
///
/// Items are accumulated in arrival order; a page without an items field is
/// an empty batch. A failure on any page discards everything collected so far.
///
/// # Errors
///
/// The first [`BackendError`] returned by the backend.
pub fn collect<B: Backend + ?Sized>(
    backend: &B,
    request: &BackendRequest,
) -> Result<Vec<Item>, BackendError> {
    let mut items = Vec::new();
    let mut cursor = None;
    let mut page = 0_usize;

    loop {
        let (batch, next) = request.send(backend, cursor)?.into_parts();
        page += 1;
        debug!(
            table = request.table_name(),
            operation = %request.operation(),
            page,
            batch = batch.len(),
            has_cursor = next.is_some(),
            "received page"
        );
        items.extend(batch);

        match next {
            Some(key) => cursor = Some(key),
            None => break,
        }
    }

    Ok(items)
}

/// Issue `request` once and return the first page's items, ignoring any
/// cursor.
///
/// # Errors
///
/// The [`BackendError`] returned by the backend.
pub fn first_page<B: Backend + ?Sized>(
    backend: &B,
    request: &BackendRequest,
) -> Result<Vec<Item>, BackendError> {
    let (items, next) = request.send(backend, None)?.into_parts();
    debug!(
        table = request.table_name(),
        operation = %request.operation(),
        batch = items.len(),
        has_cursor = next.is_some(),
        "received first page"
    );
    Ok(items)
}
