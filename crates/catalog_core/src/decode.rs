//! Typed access to flat join rows.
//!
//! Every column in a join row is named `{prefix}_{field}`; a prefix names one
//! column group (an entity level, its owner, one of its files). A group is
//! absent when its `id` column is null, which is how an unmatched `LEFT JOIN`
//! shows up.

use crate::{CatalogError, CatalogResult, File, Id, Owner, Rating};

/// One flat record produced by a row source.
pub trait RowView {
    fn get_id(&self, column: &str) -> CatalogResult<Option<Id>>;
    fn get_str(&self, column: &str) -> CatalogResult<Option<String>>;
    fn get_i64(&self, column: &str) -> CatalogResult<Option<i64>>;
    fn get_bool(&self, column: &str) -> CatalogResult<Option<bool>>;
}

pub fn column(prefix: &str, field: &str) -> String {
    format!("{prefix}_{field}")
}

/// Column group decoded only when its identifier is present.
pub trait DecodeGroup: Sized {
    fn decode_present<R: RowView + ?Sized>(row: &R, prefix: &str, id: Id) -> CatalogResult<Self>;
}

pub fn decode_group<T, R>(row: &R, prefix: &str) -> CatalogResult<Option<T>>
where
    T: DecodeGroup,
    R: RowView + ?Sized,
{
    match row.get_id(&column(prefix, "id"))? {
        Some(id) => T::decode_present(row, prefix, id).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn required_str<R: RowView + ?Sized>(
    row: &R,
    prefix: &str,
    field: &str,
) -> CatalogResult<String> {
    let name = column(prefix, field);
    row.get_str(&name)?
        .ok_or_else(|| CatalogError::decode(name, "unexpected null"))
}

pub(crate) fn opt_str<R: RowView + ?Sized>(
    row: &R,
    prefix: &str,
    field: &str,
) -> CatalogResult<Option<String>> {
    row.get_str(&column(prefix, field))
}

pub(crate) fn opt_i64<R: RowView + ?Sized>(
    row: &R,
    prefix: &str,
    field: &str,
) -> CatalogResult<Option<i64>> {
    row.get_i64(&column(prefix, field))
}

pub(crate) fn opt_id<R: RowView + ?Sized>(
    row: &R,
    prefix: &str,
    field: &str,
) -> CatalogResult<Option<Id>> {
    row.get_id(&column(prefix, field))
}

pub(crate) fn flag<R: RowView + ?Sized>(row: &R, prefix: &str, field: &str) -> CatalogResult<bool> {
    Ok(row.get_bool(&column(prefix, field))?.unwrap_or(false))
}

impl DecodeGroup for File {
    fn decode_present<R: RowView + ?Sized>(row: &R, prefix: &str, id: Id) -> CatalogResult<Self> {
        Ok(File {
            id,
            file_type: opt_str(row, prefix, "file_type")?,
            mime_type: opt_str(row, prefix, "mime_type")?,
            size: opt_i64(row, prefix, "size")?,
            url: opt_str(row, prefix, "url")?,
            original_path: opt_str(row, prefix, "original_path")?,
            hash: opt_str(row, prefix, "hash")?,
            platform: opt_str(row, prefix, "platform")?,
            deployment: opt_str(row, prefix, "deployment")?,
            created_at: opt_i64(row, prefix, "created_at")?,
        })
    }
}

impl DecodeGroup for Owner {
    fn decode_present<R: RowView + ?Sized>(row: &R, prefix: &str, id: Id) -> CatalogResult<Self> {
        Ok(Owner {
            id,
            username: opt_str(row, prefix, "username")?,
            display_name: opt_str(row, prefix, "display_name")?,
        })
    }
}

impl Rating {
    /// Reads `{prefix}_rating_positive`, `{prefix}_rating_negative` and
    /// `{prefix}_rating_own`; an entity nobody rated decodes to zeroes.
    pub fn decode<R: RowView + ?Sized>(row: &R, prefix: &str) -> CatalogResult<Self> {
        Ok(Rating {
            positive: opt_i64(row, prefix, "rating_positive")?.unwrap_or(0),
            negative: opt_i64(row, prefix, "rating_negative")?.unwrap_or(0),
            own: opt_i64(row, prefix, "rating_own")?,
        })
    }
}
