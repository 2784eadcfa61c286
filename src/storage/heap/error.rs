use thiserror::Error;

use crate::common::types::PageId;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum HeapFileError {
    #[error("page {0} does not belong to this table")]
    WrongTable(PageId),

    #[error("page {0} is beyond the end of the file")]
    NoSuchPage(PageId),

    #[error("tuple has no stored location")]
    TupleNotStored,

    #[error("page error: {0}")]
    Page(#[from] PageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
