use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("insertion into a full page")]
    PageFull,

    #[error("schema mismatch between page and tuple")]
    SchemaMismatch,

    #[error("tuple is not stored on this page")]
    TupleNotOnPage,

    #[error("tuple slot {0} is already empty")]
    SlotEmpty(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
