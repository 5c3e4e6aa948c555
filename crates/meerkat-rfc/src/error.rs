use thiserror::Error;

/// RFC parsing and validation errors
#[derive(Error, Debug)]
pub enum RfcError {
    #[error(transparent)]
    VCardParse(#[from] crate::vcard::ParseError),

    #[error(transparent)]
    DavParse(#[from] crate::dav::parse::ParseError),

    #[error(transparent)]
    CoreError(#[from] meerkat_core::error::CoreError),
}

pub type RfcResult<T> = std::result::Result<T, RfcError>;
