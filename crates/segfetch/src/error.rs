use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SegfetchError {
    #[error("Invalid duration: {0}")]
    FormatError(String),

    #[error("Missing required field {field} on {element}")]
    MissingField { element: String, field: &'static str },

    #[error("Invalid value {value:?} for {field} on {element}")]
    InvalidAttribute {
        element: String,
        field: &'static str,
        value: String,
    },

    #[error("Unsupported manifest: {0}")]
    Unsupported(String),

    #[error("Invalid segment template: {0}")]
    InvalidTemplate(String),

    #[error("HTTP error {status} while fetching {url}")]
    HttpError { url: Url, status: reqwest::StatusCode },

    #[error("Failed to fetch {url}: {source}")]
    RequestError {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("Track index {index} out of range, manifest has {count} track(s)")]
    TrackIndexOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    IOError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error(transparent)]
    XmlError(#[from] quick_xml::DeError),
}

impl SegfetchError {
    pub(crate) fn missing(element: impl Into<String>, field: &'static str) -> Self {
        Self::MissingField {
            element: element.into(),
            field,
        }
    }

    /// Whether this error was raised while talking to a remote server.
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Self::HttpError { .. } | Self::RequestError { .. })
    }

    /// The URL of the failed request, for fetch errors.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::HttpError { url, .. } | Self::RequestError { url, .. } => Some(url),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            Self::RequestError { source, .. } => source.status(),
            _ => None,
        }
    }
}

pub type SegfetchResult<T> = Result<T, SegfetchError>;
