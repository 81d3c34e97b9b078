use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackdropError {
    #[error("X11 connection error: {0}")]
    Connection(#[from] x11rb::errors::ConnectError),

    #[error("X11 reply error: {0}")]
    Reply(#[from] x11rb::errors::ReplyError),

    #[error("X11 reply or ID error: {0}")]
    ReplyOrId(#[from] x11rb::errors::ReplyOrIdError),

    #[error("X11 connection error: {0}")]
    ConnectionError(#[from] x11rb::errors::ConnectionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Display has no _XROOTPMAP_ID atom")]
    NoRootPixmapAtom,

    #[error("No window in the tree carries the root pixmap property")]
    DesktopWindowNotFound,

    #[error("Root pixmap property has type {0}, expected PIXMAP")]
    NotAPixmap(u32),

    #[error("Root pixmap property holds no pixmap")]
    NullPixmap,

    #[error("Root pixmap has empty geometry {0}x{1}")]
    EmptyPixmap(u16, u16),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BackdropError>;
