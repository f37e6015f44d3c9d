pub type ReelResult<T> = Result<T, ReelError>;

#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("config error: {0}")]
    Config(String),

    #[error("raster error: {0}")]
    Raster(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(ReelError::config("x").to_string().contains("config error:"));
        assert!(ReelError::raster("x").to_string().contains("raster error:"));
        assert!(ReelError::media("x").to_string().contains("media error:"));
        assert!(ReelError::encode("x").to_string().contains("encode error:"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
