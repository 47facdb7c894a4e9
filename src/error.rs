use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("ONNX Runtime error: {0}")]
    Runtime(#[from] ort::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("symbol table maps both `{first}` and `{second}` to `{grapheme}`")]
    DuplicateGrapheme {
        first: String,
        second: String,
        grapheme: char,
    },

    #[error("unexpected model output: {0}")]
    Inference(String),
}

pub type Result<T> = std::result::Result<T, Error>;
