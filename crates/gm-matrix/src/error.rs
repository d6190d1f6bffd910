use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("matmul dimension mismatch: [{m_rows}x{m_cols}] @ [{n_rows}x{n_cols}]")]
    DimensionMismatch {
        m_rows: usize,
        m_cols: usize,
        n_rows: usize,
        n_cols: usize,
    },
    #[error("index ({i}, {j}) out of range for {rows}x{cols} matrix")]
    IndexOutOfRange {
        i: usize,
        j: usize,
        rows: usize,
        cols: usize,
    },
    #[error("matrix dimensions must be positive, got {rows}x{cols}")]
    EmptyDimension { rows: usize, cols: usize },
    #[error("matrix dimensions {rows}x{cols} overflow the addressable element count")]
    TooLarge { rows: usize, cols: usize },
    #[error("data length {got} does not match dimensions (expected {expected})")]
    DataLength { expected: usize, got: usize },
    #[error("accelerator unavailable: {0}")]
    AcceleratorUnavailable(String),
    #[error("accelerator error: {0}")]
    Accelerator(#[from] AcceleratorError),
}

/// Failures raised by an accelerator device while serving a single call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcceleratorError {
    #[error("no accelerator device found")]
    DeviceNotFound,
    #[error("accelerator disabled by configuration")]
    Disabled,
    #[error("kernel compilation failed: {0}")]
    Compile(String),
    #[error("unknown kernel: {0}")]
    UnknownKernel(String),
    #[error("failed to allocate {size} byte buffer")]
    Allocation { size: usize },
    #[error("unknown buffer handle {0}")]
    UnknownBuffer(u64),
    #[error("buffer {0} is not host visible")]
    NotHostVisible(u64),
    #[error("buffer size mismatch: expected {expected} bytes, got {got}")]
    SizeMismatch { expected: usize, got: usize },
    #[error("kernel parameter {0} does not fit in 32 bits")]
    ParamsOverflow(usize),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

pub type Result<T> = std::result::Result<T, MatrixError>;
