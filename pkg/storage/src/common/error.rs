use core::fmt::{Display, Formatter};

pub type FsResult<T = ()> = Result<T, FsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    ReadError,
    Timeout,
    UnknownDevice,
    InvalidOperation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilenameError {
    FilenameEmpty,
    NameTooLong,
    MisplacedPeriod,
    InvalidCharacter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    DeviceError(DeviceError),
    FilenameError(FilenameError),
    InvalidArgument,
    OutOfMemory,
    FileNotFound,
    CorruptVolume(&'static str),
    BadCluster,
}

/// Coarse failure classes callers dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    OutOfMemory,
    InvalidArgument,
    NotFound,
    CorruptVolume,
    IoFailure,
}

impl FsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::OutOfMemory => ErrorKind::OutOfMemory,
            FsError::InvalidArgument | FsError::FilenameError(_) => ErrorKind::InvalidArgument,
            FsError::FileNotFound => ErrorKind::NotFound,
            FsError::CorruptVolume(_) | FsError::BadCluster => ErrorKind::CorruptVolume,
            FsError::DeviceError(_) => ErrorKind::IoFailure,
        }
    }

    /// The integer status used at C-style call boundaries: every failure is `-1`.
    pub const fn errno(&self) -> i32 {
        -1
    }
}

impl From<DeviceError> for FsError {
    fn from(err: DeviceError) -> Self {
        FsError::DeviceError(err)
    }
}

impl From<FilenameError> for FsError {
    fn from(err: FilenameError) -> Self {
        FsError::FilenameError(err)
    }
}

impl Display for FsError {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        match self {
            FsError::DeviceError(err) => write!(f, "device error: {:?}", err),
            FsError::FilenameError(err) => write!(f, "bad filename: {:?}", err),
            FsError::InvalidArgument => write!(f, "invalid argument"),
            FsError::OutOfMemory => write!(f, "out of memory"),
            FsError::FileNotFound => write!(f, "file not found"),
            FsError::CorruptVolume(why) => write!(f, "corrupt volume: {}", why),
            FsError::BadCluster => write!(f, "bad cluster in chain"),
        }
    }
}
