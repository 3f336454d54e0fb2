//! Tree errors as errno values.

use wikifs_kernel::FsError;

pub type Errno = libc::c_int;

pub fn errno(err: &FsError) -> Errno {
    match err {
        FsError::NotFound(_) => libc::ENOENT,
        FsError::PermissionDenied(_) => libc::EACCES,
        FsError::NotADirectory(_) => libc::ENOTDIR,
        FsError::IsADirectory(_) => libc::EISDIR,
        FsError::Remote(_) => libc::EIO,
    }
}
