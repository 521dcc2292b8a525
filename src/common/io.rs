use std::fs::{self, File};
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;

#[cfg(target_os = "linux")]
use std::sync::atomic::{AtomicBool, Ordering};

use memmap2::{Mmap, MmapOptions};

/// Input bytes, either mapped or read into memory.
/// Dereferences to `&[u8]`.
pub enum FileData {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

impl FileData {
    /// View the bytes as text. Masking only accepts valid UTF-8.
    pub fn as_str(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(self)
    }
}

/// Files smaller than this are read; larger ones are mapped.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Cleared after the first EPERM so later opens skip O_NOATIME.
#[cfg(target_os = "linux")]
static NOATIME_SUPPORTED: AtomicBool = AtomicBool::new(true);

#[cfg(target_os = "linux")]
fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    if NOATIME_SUPPORTED.load(Ordering::Relaxed) {
        match fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path)
        {
            Ok(f) => return Ok(f),
            Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => {
                // Only the owner may set O_NOATIME
                NOATIME_SUPPORTED.store(false, Ordering::Relaxed);
            }
            Err(e) => return Err(e),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Read a whole file. Regular files of at least 1MB are memory-mapped;
/// pipes, devices and files reporting size 0 (such as procfs entries) are
/// read to EOF.
pub fn read_file(path: &Path) -> io::Result<FileData> {
    let file = open_noatime(path)?;
    let metadata = file.metadata()?;
    let len = metadata.len();

    if !metadata.file_type().is_file() || len == 0 {
        let mut buf = Vec::new();
        let mut reader = file;
        reader.read_to_end(&mut buf)?;
        return Ok(FileData::Owned(buf));
    }
    if len < MMAP_THRESHOLD {
        let mut buf = vec![0u8; len as usize];
        let n = read_full(&mut &file, &mut buf)?;
        buf.truncate(n);
        return Ok(FileData::Owned(buf));
    }

    // SAFETY: read-only mapping of a regular file we just opened.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    #[cfg(target_os = "linux")]
    {
        let _ = mmap.advise(memmap2::Advice::Sequential);
        let _ = mmap.advise(memmap2::Advice::WillNeed);
    }
    Ok(FileData::Mmap(mmap))
}

/// Read all of stdin.
pub fn read_stdin() -> io::Result<Vec<u8>> {
    const INITIAL: usize = 64 * 1024;

    let mut buf = Vec::with_capacity(INITIAL);
    io::stdin().lock().read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read one command-line operand; `-` means stdin.
pub fn read_input(name: &str) -> io::Result<FileData> {
    if name == "-" {
        read_stdin().map(FileData::Owned)
    } else {
        read_file(Path::new(name))
    }
}

/// Fill `buf` from `reader`, stopping early only at EOF.
#[inline]
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}
