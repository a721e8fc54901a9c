use bytemuck::Pod;
use crossbeam::thread;
#[cfg(unix)]
use memmap2::Advice;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::shared_slice::SharedSliceMut;
use crate::utils::thread_count;

/// Binary format magics. Each starts with the `PIGO` library tag followed
/// by a structure tag; a `PIGO` prefix with an unrecognized tag is treated
/// as a version mismatch rather than falling through to text parsing.
pub static LIB_TAG: &[u8] = b"PIGO";
pub static COO_MAGIC: &[u8] = b"PIGO COO v2\n";
pub static CSR_MAGIC: &[u8] = b"PIGO CSR v2\n";
pub static DIGRAPH_MAGIC: &[u8] = b"PIGO DiGraph v2\n";
pub static TENSOR_MAGIC: &[u8] = b"PIGO Tensor v2\n";

static EXT_MATRIX_MARKET: &str = "mtx";
static EXT_GRAPH: &str = "graph";

/// Detected input format for a [`MappedFile`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    CooBin,
    CsrBin,
    DigraphBin,
    TensorBin,
    MatrixMarket,
    Graph,
    EdgeList,
}

#[derive(Debug)]
enum Map {
    Ro(Mmap),
    Rw(MmapMut),
}

/// Whole-file memory map with a read position.
///
/// Read mode maps an existing file read-only. Write mode pre-sizes the file
/// to an exact caller-declared length and maps it shared, so workers can
/// emit directly into the page cache. The mapping is released on drop on
/// every exit path.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    map: Map,
    len: usize,
    pos: usize,
}

#[cfg(target_os = "linux")]
fn open_readonly(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    // un-cached reads where the kernel allows them; plain open otherwise
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_DIRECT)
        .open(path)
        .or_else(|_| File::open(path))
}

#[cfg(not(target_os = "linux"))]
fn open_readonly(path: &Path) -> std::io::Result<File> {
    File::open(path)
}

impl MappedFile {
    /// Map an existing file read-only.
    pub fn open_read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = open_readonly(path)
            .map_err(|e| Error::UnableToOpen(format!("{}: {e}", path.display())))?;
        let len = file
            .metadata()
            .map_err(|e| Error::IoFailure(format!("{}: {e}", path.display())))?
            .len() as usize;

        // a zero-length file still gets a one-page map; `len` keeps every
        // access inside the real contents
        let map = unsafe { MmapOptions::new().len(len.max(1)).map(&file) }
            .map_err(|e| Error::IoFailure(format!("mmap {}: {e}", path.display())))?;
        #[cfg(unix)]
        let _ = map.advise(Advice::WillNeed);

        Ok(MappedFile {
            path: path.to_path_buf(),
            map: Map::Ro(map),
            len,
            pos: 0,
        })
    }

    /// Create (or truncate) `path`, pre-size it to exactly `size` bytes and
    /// map it shared read-write.
    pub fn open_write<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        if size == 0 {
            return Err(Error::InvalidSize(format!(
                "{}: cannot map a zero-length file for writing",
                path.display()
            )));
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::UnableToOpen(format!("{}: {e}", path.display())))?;
        file.set_len(size as u64)
            .map_err(|e| Error::IoFailure(format!("sizing {}: {e}", path.display())))?;

        let map = unsafe { MmapOptions::new().map_mut(&file) }
            .map_err(|e| Error::IoFailure(format!("mmap {}: {e}", path.display())))?;
        #[cfg(unix)]
        let _ = map.advise(Advice::WillNeed);

        Ok(MappedFile {
            path: path.to_path_buf(),
            map: Map::Rw(map),
            len: size,
            pos: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.map {
            Map::Ro(m) => &m[..self.len],
            Map::Rw(m) => &m[..self.len],
        }
    }

    /// A scanner over the bytes from the current position to the end.
    pub fn reader(&self) -> Cursor<'_> {
        Cursor::new(self.as_bytes()).at_offset(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.len {
            return Err(Error::SeekOutOfRange(format!(
                "{} >= file length {}",
                pos, self.len
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// Typed read at the current position; advances by the value width.
    /// Position validity is the caller's responsibility, as with every
    /// fixed-layout decoder.
    pub fn read<T: Pod>(&mut self) -> T {
        let size = std::mem::size_of::<T>();
        assert!(self.pos + size <= self.len, "typed read past end of file");
        let v = unsafe {
            (self.as_bytes().as_ptr().add(self.pos) as *const T).read_unaligned()
        };
        self.pos += size;
        v
    }

    /// Typed write at the current position; advances by the value width.
    pub fn write<T: Pod>(&mut self, v: T) {
        let size = std::mem::size_of::<T>();
        assert!(self.pos + size <= self.len, "typed write past end of file");
        let base = self.rw_base();
        unsafe { (base.add(self.pos) as *mut T).write_unaligned(v) };
        self.pos += size;
    }

    /// Emit a byte string at the current position.
    pub fn write_bytes(&mut self, s: &[u8]) {
        assert!(self.pos + s.len() <= self.len, "write past end of file");
        let base = self.rw_base();
        unsafe { std::ptr::copy_nonoverlapping(s.as_ptr(), base.add(self.pos), s.len()) };
        self.pos += s.len();
    }

    /// True iff the bytes at the current position equal `s`; does not
    /// advance.
    pub fn matches(&self, s: &[u8]) -> bool {
        self.reader().matches(s)
    }

    /// Require `s` at the current position and advance past it.
    pub fn advance(&mut self, s: &[u8]) -> Result<()> {
        if !self.matches(s) {
            return Err(Error::FormatUnsupported(format!(
                "{}: expected {:?} at offset {}",
                self.path.display(),
                String::from_utf8_lossy(s),
                self.pos
            )));
        }
        self.pos += s.len();
        Ok(())
    }

    fn rw_base(&mut self) -> *mut u8 {
        match &mut self.map {
            Map::Rw(m) => m.as_mut_ptr(),
            Map::Ro(_) => panic!("write access to a read-only mapping"),
        }
    }

    /// Shared writable view over the whole map, for workers emitting into
    /// disjoint byte ranges.
    pub(crate) fn as_shared_mut(&mut self) -> SharedSliceMut<u8> {
        let len = self.len;
        SharedSliceMut::new(self.rw_base(), len)
    }

    /// Copy `src` into the map at the current position with one contiguous
    /// block per worker; the remainder goes to the last worker.
    pub fn parallel_copy_in(&mut self, src: &[u8]) -> Result<()> {
        let n = src.len();
        if self.pos + n > self.len {
            return Err(Error::IoFailure(format!(
                "parallel write of {} bytes at {} runs past file length {}",
                n,
                self.pos,
                self.len
            )));
        }
        if n > 0 {
            let pos = self.pos;
            let base = unsafe { self.rw_base().add(pos) };
            let dst = SharedSliceMut::new(base, n);
            parallel_block_copy(n, |start, len| {
                let mut view = dst;
                view.write_slice(start, &src[start..start + len]);
            })?;
        }
        self.pos += n;
        Ok(())
    }

    /// Copy from the map at the current position into `dst`, one contiguous
    /// block per worker.
    pub fn parallel_copy_out(&mut self, dst: &mut [u8]) -> Result<()> {
        let n = dst.len();
        if self.pos + n > self.len {
            return Err(Error::IoFailure(format!(
                "parallel read of {} bytes at {} runs past file length {}",
                n,
                self.pos,
                self.len
            )));
        }
        if n > 0 {
            let src = &self.as_bytes()[self.pos..self.pos + n];
            let out = SharedSliceMut::from_slice(dst);
            parallel_block_copy(n, |start, len| {
                let mut view = out;
                view.write_slice(start, &src[start..start + len]);
            })?;
        }
        self.pos += n;
        Ok(())
    }

    /// Inspect the leading bytes for a known binary magic, then fall back to
    /// the filename suffix: `.mtx` is MatrixMarket, `.graph` is the
    /// adjacency format, anything else is treated as an edge list.
    pub fn guess_format(&self) -> Result<FileFormat> {
        let r = self.reader();
        if r.matches(COO_MAGIC) {
            return Ok(FileFormat::CooBin);
        }
        if r.matches(CSR_MAGIC) {
            return Ok(FileFormat::CsrBin);
        }
        if r.matches(DIGRAPH_MAGIC) {
            return Ok(FileFormat::DigraphBin);
        }
        if r.matches(TENSOR_MAGIC) {
            return Ok(FileFormat::TensorBin);
        }
        if r.matches(LIB_TAG) {
            return Err(Error::VersionMismatch(format!(
                "{}: unrecognized PIGO binary header, likely written by an incompatible version",
                self.path.display()
            )));
        }
        match self.path.extension().and_then(|e| e.to_str()) {
            Some(e) if e == EXT_MATRIX_MARKET => Ok(FileFormat::MatrixMarket),
            Some(e) if e == EXT_GRAPH => Ok(FileFormat::Graph),
            _ => Ok(FileFormat::EdgeList),
        }
    }
}

/// Run `copy(start, len)` once per worker over the N-way partition of `n`
/// bytes.
fn parallel_block_copy<F>(n: usize, copy: F) -> Result<()>
where
    F: Fn(usize, usize) + Send + Sync,
{
    let workers = thread_count();
    let chunk = n / workers;
    thread::scope(|s| {
        for k in 0..workers {
            let start = k * chunk;
            let len = if k == workers - 1 { n - start } else { chunk };
            let copy = &copy;
            s.spawn(move |_| {
                if len > 0 {
                    copy(start, len);
                }
            });
        }
    })
    .map_err(|e| Error::IoFailure(format!("copy worker panicked: {e:?}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_common::{temp_path, write_bytes};
    use std::fs;

    #[test]
    fn open_read_missing_file_fails() {
        let p = temp_path("absent.el");
        let err = MappedFile::open_read(&p).unwrap_err();
        assert!(matches!(err, Error::UnableToOpen(_)));
    }

    #[test]
    fn open_write_zero_size_fails() {
        let p = temp_path("zero.bin");
        let err = MappedFile::open_write(&p, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidSize(_)));
    }

    #[test]
    fn typed_write_then_read_roundtrip() {
        let p = temp_path("typed.bin");
        {
            let mut w = MappedFile::open_write(&p, 4 + 8 + 1).unwrap();
            w.write::<u32>(0xDEAD_BEEF);
            w.write::<u64>(42);
            w.write::<u8>(7);
        }
        let mut r = MappedFile::open_read(&p).unwrap();
        assert_eq!(r.len(), 13);
        assert_eq!(r.read::<u32>(), 0xDEAD_BEEF);
        assert_eq!(r.read::<u64>(), 42);
        assert_eq!(r.read::<u8>(), 7);
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn matches_and_advance() {
        let p = temp_path("hdr.bin");
        write_bytes(&p, b"PIGO COO v2\nrest");
        let mut r = MappedFile::open_read(&p).unwrap();
        assert!(r.matches(COO_MAGIC));
        r.advance(COO_MAGIC).unwrap();
        assert_eq!(r.pos(), COO_MAGIC.len());
        let err = r.advance(b"nope").unwrap_err();
        assert!(matches!(err, Error::FormatUnsupported(_)));
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn seek_past_end_fails() {
        let p = temp_path("seek.bin");
        write_bytes(&p, b"0123");
        let mut r = MappedFile::open_read(&p).unwrap();
        r.seek(3).unwrap();
        assert!(matches!(r.seek(4), Err(Error::SeekOutOfRange(_))));
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn guess_format_magics_and_extensions() {
        let p = temp_path("coo.bin");
        write_bytes(&p, COO_MAGIC);
        assert_eq!(
            MappedFile::open_read(&p).unwrap().guess_format().unwrap(),
            FileFormat::CooBin
        );
        write_bytes(&p, CSR_MAGIC);
        assert_eq!(
            MappedFile::open_read(&p).unwrap().guess_format().unwrap(),
            FileFormat::CsrBin
        );
        write_bytes(&p, b"PIGO XYZ v9\n");
        assert!(matches!(
            MappedFile::open_read(&p).unwrap().guess_format(),
            Err(Error::VersionMismatch(_))
        ));
        let _ = fs::remove_file(&p);

        let p = temp_path("mat.mtx");
        write_bytes(&p, b"%%MatrixMarket matrix coordinate pattern general\n");
        assert_eq!(
            MappedFile::open_read(&p).unwrap().guess_format().unwrap(),
            FileFormat::MatrixMarket
        );
        let _ = fs::remove_file(&p);

        let p = temp_path("adj.graph");
        write_bytes(&p, b"1 2\n");
        assert_eq!(
            MappedFile::open_read(&p).unwrap().guess_format().unwrap(),
            FileFormat::Graph
        );
        let _ = fs::remove_file(&p);

        let p = temp_path("plain.el");
        write_bytes(&p, b"1 2\n");
        assert_eq!(
            MappedFile::open_read(&p).unwrap().guess_format().unwrap(),
            FileFormat::EdgeList
        );
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn parallel_copy_roundtrip() {
        let p = temp_path("blocks.bin");
        let data: Vec<u8> = (0..100_003).map(|i| (i % 251) as u8).collect();
        {
            let mut w = MappedFile::open_write(&p, data.len()).unwrap();
            w.parallel_copy_in(&data).unwrap();
            assert_eq!(w.pos(), data.len());
        }
        let mut r = MappedFile::open_read(&p).unwrap();
        let mut back = vec![0u8; data.len()];
        r.parallel_copy_out(&mut back).unwrap();
        assert_eq!(back, data);
        assert_eq!(r.pos(), data.len());
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn parallel_copy_past_end_fails() {
        let p = temp_path("short.bin");
        let mut w = MappedFile::open_write(&p, 8).unwrap();
        let err = w.parallel_copy_in(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, Error::IoFailure(_)));
        let _ = fs::remove_file(&p);
    }

    #[test]
    fn empty_file_maps_with_zero_len() {
        let p = temp_path("empty.el");
        write_bytes(&p, b"");
        let r = MappedFile::open_read(&p).unwrap();
        assert!(r.is_empty());
        assert!(!r.reader().good());
        let _ = fs::remove_file(&p);
    }
}
