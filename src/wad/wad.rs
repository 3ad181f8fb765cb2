//! Doom-format WAD container.
//!
//! * Reads the entire file into RAM; lump access is a slice borrow.
//! * Accepts `IWAD` and `PWAD` magics.
//! * Lump names are eight bytes, NUL/space padded, case-insensitive;
//!   when names collide the **last** lump wins, as in the original engine.

use byteorder::{LittleEndian as LE, ReadBytesExt};
use std::collections::HashMap;
use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};
use thiserror::Error;

/// Size (in bytes) of one directory entry.
const DIR_ENTRY_SIZE: usize = 16;

/// Metadata for a single lump (asset) inside the WAD.
#[derive(Clone, Debug)]
pub struct LumpInfo {
    /// Eight-byte ASCII name, NUL/space padded.
    pub name: [u8; 8],
    /// Offset to lump data from the beginning of the file.
    pub offset: u32,
    /// Size of the lump in bytes.
    pub size: u32,
}

/// Entire WAD resident in memory.
#[derive(Debug)]
pub struct Wad {
    /// Directory entries in the exact order they appear in the file.
    pub lumps: Vec<LumpInfo>,
    /// Backing buffer containing the raw file contents.
    bytes: Vec<u8>,
    /// uppercase name -> index of the last lump with that name
    by_name: HashMap<String, usize>,
}

/// Errors that can be encountered while opening/parsing a WAD.
#[derive(Error, Debug)]
pub enum WadError {
    /// Underlying I/O failure - propagated unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Header magic was neither `IWAD` nor `PWAD`.
    #[error("not a WAD file")]
    BadMagic,

    /// Directory claims to extend past end-of-file.
    #[error("corrupt WAD: directory extends beyond end of file")]
    DirectoryOutOfBounds,

    #[error("lump index {0} out of range")]
    BadIndex(usize),

    #[error("lump {name} (# {index}) size {size} not multiple of element {elem_size}")]
    BadLumpSize {
        index: usize,
        name: String,
        size: usize,
        elem_size: usize,
    },

    #[error("lump {name} (# {index}) element {elem}: {source}")]
    BadElement {
        index: usize,
        name: String,
        elem: usize,
        source: bincode::error::DecodeError,
    },
}

impl Wad {
    // ---------------------------------------------------------------------
    // Loading
    // ---------------------------------------------------------------------

    /// Load a WAD from disk into memory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WadError> {
        let mut file = File::open(path)?;
        let mut bytes = Vec::new();
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// Parse an already-loaded WAD image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WadError> {
        /*----------- 1. validate header ---------------------------------*/
        if bytes.len() < 12 {
            return Err(WadError::BadMagic);
        }
        let magic = &bytes[0..4];
        if magic != b"IWAD" && magic != b"PWAD" {
            return Err(WadError::BadMagic);
        }

        let mut cur = &bytes[4..12];
        let num_lumps = cur.read_u32::<LE>()?;
        let dir_offset = cur.read_u32::<LE>()?;

        /*----------- 2. sanity-check directory bounds -------------------*/
        let dir_end = dir_offset as usize + num_lumps as usize * DIR_ENTRY_SIZE;
        if dir_end > bytes.len() {
            return Err(WadError::DirectoryOutOfBounds);
        }

        /*----------- 3. parse directory entries -------------------------*/
        let mut lumps = Vec::with_capacity(num_lumps as usize);
        let mut cursor = &bytes[dir_offset as usize..dir_end];

        for _ in 0..num_lumps {
            let offset = cursor.read_u32::<LE>()?;
            let size = cursor.read_u32::<LE>()?;
            let mut name = [0u8; 8];
            cursor.read_exact(&mut name)?;
            lumps.push(LumpInfo { name, offset, size });
        }

        for l in &lumps {
            let end = l.offset as usize + l.size as usize;
            if end > bytes.len() {
                return Err(WadError::DirectoryOutOfBounds);
            }
        }

        /*----------- 4. build reverse index -----------------------------*/
        let mut by_name = HashMap::with_capacity(lumps.len());
        // scan *backwards* so later lumps shadow earlier ones
        for (i, l) in lumps.iter().enumerate().rev() {
            by_name
                .entry(Self::lump_name(&l.name).to_ascii_uppercase())
                .or_insert(i);
        }

        Ok(Self {
            lumps,
            bytes,
            by_name,
        })
    }

    // ---------------------------------------------------------------------
    // Convenience helpers
    // ---------------------------------------------------------------------

    /// Convert an eight-byte, NUL/space-padded lump name into a printable
    /// string.
    pub fn lump_name(raw: &[u8; 8]) -> &str {
        let end = raw
            .iter()
            .position(|&b| b == 0 || b == b' ')
            .unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end]).unwrap_or("?")
    }

    /// Borrow the raw bytes for lump `idx` without copying.
    pub fn lump_bytes(&self, idx: usize) -> Result<&[u8], WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        Ok(&self.bytes[l.offset as usize..(l.offset + l.size) as usize])
    }

    /// Byte length of lump `idx`.
    pub fn lump_len(&self, idx: usize) -> Result<usize, WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        Ok(l.size as usize)
    }

    /// Locate a lump by name (case-insensitive, last one wins).
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }
}

/* =========================================================================
 * Test fixtures - hand-built in-memory WADs shared by the whole crate.
 * ========================================================================= */

#[cfg(test)]
pub mod fixture {
    /// Assemble a syntactically valid WAD from `(name, payload)` pairs.
    pub fn build_wad(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        let mut dir = Vec::new();

        let mut offset = 12u32;
        for (name, payload) in entries {
            dir.push((offset, payload.len() as u32, *name));
            body.extend_from_slice(payload);
            offset += payload.len() as u32;
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"IWAD");
        out.extend((entries.len() as u32).to_le_bytes());
        out.extend((12 + body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        for (off, size, name) in dir {
            out.extend(off.to_le_bytes());
            out.extend(size.to_le_bytes());
            let mut padded = [0u8; 8];
            padded[..name.len()].copy_from_slice(name.as_bytes());
            out.extend_from_slice(&padded);
        }
        out
    }
}

// ==========================================================================
// Tests
// ==========================================================================

#[cfg(test)]
mod tests {
    use super::fixture::build_wad;
    use super::*;

    fn sample() -> Wad {
        Wad::from_bytes(build_wad(&[
            ("PLAYPAL", vec![1, 2, 3]),
            ("E1M1", vec![]),
            ("THINGS", vec![0; 10]),
        ]))
        .unwrap()
    }

    #[test]
    fn header_and_directory_parse() {
        let wad = sample();
        assert_eq!(wad.lumps.len(), 3);
        assert_eq!(Wad::lump_name(&wad.lumps[0].name), "PLAYPAL");
    }

    #[test]
    fn name_lookup_is_case_insensitive() {
        let wad = sample();
        assert_eq!(wad.find_lump("playpal"), Some(0));
        assert_eq!(wad.find_lump("E1M1"), Some(1));
        assert_eq!(wad.find_lump("NOPE"), None);
    }

    #[test]
    fn later_lump_shadows_earlier() {
        let wad = Wad::from_bytes(build_wad(&[
            ("DEMO", vec![1]),
            ("DEMO", vec![2]),
        ]))
        .unwrap();
        let idx = wad.find_lump("DEMO").unwrap();
        assert_eq!(wad.lump_bytes(idx).unwrap(), &[2]);
    }

    #[test]
    fn lump_slice_len_matches_directory() {
        let wad = sample();
        for (i, l) in wad.lumps.iter().enumerate() {
            assert_eq!(wad.lump_bytes(i).unwrap().len() as u32, l.size);
        }
    }

    #[test]
    fn rejects_garbage_file() {
        let bogus = b"NOTWAD_____".to_vec();
        assert!(matches!(
            Wad::from_bytes(bogus).unwrap_err(),
            WadError::BadMagic
        ));
    }

    #[test]
    fn directory_entry_out_of_bounds() {
        // Header + one directory entry whose payload points past EOF.
        let mut wad = Vec::<u8>::new();
        wad.extend_from_slice(b"IWAD");
        wad.extend(&1u32.to_le_bytes()); // num_lumps
        wad.extend(&12u32.to_le_bytes()); // dir_offset

        wad.extend(&1_000u32.to_le_bytes()); // lump offset (past EOF)
        wad.extend(&4u32.to_le_bytes()); // lump size
        wad.extend(b"BAD\0\0\0\0\0"); // 8-byte name

        // Round-trip through a real file so `from_file` is covered too.
        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        std::fs::write(tmp.path(), &wad).unwrap();

        let err = Wad::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, WadError::DirectoryOutOfBounds));
    }
}
