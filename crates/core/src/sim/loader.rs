//! ELF Loader.
//!
//! This module turns executable images into plain values the harness can use. It performs:
//! 1. **Parsing:** Reads an ELF file and records its class and entry point.
//! 2. **Segments:** Collects every loadable segment, zero-filled up to its memory size.
//! 3. **Symbols:** Resolves the host-target mailbox and the optional test-signature bounds.
//!
//! Nothing here touches an engine; the results are installed by the bootstrap code.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSegment, ObjectSymbol};
use tracing::{debug, info};

use crate::common::error::{ConfigError, LoadError, SimError};
use crate::config::Xlen;
use crate::sim::signature::SignatureRegion;

/// Symbol the guest stores its completion status to.
pub const TOHOST_SYMBOL: &str = "tohost";
/// First byte of the test-signature region.
pub const BEGIN_SIGNATURE_SYMBOL: &str = "begin_signature";
/// One past the last byte of the test-signature region.
pub const END_SIGNATURE_SYMBOL: &str = "end_signature";

/// A loadable segment, already expanded to its in-memory size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Load address.
    pub addr: u64,
    /// Segment contents; bytes past the file size are zero.
    pub bytes: Vec<u8>,
}

/// A parsed ELF image.
#[derive(Debug, Clone, Default)]
pub struct LoadedElf {
    /// The image uses the 32-bit ELF class.
    pub is_32bit: bool,
    /// Entry point.
    pub entry: u64,
    /// Loadable segments in file order.
    pub segments: Vec<Segment>,
    symbols: HashMap<String, u64>,
}

impl LoadedElf {
    /// Parses an in-memory ELF image.
    ///
    /// # Errors
    ///
    /// Any parse error from `object`, including truncated segment data.
    pub fn parse(data: &[u8]) -> object::Result<Self> {
        let file = object::File::parse(data)?;

        let mut segments = Vec::new();
        for segment in file.segments() {
            let size = segment.size() as usize;
            if size == 0 {
                continue;
            }
            let mut bytes = segment.data()?.to_vec();
            bytes.resize(size.max(bytes.len()), 0);
            segments.push(Segment {
                addr: segment.address(),
                bytes,
            });
        }

        let symbols = file
            .symbols()
            .filter_map(|sym| sym.name().ok().map(|name| (name.to_owned(), sym.address())))
            .collect();

        Ok(Self {
            is_32bit: !file.is_64(),
            entry: file.entry(),
            segments,
            symbols,
        })
    }

    /// Address of `name`, if the image defines it.
    pub fn lookup_symbol(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).copied()
    }

    /// Address of `name`, failing if the image lacks it.
    ///
    /// # Errors
    ///
    /// [`LoadError::MissingSymbol`] when the symbol is absent.
    pub fn require_symbol(&self, name: &'static str) -> Result<u64, LoadError> {
        self.lookup_symbol(name).ok_or(LoadError::MissingSymbol(name))
    }

    /// Rejects an image whose class does not match the model width.
    ///
    /// # Errors
    ///
    /// [`ConfigError::XlenMismatch`] naming both widths.
    pub const fn check_xlen(&self, xlen: Xlen) -> Result<(), ConfigError> {
        let elf = if self.is_32bit { 32 } else { 64 };
        if elf == xlen.bits() {
            Ok(())
        } else {
            Err(ConfigError::XlenMismatch {
                elf,
                model: xlen.bits(),
            })
        }
    }
}

/// Reads and parses the ELF file at `path`.
///
/// # Errors
///
/// [`LoadError::Io`] when the file cannot be read, [`LoadError::Parse`] when it
/// is not a valid ELF image.
pub fn load_elf(path: &Path) -> Result<LoadedElf, LoadError> {
    let data = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let elf = LoadedElf::parse(&data).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        target: "platform",
        "{}: {}-bit, entry {:#x}, {} segment(s)",
        path.display(),
        if elf.is_32bit { 32 } else { 64 },
        elf.entry,
        elf.segments.len()
    );
    Ok(elf)
}

/// Everything the harness takes from the ELF files named on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProgramImage {
    /// Entry point of the main file.
    pub entry: u64,
    /// Host-target mailbox address from the main file.
    pub tohost: u64,
    /// Start of the test-signature region, if the main file defines one.
    pub begin_signature: Option<u64>,
    /// End of the test-signature region, if the main file defines one.
    pub end_signature: Option<u64>,
    /// Segments of every file, main file first.
    pub segments: Vec<Segment>,
}

impl ProgramImage {
    /// Loads the main file and any additional files.
    ///
    /// Only the main file is scanned for the mailbox and signature symbols; every
    /// file must match the model width.
    ///
    /// # Arguments
    ///
    /// * `main` - The program to run; must define `tohost`.
    /// * `extra` - Further images loaded into memory alongside it.
    /// * `xlen` - Model register width.
    ///
    /// # Errors
    ///
    /// Load failures for any file, a width mismatch, or a main file without `tohost`.
    pub fn load(main: &Path, extra: &[PathBuf], xlen: Xlen) -> Result<Self, SimError> {
        let elf = load_elf(main)?;
        elf.check_xlen(xlen)?;
        info!(target: "platform", "ELF Entry @ {:#x}", elf.entry);

        let tohost = elf.require_symbol(TOHOST_SYMBOL)?;
        info!(target: "platform", "tohost located at {tohost:#x}");
        let begin_signature = elf.lookup_symbol(BEGIN_SIGNATURE_SYMBOL);
        let end_signature = elf.lookup_symbol(END_SIGNATURE_SYMBOL);
        if let Some(addr) = begin_signature {
            info!(target: "platform", "begin_signature: {addr:#x}");
        }
        if let Some(addr) = end_signature {
            info!(target: "platform", "end_signature: {addr:#x}");
        }

        let mut image = Self {
            entry: elf.entry,
            tohost,
            begin_signature,
            end_signature,
            segments: elf.segments,
        };

        for path in extra {
            info!(target: "platform", "Loading additional ELF file {}.", path.display());
            let elf = load_elf(path)?;
            elf.check_xlen(xlen)?;
            image.segments.extend(elf.segments);
        }
        Ok(image)
    }

    /// The test-signature region; a missing bound reads as zero.
    pub fn signature_region(&self) -> SignatureRegion {
        SignatureRegion {
            begin: self.begin_signature.unwrap_or(0),
            end: self.end_signature.unwrap_or(0),
        }
    }
}
