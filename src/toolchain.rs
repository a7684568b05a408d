//! External structural toolchain: source to annotated markup and back.

use crate::error::Error;
use crate::tree::Document;
use crate::tree::xml;
use log::debug;
use std::path::Path;
use std::process::Command;

/// Bridges source files and [`Document`] trees. `parse` produces the
/// annotated markup tree of a source file, optionally carrying line/column
/// position attributes; `render` prints a tree back to source bytes.
pub trait Toolchain {
    fn parse(&self, path: &Path, with_positions: bool) -> Result<Document, Error>;

    fn render(&self, doc: &Document) -> Result<Vec<u8>, Error>;
}

/// Shells out to the `srcml` binary for parsing. Rendering needs no
/// subprocess: a markup tree prints as the concatenation of its text and
/// tail slots in document order, which is exactly what the external printer
/// does.
#[derive(Clone, Debug, Default)]
pub struct SrcmlToolchain;

impl SrcmlToolchain {
    pub fn new() -> Self {
        SrcmlToolchain
    }
}

impl Toolchain for SrcmlToolchain {
    fn parse(&self, path: &Path, with_positions: bool) -> Result<Document, Error> {
        let mut command = Command::new("srcml");
        if with_positions {
            command.arg("--position").arg("--tabs=1");
        }
        command.arg(path);
        debug!("parsing {} via srcml", path.display());

        let output = command
            .output()
            .map_err(|e| Error::toolchain(format!("failed to run srcml: {e}")))?;
        if !output.status.success() {
            return Err(Error::toolchain(format!(
                "srcml exited with {} for {}: {}",
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim_end()
            )));
        }
        xml::parse_document(&output.stdout)
    }

    fn render(&self, doc: &Document) -> Result<Vec<u8>, Error> {
        Ok(doc.source_bytes())
    }
}
