// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use log::debug;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),
}

// ============================================================================
// RecordSource Trait
// ============================================================================

/// Somewhere a raw record can be retrieved from (a file, stdin, an FTP session)
pub trait RecordSource {
    /// Retrieve the record, decoded and trimmed
    fn fetch(&mut self) -> Result<String, FetchError>;
}

/// Decode a retrieved payload as UTF-8 and strip surrounding whitespace
pub fn decode_record(bytes: Vec<u8>) -> Result<String, FetchError> {
    let text = String::from_utf8(bytes)?;
    Ok(text.trim().to_string())
}

// ============================================================================
// Sources
// ============================================================================

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl RecordSource for FileSource {
    fn fetch(&mut self) -> Result<String, FetchError> {
        let mut file = File::open(&self.path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", self.path.display(), e))
        })?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        decode_record(bytes)
    }
}

/// Reads the whole of any reader, e.g. stdin
pub struct ReaderSource<R: Read> {
    reader: R,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource { reader }
    }
}

impl<R: Read> RecordSource for ReaderSource<R> {
    fn fetch(&mut self) -> Result<String, FetchError> {
        let mut bytes = Vec::new();
        self.reader.read_to_end(&mut bytes)?;
        debug!("Read {} bytes", bytes.len());
        decode_record(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_trims() {
        let text = decode_record(b"  \r\nID001|NAME|EXTRA\r\n".to_vec()).unwrap();
        assert_eq!(text, "ID001|NAME|EXTRA");
    }

    #[test]
    fn test_decode_keeps_inner_whitespace() {
        let text = decode_record(b" a | b ".to_vec()).unwrap();
        assert_eq!(text, "a | b");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_record(vec![b'a', 0xFF, b'b']).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_reader_source() {
        let mut source = ReaderSource::new("ID001|名称|X\n".as_bytes());
        assert_eq!(source.fetch().unwrap(), "ID001|名称|X");
    }

    #[test]
    fn test_file_source() {
        let test_file = std::env::temp_dir().join("ftp2serial_source.txt");
        std::fs::write(&test_file, b"A|B|C\n").unwrap();

        let mut source = FileSource::new(&test_file);
        assert_eq!(source.fetch().unwrap(), "A|B|C");

        std::fs::remove_file(&test_file).ok();
    }

    #[test]
    fn test_file_source_missing() {
        let mut source = FileSource::new(std::env::temp_dir().join("ftp2serial_missing.txt"));
        match source.fetch() {
            Err(FetchError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("ftp2serial_missing.txt"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
