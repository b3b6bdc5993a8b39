use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{EtlError, EtlResult};

/// Streams typed records out of a newline-delimited JSON file.
/// Blank lines are skipped. Items carry the 1-based line number they came from.
pub struct JsonlReader<T> {
    path: PathBuf,
    reader: BufReader<File>,
    line_no: usize,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn open(path: &Path) -> EtlResult<Self> {
        let file = File::open(path).map_err(|source| EtlError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            line_no: 0,
            _record: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonlReader<T> {
    type Item = EtlResult<(usize, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut line) {
                Ok(0) => return None, // EOF
                Ok(_) if line.trim().is_empty() => continue,
                Ok(_) => {
                    let parsed = serde_json::from_str::<T>(&line).map_err(|source| {
                        EtlError::Parse {
                            path: self.path.clone(),
                            line: self.line_no,
                            source,
                        }
                    });
                    return Some(parsed.map(|record| (self.line_no, record)));
                }
                Err(source) => {
                    return Some(Err(EtlError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            }
        }
    }
}

/// Reads every record of a file, failing on the first malformed line.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> EtlResult<Vec<(usize, T)>> {
    JsonlReader::open(path)?.collect()
}
