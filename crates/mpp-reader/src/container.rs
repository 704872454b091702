//! Access to the compound-file container that holds the project streams.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use mpp_model::FileGeneration;

use crate::blocks::bytes::{i32_at, u32_at};
use crate::error::ReadError;
use crate::generation::GenerationTable;

/// Named byte streams organised in storages (directories), addressed with `/`-separated paths.
pub trait StreamSource {
    /// Reads a whole stream. Returns `Ok(None)` when the stream does not exist.
    fn read_stream(&mut self, path: &str) -> Result<Option<Vec<u8>>, ReadError>;

    fn storage_exists(&self, path: &str) -> bool;
}

/// A compound file opened with the `cfb` crate.
pub struct CfbSource<F> {
    comp: cfb::CompoundFile<F>,
}

impl<F: Read + Seek> CfbSource<F> {
    pub fn open(inner: F) -> Result<Self, ReadError> {
        let comp = cfb::CompoundFile::open(inner).map_err(|err| ReadError::Container(err.to_string()))?;
        Ok(Self { comp })
    }
}

impl<F: Read + Seek> StreamSource for CfbSource<F> {
    fn read_stream(&mut self, path: &str) -> Result<Option<Vec<u8>>, ReadError> {
        if !self.comp.is_stream(path) {
            return Ok(None);
        }
        let mut stream = self.comp.open_stream(path)?;
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    fn storage_exists(&self, path: &str) -> bool {
        self.comp.is_storage(path)
    }
}

/// Streams held in memory, keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    streams: BTreeMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.streams.insert(normalize_path(path), data);
    }
}

impl StreamSource for MemorySource {
    fn read_stream(&mut self, path: &str) -> Result<Option<Vec<u8>>, ReadError> {
        Ok(self.streams.get(&normalize_path(path)).cloned())
    }

    fn storage_exists(&self, path: &str) -> bool {
        let prefix = format!("{}/", normalize_path(path).trim_end_matches('/'));
        self.streams.keys().any(|k| k.starts_with(&prefix))
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Stream name of the OLE `CompObj` record in the root storage.
pub(crate) const COMP_OBJ_STREAM: &str = "/\u{1}CompObj";

const COMP_OBJ_HEADER_LEN: usize = 28;

/// The strings carried by the `CompObj` stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompObj {
    pub application_name: String,
    pub file_format: String,
    pub application_id: String,
}

impl CompObj {
    pub fn parse(data: &[u8]) -> Self {
        let mut offset = COMP_OBJ_HEADER_LEN;
        let mut next = || read_length_prefixed_ansi(data, &mut offset).unwrap_or_default();
        let application_name = next();
        let file_format = next();
        let application_id = next();
        Self {
            application_name,
            file_format,
            application_id,
        }
    }

    /// Major version from an application id such as `MSProject.Project.9`.
    pub fn application_version(&self) -> Option<u32> {
        self.application_id
            .rsplit('.')
            .next()
            .and_then(|v| v.trim().parse().ok())
    }
}

fn read_length_prefixed_ansi(data: &[u8], offset: &mut usize) -> Option<String> {
    let len = i32_at(data, *offset)?;
    *offset += 4;
    if len < 0 {
        // Clipboard-format marker followed by a 4-byte format id.
        u32_at(data, *offset)?;
        *offset += 4;
        return Some(String::new());
    }
    let len = len as usize;
    let bytes = data.get(*offset..offset.checked_add(len)?)?;
    *offset += len;
    let bytes = bytes.split(|b| *b == 0).next().unwrap_or_default();
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    Some(text.into_owned())
}

/// Detected generation plus the saving application's major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FormatInfo {
    pub generation: FileGeneration,
    pub application_version: Option<u32>,
}

/// Identifies the file generation from the `CompObj` stream, falling back to probing for
/// each generation's root properties stream.
pub(crate) fn detect_format(source: &mut dyn StreamSource) -> Result<FormatInfo, ReadError> {
    let comp_obj = source.read_stream(COMP_OBJ_STREAM)?.map(|data| CompObj::parse(&data));

    if let Some(comp_obj) = &comp_obj {
        let format = comp_obj.file_format.trim();
        if !format.is_empty() {
            let generation = match format {
                "MSProject.MPP9" => FileGeneration::Mpp9,
                "MSProject.MPP12" => FileGeneration::Mpp12,
                "MSProject.MPP14" => FileGeneration::Mpp14,
                other => return Err(ReadError::UnsupportedGeneration(other.to_string())),
            };
            log::debug!("detected {format} from CompObj");
            return Ok(FormatInfo {
                generation,
                application_version: comp_obj.application_version(),
            });
        }
    }

    for generation in [FileGeneration::Mpp14, FileGeneration::Mpp12, FileGeneration::Mpp9] {
        let stream = GenerationTable::for_generation(generation).props_stream;
        if source.read_stream(stream)?.is_some() {
            log::debug!("detected generation {} from {stream}", generation.number());
            return Ok(FormatInfo {
                generation,
                application_version: comp_obj.as_ref().and_then(CompObj::application_version),
            });
        }
    }

    Err(ReadError::UnsupportedGeneration(
        "no project properties stream".to_string(),
    ))
}
