use std::io;
use std::io::Write;

use micro_wire::codec::ChunkedWriter;

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn normal(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Normal, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// Input size reported as criterion throughput.
    pub fn throughput_bytes(&self) -> u64 {
        self.file.content.len() as u64
    }
}

/// A fixture under `resources/`, chunked wire bytes or a header value.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.content.as_bytes()
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
}

/// Frames `len` bytes of generated body data as a chunked body of `chunk_size` byte chunks.
pub fn chunked_wire(len: usize, chunk_size: usize) -> io::Result<Vec<u8>> {
    let body: Vec<u8> = (b'a'..=b'z').cycle().take(len).collect();
    let mut writer = ChunkedWriter::with_chunk_size(chunk_size, Vec::with_capacity(len + len / chunk_size.max(1) * 8));
    writer.write_all(&body)?;
    writer.close()?;
    Ok(writer.into_inner())
}
