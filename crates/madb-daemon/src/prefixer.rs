//! Line-prefixed console output shared by concurrently running devices
//!
//! Every device gets its own [`LinePrefixer`] per stream. A prefixer buffers
//! bytes until a newline, then hands the whole prefixed line to the shared
//! [`OutputSink`] in a single locked write, so lines from different devices
//! interleave but never fuse.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use madb_core::{device_prefix, Device, PrefixStyle};

/// A console stream shared between device tasks
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::from_writer(io::stderr())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write `bytes` as one uninterrupted unit
    pub fn write_atomic(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output sink lock poisoned"))?;
        writer.write_all(bytes)?;
        writer.flush()
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// How device output is presented on the console
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub style: PrefixStyle,
    pub stdout: OutputSink,
    pub stderr: OutputSink,
}

impl OutputOptions {
    pub fn new(style: PrefixStyle) -> Self {
        Self {
            style,
            stdout: OutputSink::stdout(),
            stderr: OutputSink::stderr(),
        }
    }

    /// Prefix for `device`; `with_user` tags the default user id when set
    pub fn prefix_for(&self, device: &Device, with_user: bool) -> String {
        device_prefix(device, self.style, with_user)
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(PrefixStyle::default())
    }
}

/// Prepends a fixed prefix to every complete line written through it
///
/// A trailing partial line stays buffered until [`LinePrefixer::finish`],
/// which emits it with a newline appended.
pub struct LinePrefixer {
    prefix: Vec<u8>,
    sink: OutputSink,
    buffer: Vec<u8>,
}

impl LinePrefixer {
    pub fn new(prefix: impl Into<String>, sink: OutputSink) -> Self {
        Self {
            prefix: prefix.into().into_bytes(),
            sink,
            buffer: Vec::new(),
        }
    }

    /// Buffer `bytes` and emit every line completed so far
    pub fn push(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.emit(&line)?;
        }

        Ok(())
    }

    /// Emit any buffered partial line, terminated with a newline
    pub fn finish(mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut rest = std::mem::take(&mut self.buffer);
        rest.push(b'\n');
        self.emit(&rest)
    }

    fn emit(&self, line: &[u8]) -> io::Result<()> {
        let mut out = Vec::with_capacity(self.prefix.len() + line.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(line);
        self.sink.write_atomic(&out)
    }
}

impl Write for LinePrefixer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::SharedBuffer;

    fn prefixer(prefix: &str) -> (LinePrefixer, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let sink = OutputSink::from_writer(buffer.clone());
        (LinePrefixer::new(prefix, sink), buffer)
    }

    #[test]
    fn test_prefixes_each_line() {
        let (mut p, buffer) = prefixer("[Tablet]\t");
        p.push(b"first line\nsecond line\n").unwrap();
        p.finish().unwrap();

        assert_eq!(buffer.contents(), "[Tablet]\tfirst line\n[Tablet]\tsecond line\n");
    }

    #[test]
    fn test_holds_partial_line_until_newline() {
        let (mut p, buffer) = prefixer("[SERIAL1]\t");
        p.push(b"hel").unwrap();
        assert_eq!(buffer.contents(), "");

        p.push(b"lo\nwor").unwrap();
        assert_eq!(buffer.contents(), "[SERIAL1]\thello\n");

        p.push(b"ld\n").unwrap();
        assert_eq!(buffer.contents(), "[SERIAL1]\thello\n[SERIAL1]\tworld\n");
    }

    #[test]
    fn test_finish_flushes_trailing_partial_line() {
        let (mut p, buffer) = prefixer("[Phone]\t");
        p.push(b"done\nno newline").unwrap();
        p.finish().unwrap();

        assert_eq!(buffer.contents(), "[Phone]\tdone\n[Phone]\tno newline\n");
    }

    #[test]
    fn test_finish_without_pending_output_writes_nothing() {
        let (p, buffer) = prefixer("[Phone]\t");
        p.finish().unwrap();
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_empty_lines_are_prefixed() {
        let (mut p, buffer) = prefixer("[A]\t");
        p.push(b"\n\n").unwrap();
        assert_eq!(buffer.contents(), "[A]\t\n[A]\t\n");
    }

    #[test]
    fn test_empty_prefix_passes_lines_through() {
        let (mut p, buffer) = prefixer("");
        write!(p, "plain {}", 1).unwrap();
        p.finish().unwrap();
        assert_eq!(buffer.contents(), "plain 1\n");
    }

    #[test]
    fn test_two_prefixers_share_a_sink_without_fusing_lines() {
        let buffer = SharedBuffer::default();
        let sink = OutputSink::from_writer(buffer.clone());
        let mut a = LinePrefixer::new("[A]\t", sink.clone());
        let mut b = LinePrefixer::new("[B]\t", sink);

        a.push(b"a1 part").unwrap();
        b.push(b"b1\nb2 part").unwrap();
        a.push(b"ial\n").unwrap();
        b.push(b"ial\n").unwrap();

        insta::assert_snapshot!(buffer.contents(), @r"
        [B]	b1
        [A]	a1 partial
        [B]	b2 partial
        ");
    }

    struct PanickingWriter;

    impl Write for PanickingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            panic!("writer failed");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_poisoned_sink_reports_io_error() {
        let sink = OutputSink::from_writer(PanickingWriter);
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink.write_atomic(b"line\n")
        }));
        assert!(first.is_err());

        let err = sink.write_atomic(b"line\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(err.to_string(), "output sink lock poisoned");
    }
}
