use std::io;

/// Error raised by a [`Sink`] that refuses a fragment.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The underlying writer failed.
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),
    /// The sink rejected the fragment for its own reasons.
    #[error("sink rejected fragment: {0}")]
    Rejected(String),
}

/// Ordered receiver of canonical fragments.
///
/// Fragments arrive in final left-to-right order; concatenating everything a
/// sink accepted yields exactly the buffered encoding. If `emit` fails the
/// encode stops immediately and whatever the sink already holds must be
/// discarded.
pub trait Sink {
    /// Accepts the next fragment.
    fn emit(&mut self, fragment: &[u8]) -> Result<(), SinkError>;
}

impl Sink for Vec<u8> {
    fn emit(&mut self, fragment: &[u8]) -> Result<(), SinkError> {
        self.extend_from_slice(fragment);
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, fragment: &[u8]) -> Result<(), SinkError> {
        (**self).emit(fragment)
    }
}

/// Adapts any [`io::Write`] into a sink.
#[derive(Debug)]
pub struct WriteSink<W> {
    inner: W,
}

impl<W: io::Write> WriteSink<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flushes and returns the wrapped writer.
    pub fn into_inner(mut self) -> Result<W, SinkError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: io::Write> Sink for WriteSink<W> {
    fn emit(&mut self, fragment: &[u8]) -> Result<(), SinkError> {
        self.inner.write_all(fragment)?;
        Ok(())
    }
}

/// Sink backed by a closure, for callers that feed a hasher or a transport directly.
pub struct FnSink<F> {
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(&[u8]) -> Result<(), SinkError>,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Sink for FnSink<F>
where
    F: FnMut(&[u8]) -> Result<(), SinkError>,
{
    fn emit(&mut self, fragment: &[u8]) -> Result<(), SinkError> {
        (self.f)(fragment)
    }
}
