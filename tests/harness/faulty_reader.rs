use std::io::{Read, Result};

/// A reader that misbehaves in the ways framed and flaky streams do.
pub struct FaultyReader<R: Read> {
    inner: R,
    mode: FaultMode,
    counter: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum FaultMode {
    /// Never hands out more than `n` bytes per call.
    Fragments(usize),
    /// Fails every `n`th call with `ErrorKind::Interrupted`.
    InterruptedEvery(usize),
    /// Reports end of stream from the `n`th call on.
    PrematureEofAt(usize),
}

impl<R: Read> FaultyReader<R> {
    pub fn new(inner: R, mode: FaultMode) -> Self {
        Self {
            inner,
            mode,
            counter: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.counter
    }
}

impl<R: Read> Read for FaultyReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.counter += 1;
        match self.mode {
            FaultMode::Fragments(n) => {
                let len = buf.len().min(n);
                self.inner.read(&mut buf[..len])
            }
            FaultMode::InterruptedEvery(n) if n != 0 && self.counter % n == 0 => {
                Err(std::io::Error::from(std::io::ErrorKind::Interrupted))
            }
            FaultMode::PrematureEofAt(n) if self.counter >= n => Ok(0),
            _ => self.inner.read(buf),
        }
    }
}
