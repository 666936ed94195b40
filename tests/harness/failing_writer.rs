use std::io::{self, Write};

/// A writer whose device fails once `capacity` bytes have been accepted.
pub struct FailingWriter {
    pub written: Vec<u8>,
    capacity: usize,
}

impl FailingWriter {
    pub fn new(capacity: usize) -> Self {
        Self {
            written: Vec::new(),
            capacity,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity - self.written.len();
        if room == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device full"));
        }
        let len = buf.len().min(room);
        self.written.extend_from_slice(&buf[..len]);
        Ok(len)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
