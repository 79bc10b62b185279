use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Read, Write};
use std::rc::Rc;

/// Outbound half of the duplex stream.
///
/// Shared because proxy objects write their own `d` delete messages on
/// drop; everything else goes through [`Channel`].
pub type SharedWriter = Rc<RefCell<dyn Write>>;

/// Fatal stream-level failures. Nothing here is recoverable; the serve
/// loop propagates these and the process exits.
#[derive(Debug)]
pub enum ChannelError {
    Io(io::Error),
    /// The peer sent a frame-length line that is not a decimal number.
    BadLength(String),
    /// The stream ended in the middle of a frame or a nested call.
    UnexpectedEof,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Io(err) => write!(f, "stream i/o error: {}", err),
            ChannelError::BadLength(line) => {
                write!(f, "malformed frame length line: {:?}", line)
            }
            ChannelError::UnexpectedEof => f.write_str("stream closed mid-frame"),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<io::Error> for ChannelError {
    fn from(err: io::Error) -> Self {
        ChannelError::Io(err)
    }
}

/// Length-prefixed text framing over the duplex stream.
///
/// A frame is a decimal byte-length line followed by exactly that many
/// bytes of UTF-8 text. Command and response type bytes travel unframed.
pub struct Channel {
    reader: Box<dyn BufRead>,
    writer: SharedWriter,
}

impl Channel {
    pub fn new(reader: Box<dyn BufRead>, writer: SharedWriter) -> Self {
        Self { reader, writer }
    }

    /// Clone of the shared outbound writer, handed to proxy objects.
    pub fn writer(&self) -> SharedWriter {
        Rc::clone(&self.writer)
    }

    /// Read the single unframed command byte. `None` means the peer
    /// closed the stream.
    pub fn recv_command(&mut self) -> Result<Option<u8>, ChannelError> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ChannelError::Io(e)),
            }
        }
    }

    /// Read one framed payload: decimal length line, then that many bytes.
    pub fn recv_frame(&mut self) -> Result<String, ChannelError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(ChannelError::UnexpectedEof);
        }
        let length: usize = line
            .trim()
            .parse()
            .map_err(|_| ChannelError::BadLength(line.trim().to_string()))?;
        let mut payload = vec![0u8; length];
        self.reader.read_exact(&mut payload).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ChannelError::UnexpectedEof
            } else {
                ChannelError::Io(e)
            }
        })?;
        String::from_utf8(payload)
            .map_err(|_| ChannelError::BadLength("frame is not valid UTF-8".to_string()))
    }

    /// Write one unframed response type byte.
    pub fn send_byte(&mut self, byte: u8) -> Result<(), ChannelError> {
        let mut writer = self.writer.borrow_mut();
        writer.write_all(&[byte])?;
        writer.flush()?;
        Ok(())
    }

    /// Write one framed payload and flush.
    pub fn send_frame(&mut self, text: &str) -> Result<(), ChannelError> {
        let mut writer = self.writer.borrow_mut();
        writeln!(writer, "{}", text.len())?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Channel")
    }
}

/// Write a `d` delete message for `handle` through a shared writer.
///
/// Used by proxy `Drop` impls; errors are ignored because a dead stream
/// during teardown has nobody left to tell.
pub fn send_delete(writer: &SharedWriter, handle: u64) {
    let text = handle.to_string();
    let mut writer = writer.borrow_mut();
    let _ = writer.write_all(b"d");
    let _ = writeln!(writer, "{}", text.len());
    let _ = writer.write_all(text.as_bytes());
    let _ = writer.flush();
}
