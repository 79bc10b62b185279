use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::Config;
use crate::protocol::channel::SharedWriter;
use crate::protocol::codec::JsonArrayCodec;
use crate::session::Session;

pub(crate) type CapturedOutput = Rc<RefCell<Vec<u8>>>;

/// Session over in-memory streams: scripted host input, captured output.
pub(crate) fn scripted_session(input: &str) -> (Session, CapturedOutput) {
    scripted_session_with_config(input, Config::empty())
}

pub(crate) fn scripted_session_with_config(
    input: &str,
    config: Config,
) -> (Session, CapturedOutput) {
    let reader = Box::new(Cursor::new(input.as_bytes().to_vec()));
    let output: CapturedOutput = Rc::new(RefCell::new(Vec::new()));
    let writer: SharedWriter = output.clone();
    let mut session = Session::new(reader, writer, config, Box::new(JsonArrayCodec));
    // Private flag so parallel tests never steal each other's interrupts.
    session.set_interrupt_flag(Arc::new(AtomicBool::new(false)));
    (session, output)
}

pub(crate) fn output_text(output: &CapturedOutput) -> String {
    String::from_utf8(output.borrow().clone()).expect("output is UTF-8")
}

/// Render `text` as one wire frame: length line plus payload.
pub(crate) fn frame(text: &str) -> String {
    format!("{}\n{}", text.len(), text)
}

/// A host command byte plus its framed payload.
pub(crate) fn command(byte: char, text: &str) -> String {
    format!("{}{}", byte, frame(text))
}
