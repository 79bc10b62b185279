use crate::protocol::channel::ChannelError;
use crate::runtime::value::Value;
use crate::session::{EvalError, Session};

/// How one invocation of the dispatch loop ended.
#[derive(Debug, PartialEq)]
pub enum LoopExit {
    /// `q` command: stop immediately, no further I/O.
    Quit,
    /// The host closed the command stream.
    Eof,
    /// An `r` command delivered the value this invocation was awaiting.
    Returned(Value),
}

impl Session {
    /// Run the dispatch loop until the host quits or closes the stream.
    ///
    /// A top-level `r` command also ends the loop; the host only sends
    /// one when a guest-side call is in flight, so at the top level it
    /// means the peer is confused and there is nothing left to await.
    pub fn serve(&mut self) -> Result<LoopExit, ChannelError> {
        self.dispatch_loop()
    }

    /// One reentrant invocation of the command loop.
    ///
    /// Nested invocations are how every blocking wait is expressed: a
    /// callback or slot-access sends its request and calls this again,
    /// returning when the matching `r` arrives. Stack depth therefore
    /// equals host/guest call nesting depth.
    pub(crate) fn dispatch_loop(&mut self) -> Result<LoopExit, ChannelError> {
        loop {
            let Some(command) = self.channel.recv_command()? else {
                return Ok(LoopExit::Eof);
            };
            match command {
                b'e' => {
                    let source = self.channel.recv_frame()?;
                    let result = self.eval_source(&source);
                    if let Some(exit) = self.respond(result)? {
                        return Ok(exit);
                    }
                }
                b'x' => {
                    let source = self.channel.recv_frame()?;
                    let result = self.exec_source(&source).map(|_| Value::None);
                    if let Some(exit) = self.respond(result)? {
                        return Ok(exit);
                    }
                }
                b'q' => return Ok(LoopExit::Quit),
                b'r' => {
                    let source = self.channel.recv_frame()?;
                    match self.eval_source(&source) {
                        Ok(value) => return Ok(LoopExit::Returned(value)),
                        Err(EvalError::Quit) => return Ok(LoopExit::Quit),
                        Err(EvalError::Channel(err)) => return Err(err),
                        Err(EvalError::Interrupted) => self.return_value(Value::None)?,
                        Err(EvalError::Message(text)) => self.return_error(&text)?,
                    }
                }
                b'O' => self.return_mode += 1,
                b'o' => self.return_mode -= 1,
                other => {
                    self.return_error(&format!(
                        "Unknown message type \"{}\"",
                        other as char
                    ))?;
                }
            }
        }
    }

    /// Send exactly one response frame for an `e`/`x` command, or report
    /// that the loop must end. Interrupts complete as a null return.
    fn respond(
        &mut self,
        result: Result<Value, EvalError>,
    ) -> Result<Option<LoopExit>, ChannelError> {
        match result {
            Ok(value) => self.return_value(value)?,
            Err(EvalError::Interrupted) => self.return_value(Value::None)?,
            Err(EvalError::Message(text)) => self.return_error(&text)?,
            Err(EvalError::Quit) => return Ok(Some(LoopExit::Quit)),
            Err(EvalError::Channel(err)) => return Err(err),
        }
        Ok(None)
    }

    /// `r` response: success tag, then the encoded value. Error values
    /// are downgraded to error frames so they stay inspectable as text.
    pub(crate) fn return_value(&mut self, value: Value) -> Result<(), ChannelError> {
        if let Value::Error(text) = &value {
            let text = text.to_string();
            return self.return_error(&text);
        }
        self.channel.send_byte(b'r')?;
        self.send_value(&value)
    }

    /// `e` response: error tag, then the message text.
    pub(crate) fn return_error(&mut self, text: &str) -> Result<(), ChannelError> {
        self.channel.send_byte(b'e')?;
        self.send_value(&Value::error(text))
    }

    /// Encode and frame a value. The response tag is already on the
    /// wire by now, so an encoder failure is substituted as literal
    /// text; the host always gets a well-formed frame.
    pub(crate) fn send_value(&mut self, value: &Value) -> Result<(), ChannelError> {
        let text = self.encode_value(value);
        self.channel.send_frame(&text)
    }

    /// Invoke a host-side callable and block (reentrantly) for its result.
    pub(crate) fn call_remote(
        &mut self,
        handle: u64,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        // Keyword arguments ride along as alternating `:name value`
        // pairs after the positional arguments.
        let mut all_args = args;
        for (key, value) in kwargs {
            all_args.push(Value::symbol(format!(":{}", key)));
            all_args.push(value);
        }
        let payload = Value::Tuple(
            vec![
                Value::Int(handle as i64),
                Value::Tuple(all_args.into()),
            ]
            .into(),
        );

        self.with_default_return_mode(|session| {
            session
                .channel
                .send_byte(b'c')
                .map_err(EvalError::Channel)?;
            session.send_value(&payload).map_err(EvalError::Channel)?;
            session.await_result()
        })
    }

    /// Ask the host for an attribute of one of its own objects.
    pub(crate) fn slot_remote(&mut self, handle: u64, name: &str) -> Result<Value, EvalError> {
        let payload = Value::Tuple(
            vec![Value::Int(handle as i64), Value::str(name)].into(),
        );
        self.channel.send_byte(b's').map_err(EvalError::Channel)?;
        self.send_value(&payload).map_err(EvalError::Channel)?;
        self.await_result()
    }

    /// Drive the loop until the matching `r` arrives.
    fn await_result(&mut self) -> Result<Value, EvalError> {
        match self.dispatch_loop().map_err(EvalError::Channel)? {
            LoopExit::Returned(value) => Ok(value),
            LoopExit::Quit => Err(EvalError::Quit),
            LoopExit::Eof => Err(EvalError::Channel(ChannelError::UnexpectedEof)),
        }
    }

    /// Evaluate one expression frame.
    pub fn eval_source(&mut self, source: &str) -> Result<Value, EvalError> {
        self.check_interrupt()?;
        let expression = crate::syntax::Parser::parse_single_expression(source)
            .map_err(EvalError::Message)?;
        self.eval_expression(&expression)
    }

    /// Execute a statement frame for effect.
    pub fn exec_source(&mut self, source: &str) -> Result<(), EvalError> {
        let statements =
            crate::syntax::Parser::parse_program(source).map_err(EvalError::Message)?;
        for statement in &statements {
            self.check_interrupt()?;
            self.exec_statement(statement)?;
        }
        Ok(())
    }
}
