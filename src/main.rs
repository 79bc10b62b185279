use std::cell::RefCell;
use std::env;
use std::io::{self, Write};
use std::process;
use std::rc::Rc;

use tether::config::Config;
use tether::protocol::channel::SharedWriter;
use tether::protocol::codec::JsonArrayCodec;
use tether::session::{Session, interrupt};

fn main() {
    let args: Vec<String> = env::args().collect();

    // The host names the session; its config lives at `<name>.config`.
    let config = match args.get(1) {
        Some(base) => Config::load(base),
        None => Config::empty(),
    };

    interrupt::install_handler();

    let reader = Box::new(io::stdin().lock());
    let writer: SharedWriter = Rc::new(RefCell::new(io::stdout()));
    let mut session = Session::new(reader, writer, config, Box::new(JsonArrayCodec));

    match session.serve() {
        Ok(_) => {}
        Err(err) => {
            let _ = writeln!(io::stderr(), "tether: {}", err);
            process::exit(1);
        }
    }
}
