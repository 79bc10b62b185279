use crate::session::LoopExit;
use crate::session::test_support::{command, frame, output_text, scripted_session};

#[test]
fn eval_command_answers_with_a_result_frame() {
    let (mut session, output) = scripted_session(&command('e', "1+1"));
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(output_text(&output), format!("r{}", frame("2")));
}

#[test]
fn exec_command_mutates_state_visible_to_later_evals() {
    let input = format!(
        "{}{}",
        command('x', "x = [1] + [2]"),
        command('e', "x")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(
        output_text(&output),
        format!("r{}r{}", frame("\"None\""), frame("#(1 2)"))
    );
}

#[test]
fn handle_mode_command_forces_remote_references() {
    let input = format!("O{}", command('e', "5"));
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(
        output_text(&output),
        format!(
            "r{}",
            frame("#.(tether:remote-object :type \"int\" :handle 0)")
        )
    );
    // The counter survives the loop; only a matching `o` lowers it.
    assert_eq!(session.return_mode(), 1);
}

#[test]
fn lowering_handle_mode_restores_plain_encoding() {
    let input = format!("Oo{}", command('e', "5"));
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(output_text(&output), format!("r{}", frame("5")));
}

#[test]
fn failing_exec_sends_one_error_frame() {
    let (mut session, output) = scripted_session(&command('x', "y = missing"));
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(
        output_text(&output),
        format!("e{}", frame("name 'missing' is not defined"))
    );
}

#[test]
fn errors_do_not_end_the_loop() {
    let input = format!(
        "{}{}",
        command('e', "_tether_free(42)"),
        command('e', "1")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    let text = output_text(&output);
    assert!(text.starts_with('e'), "{text}");
    assert!(text.contains("no object with handle 42"), "{text}");
    assert!(text.ends_with(&format!("r{}", frame("1"))), "{text}");
}

#[test]
fn unknown_command_byte_is_reported_and_skipped() {
    let input = format!("Z{}", command('e', "1"));
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    let text = output_text(&output);
    assert!(text.contains("Unknown message type \"Z\""), "{text}");
    assert!(text.ends_with(&format!("r{}", frame("1"))), "{text}");
}

#[test]
fn quit_command_stops_without_a_response() {
    let (mut session, output) = scripted_session("q");
    assert_eq!(session.serve().unwrap(), LoopExit::Quit);
    assert_eq!(output_text(&output), "");
}

#[test]
fn closed_stream_is_a_clean_exit() {
    let (mut session, output) = scripted_session("");
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(output_text(&output), "");
}

#[test]
fn callback_invocation_is_reentrant() {
    let input = format!(
        "{}{}{}",
        command('x', "cb = _tether_callback(7)"),
        command('e', "cb(1, 2)"),
        command('r', "99")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(
        output_text(&output),
        format!(
            "r{}c{}r{}",
            frame("\"None\""),
            frame("(7 (1 2))"),
            frame("99")
        )
    );
}

#[test]
fn callback_keyword_arguments_ride_as_symbol_pairs() {
    let input = format!(
        "{}{}{}",
        command('x', "cb = _tether_callback(3)"),
        command('e', "cb(1, flag=2)"),
        command('r', "0")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert!(
        output_text(&output).contains(&format!("c{}", frame("(3 (1 :flag 2))"))),
        "{}",
        output_text(&output)
    );
}

#[test]
fn nested_calls_suspend_forced_handle_mode() {
    // With the counter raised, the callback request itself must still be
    // plainly encoded, while the eventual answer goes back as a handle.
    let input = format!(
        "O{}{}{}",
        command('x', "cb = _tether_callback(7)"),
        command('e', "cb()"),
        command('r', "5")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    let text = output_text(&output);
    // An empty argument tuple still rides as the quoted marker.
    assert!(text.contains(&format!("c{}", frame("(7 \"()\")"))), "{text}");
    assert!(
        text.ends_with(&format!(
            "r{}",
            // Handle 1: the callback assignment already parked handle 0.
            frame("#.(tether:remote-object :type \"int\" :handle 1)")
        )),
        "{text}"
    );
    assert_eq!(session.return_mode(), 1);
}

#[test]
fn forced_handle_mode_survives_a_failed_nested_call() {
    // The host quits instead of answering the callback request; the
    // saved counter must still be restored on the error path.
    let input = format!(
        "O{}{}q",
        command('x', "cb = _tether_callback(2)"),
        command('e', "cb()")
    );
    let (mut session, _) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Quit);
    assert_eq!(session.return_mode(), 1);
}

#[test]
fn arithmetic_overflow_is_reported_and_the_loop_continues() {
    let input = format!(
        "{}{}",
        command('e', "_tether_array([4611686018427387904, 4], [])"),
        command('e', "1")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    let text = output_text(&output);
    assert!(text.starts_with('e'), "{text}");
    assert!(text.contains("too large"), "{text}");
    assert!(text.ends_with(&format!("r{}", frame("1"))), "{text}");
}

#[test]
fn slot_access_on_a_foreign_object_asks_the_host() {
    let input = format!(
        "{}{}{}",
        command('x', "f = _tether_foreign('KLASS', 4)"),
        command('e', "f.size"),
        command('r', "10")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    let text = output_text(&output);
    assert!(text.contains(&format!("s{}", frame("(4 \"size\")"))), "{text}");
    assert!(text.ends_with(&format!("r{}", frame("10"))), "{text}");
}

#[test]
fn return_frame_errors_are_reported_without_ending_the_loop() {
    let input = format!("{}q", command('r', "missing"));
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Quit);
    let text = output_text(&output);
    assert!(text.starts_with('e'), "{text}");
    assert!(text.contains("name 'missing' is not defined"), "{text}");
}

#[test]
fn top_level_return_frame_ends_the_loop_with_its_value() {
    let (mut session, _) = scripted_session(&command('r', "42"));
    assert_eq!(
        session.serve().unwrap(),
        LoopExit::Returned(crate::runtime::value::Value::Int(42))
    );
}

#[test]
fn interrupted_command_completes_as_a_null_return() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let (mut session, output) = scripted_session(&command('e', "1+1"));
    let flag = Arc::new(AtomicBool::new(false));
    session.set_interrupt_flag(flag.clone());
    flag.store(true, Ordering::SeqCst);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(output_text(&output), format!("r{}", frame("\"None\"")));
}

#[test]
fn dropping_a_proxy_notifies_the_host() {
    let input = format!(
        "{}{}",
        command('x', "f = _tether_foreign('T', 5)"),
        command('x', "del f")
    );
    let (mut session, output) = scripted_session(&input);
    assert_eq!(session.serve().unwrap(), LoopExit::Eof);
    assert_eq!(
        output_text(&output),
        format!(
            "r{}d{}r{}",
            frame("\"None\""),
            frame("5"),
            frame("\"None\"")
        )
    );
}
