//! Binary entrypoint that launches the terminal chat.

use std::process::ExitCode;

use chatbot_store::start_chatbot;

/// Restore saved conversations and run the interactive chat loop.
fn main() -> ExitCode {
    start_chatbot::run()
}
