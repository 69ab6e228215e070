//! Chat with Claude where every reply arrives gift-wrapped.
//!
//! A reply stays sealed until the user answers a trivia question drawn
//! from the [`bank::TriviaBank`]. A right answer unwraps it for good; a
//! wrong answer, or walking away from the question, makes it disappear.

pub mod bank;
pub mod chat;
pub mod completion;
pub mod constants;
pub mod controller;
pub mod conversation;
pub mod gate;
pub mod trivia;
pub mod web_server;
