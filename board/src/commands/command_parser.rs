use crate::commands::command::Command;
use ufmt_macros::uDebug;
use winnow::ascii::{digit1, space0};
use winnow::combinator::{alt, delimited, preceded};
use winnow::token::literal;
use winnow::{Parser, Result};

/// Parses a command line.
///
/// Leading and trailing blanks are ignored. Anything else that does not
/// form exactly one command is an error.
pub fn parse(input: &str) -> core::result::Result<Command, Error> {
    delimited(space0, parse_command, space0)
        .parse(input)
        .map_err(|_| Error::ParseError)
}

/// Possible errors that might occur during parsing.
#[derive(uDebug)]
pub enum Error {
    /// Parsing failed.
    ParseError,
}

fn parse_command<'s>(input: &mut &'s str) -> Result<Command> {
    alt((
        preceded(literal("T"), parse_tool).map(Command::Select),
        preceded(literal("L"), parse_tool).map(Command::Load),
        preceded(literal("U"), parse_tool).map(Command::Unload),
        literal("P0").map(|_| Command::QueryFinda),
        literal("A").map(|_| Command::Abort),
    ))
    .parse_next(input)
}

/// Parse a tool index.
fn parse_tool<'s>(input: &mut &'s str) -> Result<u8> {
    digit1.try_map(str::parse).parse_next(input)
}
