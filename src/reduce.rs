//! Resolution of `#RANDOM` / `#IF` / `#ENDIF` blocks.
//!
//! A single forward pass draws one value per `#RANDOM` and keeps only the lines of the matching
//! `#IF` branch, producing a new token sequence. Directive lines themselves never survive.
//!
//! Only one random value is tracked at a time: a `#RANDOM` inside an `#IF` block replaces the
//! outer value instead of nesting.

use crate::{
    error::{ParseError, ParseErrorKind, Stage},
    lex::{LineToken, Token},
    rng::Rng,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    /// Not inside any `#IF`.
    Outside,
    /// Inside an `#IF` whose value equals the active random value.
    Live,
    /// Inside an `#IF` whose lines are dropped.
    Dead,
}

/// Control flow state of the scan.
#[derive(Debug)]
struct ControlFlow {
    random: Option<u64>,
    block: Block,
}

impl ControlFlow {
    /// Handles one token, returning whether it passes through.
    fn step(
        &mut self,
        token: &LineToken<'_>,
        rng: &mut impl Rng,
    ) -> core::result::Result<bool, ParseErrorKind> {
        let Token::Header { name, args } = token.token else {
            return Ok(self.block != Block::Dead);
        };
        if name.eq_ignore_ascii_case("RANDOM") {
            let max = parse_random_operand(args)?;
            let value = rng.generate(1..=max);
            tracing::debug!(line = token.line, max, value, "#RANDOM drawn");
            self.random = Some(value);
            self.block = Block::Outside;
            return Ok(false);
        }
        if name.eq_ignore_ascii_case("SETRANDOM") {
            self.random = Some(parse_random_operand(args)?);
            self.block = Block::Outside;
            return Ok(false);
        }
        if name.eq_ignore_ascii_case("ENDRANDOM") {
            self.random = None;
            self.block = Block::Outside;
            return Ok(false);
        }
        let Some(random) = self.random else {
            return Ok(true);
        };
        if name.eq_ignore_ascii_case("IF") {
            let value: u64 = args
                .parse()
                .map_err(|_| ParseErrorKind::InvalidIfOperand(args.to_owned()))?;
            self.block = if value == random {
                Block::Live
            } else {
                Block::Dead
            };
            return Ok(false);
        }
        if name.eq_ignore_ascii_case("ENDIF") {
            self.block = Block::Outside;
            return Ok(false);
        }
        Ok(self.block != Block::Dead)
    }
}

fn parse_random_operand(args: &str) -> core::result::Result<u64, ParseErrorKind> {
    args.parse()
        .ok()
        .filter(|&max: &u64| max >= 1)
        .ok_or_else(|| ParseErrorKind::InvalidRandomOperand(args.to_owned()))
}

/// Resolves the control flow of `tokens`, drawing `#RANDOM` values from `rng`.
///
/// # Errors
///
/// A `#RANDOM`, `#SETRANDOM` or `#IF` with a non-numeric operand fails with a [`ParseError`]
/// naming its line.
pub fn reduce_control_flow<'a>(
    tokens: Vec<LineToken<'a>>,
    mut rng: impl Rng,
) -> core::result::Result<Vec<LineToken<'a>>, ParseError> {
    let mut flow = ControlFlow {
        random: None,
        block: Block::Outside,
    };
    let mut kept = Vec::with_capacity(tokens.len());
    for token in tokens {
        if flow
            .step(&token, &mut rng)
            .map_err(|kind| kind.at(Stage::Reduce, token.line))?
        {
            kept.push(token);
        }
    }
    Ok(kept)
}
