use crate::bank::Question;
use rand::{seq::index, Rng};
use std::fmt::{self, Display};

/// A parsed quiz invocation.
#[derive(Debug)]
pub struct Request {
    /// How many questions were asked for.
    pub count: usize,
    /// Whether to draw the questions at random.
    pub random: bool,
}

#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    MissingCount,
    InvalidCount,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingCount => "Usage: !quiz [n] or !quiz random [n]",
            Self::InvalidCount => "Invalid number of questions.",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Parses the trigger command. The count is always the last token; the
/// `random` modifier must come right after the trigger.
pub fn parse(content: &str) -> Result<Request> {
    let args: Vec<_> = content.split_whitespace().skip(1).collect();
    let last = args.last().ok_or(Error::MissingCount)?;
    let count: usize = last.parse().map_err(|_| Error::InvalidCount)?;
    if count == 0 {
        return Err(Error::InvalidCount);
    }
    Ok(Request { count, random: args.len() > 1 && args[0] == "random" })
}

/// Resolves a request against the bank. The count is clamped to the bank
/// size. Random mode samples indices without replacement into a fresh list,
/// so concurrent runs never observe each other's ordering.
pub fn select<R: Rng + ?Sized>(bank: &[Question], request: &Request, rng: &mut R) -> Vec<Question> {
    let count = request.count.min(bank.len());
    if request.random {
        index::sample(rng, bank.len(), count).iter().map(|i| bank[i].clone()).collect()
    } else {
        bank[..count].to_vec()
    }
}
