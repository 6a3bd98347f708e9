use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl Direction {
    pub fn delta(self) -> isize {
        match self {
            Direction::Next => 1,
            Direction::Prev => -1,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Direction::Next => "next",
            Direction::Prev => "prev",
        }
    }
}

/// Callback data attached to a navigation button, encoded as `<direction>_<page>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionToken {
    pub direction: Direction,
    /// Page shown when the button was rendered.
    pub page: usize,
}

impl ActionToken {
    pub fn new(direction: Direction, page: usize) -> Self {
        Self { direction, page }
    }
}

impl fmt::Display for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.direction.as_str(), self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidToken(pub String);

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid action token: {:?}", self.0)
    }
}

impl std::error::Error for InvalidToken {}

impl FromStr for ActionToken {
    type Err = InvalidToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidToken(s.to_string());
        let (direction, page) = s.split_once('_').ok_or_else(invalid)?;
        let direction = match direction {
            "next" => Direction::Next,
            "prev" => Direction::Prev,
            _ => return Err(invalid()),
        };
        let page = page.parse::<usize>().map_err(|_| invalid())?;
        Ok(ActionToken { direction, page })
    }
}

impl ActionToken {
    pub fn from_bytes(data: &[u8]) -> Result<Self, InvalidToken> {
        std::str::from_utf8(data)
            .map_err(|_| InvalidToken(String::from_utf8_lossy(data).into_owned()))?
            .parse()
    }
}
